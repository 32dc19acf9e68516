//! # cvat-dl
//!
//! Client library for loading project, task, frame and annotation data from a
//! [CVAT](https://github.com/cvat-ai/cvat) server and downloading task images.
//!
//! ## Overview
//!
//! - **Typed records** - every response is decoded into a strict record type; fields the
//!   server sends but the record does not model are reported as schema drift warnings
//! - **Reconciled frames** - a task and its frame metadata are joined into a
//!   [`FrameIndex`] that maps every frame to the job owning it
//! - **Export downloads** - dataset exports are polled until ready, then kept in memory
//!   or streamed to disk depending on their size, and only image members are extracted
//! - **Stateless** - nothing is cached between calls
//!
//! Logging goes through [`tracing`]; install whatever subscriber the application uses.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cvat_dl::{Config, CvatClient, ImageLayout, TaskId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         api_url: "https://cvat.example.com/api/v1".to_string(),
//!         username: Some("annotator".to_string()),
//!         password: Some("secret".to_string()),
//!         ..Default::default()
//!     };
//!     let client = CvatClient::new(config)?;
//!
//!     let task = client.load_task_data(TaskId(42)).await?;
//!     for (frame_id, frame) in &task.frames {
//!         println!("{} {} job={}", frame_id, frame.file_name, frame.job_id);
//!     }
//!
//!     let images = client
//!         .download_images(TaskId(42), "./datasets", ImageLayout::PerTask)
//!         .await?;
//!     println!("extracted {} images", images.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// CVAT API client
pub mod client;
/// Configuration types
pub mod config;
/// Schema drift detection between records and raw payloads
pub mod drift;
/// Error types
pub mod error;
/// Export archive extraction
pub mod extraction;
/// Task, metadata and job reconciliation
pub mod reconcile;
/// Retry logic with exponential backoff
pub mod retry;
/// Core record types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use client::{CvatClient, ExportState};
pub use config::{Config, RetryConfig};
pub use drift::SchemaDrift;
pub use error::{DataError, Error, ExportError, Result};
pub use reconcile::reconcile;
pub use tokio_util::sync::CancellationToken;
pub use types::{
    AnnotationsRecord, Frame, FrameId, FrameIndex, FrameMeta, ImageLayout, JobDescriptor, JobId,
    JobView, ProjectId, ProjectRecord, Segment, TaskData, TaskId, TaskMetadataRecord, TaskRecord,
    TaskSummary,
};

/// Create a token that is cancelled when the process receives a termination signal
///
/// Pass it to [`CvatClient::download_images_with_cancel`] to stop an export that is
/// still being polled when the user presses Ctrl+C. Must be called inside a Tokio runtime.
///
/// # Example
///
/// ```no_run
/// use cvat_dl::{cancel_on_shutdown_signal, Config, CvatClient, ImageLayout, TaskId};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = CvatClient::new(Config::from_env()?)?;
///     let cancel = cancel_on_shutdown_signal();
///
///     client
///         .download_images_with_cancel(TaskId(7), "./out", ImageLayout::default(), &cancel)
///         .await?;
///
///     Ok(())
/// }
/// ```
pub fn cancel_on_shutdown_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => trigger.cancel(),
            _ = trigger.cancelled() => {}
        }
    });
    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal, cancelling");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C), cancelling");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal, cancelling");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
