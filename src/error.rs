//! Error types for cvat-dl
//!
//! This module provides the error taxonomy for the library:
//! - Structural data errors raised when remote records violate the assumed shape
//! - Export/download errors raised by the dataset export protocol
//! - Transport, serialization, configuration, and filesystem errors
//!
//! Schema drift has no variant here: it is reported through `tracing::warn!` and
//! never aborts a call.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{FrameId, JobId, TaskId};

/// Result type alias for cvat-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cvat-dl
///
/// Every fatal failure surfaces as one of these variants. No partial results are
/// returned alongside an error.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_url")
        key: Option<String>,
    },

    /// Network error (connection refused, timeout, malformed response body, ...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a status the client does not accept
    #[error("HTTP {status} from {url}")]
    Http {
        /// Status code returned by the server
        status: u16,
        /// The requested URL
        url: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote data violated a structural invariant
    #[error("unexpected CVAT data: {0}")]
    Data(#[from] DataError),

    /// Dataset export or archive handling failed
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Structural invariant violations detected while reconciling task records
///
/// These indicate that the remote data shape broke the contract the client relies on.
/// They are never transient and are never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    /// A task segment carries more (or fewer) than one job
    #[error("segment {segment} of task {task_id} has {job_count} jobs, expected exactly one")]
    SegmentJobCount {
        /// The task owning the segment
        task_id: TaskId,
        /// Position of the segment in the task's segment list
        segment: usize,
        /// Number of jobs found in the segment
        job_count: usize,
    },

    /// The metadata frame list does not match the declared frame range
    #[error(
        "task {task_id} frames {start_frame}..={stop_frame} need {expected} entries, got {actual}"
    )]
    FrameCountMismatch {
        /// The task whose metadata is inconsistent
        task_id: TaskId,
        /// First declared frame id
        start_frame: FrameId,
        /// Last declared frame id (inclusive)
        stop_frame: FrameId,
        /// Length of the declared range
        expected: usize,
        /// Number of frame descriptors actually present
        actual: usize,
    },

    /// A job covers a frame id that is not part of the task's frame index
    #[error("job ({job_id}) is missing a frame ({frame_id})")]
    JobMissingFrame {
        /// The job whose range reaches outside the index
        job_id: JobId,
        /// The frame id that was not found
        frame_id: FrameId,
    },

    /// A frame in the task's range is covered by no job
    #[error("frame ({frame_id}) is missing job id")]
    FrameWithoutJob {
        /// The uncovered frame id
        frame_id: FrameId,
    },
}

/// Errors raised by the dataset export/download protocol
#[derive(Debug, Error)]
pub enum ExportError {
    /// The caller cancelled the export while it was still pending
    #[error("export of task {task_id} cancelled")]
    Cancelled {
        /// The task being exported
        task_id: TaskId,
    },

    /// The export did not become ready within the configured deadline
    #[error("export of task {task_id} not ready after {waited_secs}s")]
    Timeout {
        /// The task being exported
        task_id: TaskId,
        /// Seconds spent polling before giving up
        waited_secs: u64,
    },

    /// The downloaded payload could not be read as a zip archive
    #[error("failed to read archive for task {task_id}: {reason}")]
    InvalidArchive {
        /// The task whose archive failed
        task_id: TaskId,
        /// The reason the archive could not be read
        reason: String,
    },

    /// A single archive member could not be extracted
    #[error("failed to extract {member} into {dest}: {reason}")]
    ExtractionFailed {
        /// Archive member name
        member: String,
        /// Destination directory
        dest: PathBuf,
        /// The reason extraction failed
        reason: String,
    },
}

impl Error {
    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Network(_) => "network_error",
            Error::Http { .. } => "http_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::Data(e) => match e {
                DataError::SegmentJobCount { .. } => "segment_job_count",
                DataError::FrameCountMismatch { .. } => "frame_count_mismatch",
                DataError::JobMissingFrame { .. } => "job_missing_frame",
                DataError::FrameWithoutJob { .. } => "frame_without_job",
            },
            Error::Export(e) => match e {
                ExportError::Cancelled { .. } => "export_cancelled",
                ExportError::Timeout { .. } => "export_timeout",
                ExportError::InvalidArchive { .. } => "invalid_archive",
                ExportError::ExtractionFailed { .. } => "extraction_failed",
            },
            Error::Other(_) => "internal_error",
        }
    }

    /// Build a configuration error for the given key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
