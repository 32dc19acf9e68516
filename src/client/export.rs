//! Dataset export polling, download and image extraction.
//!
//! CVAT prepares an export asynchronously. The protocol is:
//!
//! ```text
//! Requested -> Pending (poll every export_poll_interval) -> Ready -> Downloading -> Extracted
//! ```
//!
//! The export endpoint answers 201 once the archive exists. Every other status means
//! "not yet": 500 is logged with its body, other failures with a warning, and polling
//! continues until the export is ready, cancelled or past `export_timeout`.
//!
//! The archive is buffered in memory when its advertised size is at or below
//! `download_threshold_gb`, and streamed to `task-{id}.zip` otherwise.

use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::CvatClient;
use crate::error::{Error, ExportError, Result};
use crate::extraction::{ArchiveSource, ImageExtractor};
use crate::types::{ImageLayout, TaskId};

/// Write buffer size used when streaming large exports to disk
pub(crate) const DOWNLOAD_CHUNK_SIZE: usize = 8192;

const BYTES_PER_GB: f64 = 1e9;

/// Stages of a dataset export, as reported in logs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportState {
    /// The export has been requested
    Requested,
    /// The server is still preparing the archive
    Pending,
    /// The archive is ready for download
    Ready,
    /// The archive is being transferred
    Downloading,
    /// Images have been extracted from the archive
    Extracted,
}

impl std::fmt::Display for ExportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportState::Requested => "requested",
            ExportState::Pending => "pending",
            ExportState::Ready => "ready",
            ExportState::Downloading => "downloading",
            ExportState::Extracted => "extracted",
        };
        f.write_str(name)
    }
}

impl CvatClient {
    /// Download the images of a task and extract them below `output_path`
    ///
    /// Returns the extracted image paths relative to `output_path`, in archive order.
    /// With [`ImageLayout::PerTask`] every path starts with `task-{id}`.
    ///
    /// Polling runs until the export is ready or `export_timeout` elapses; use
    /// [`download_images_with_cancel`](Self::download_images_with_cancel) to stop it
    /// from outside.
    pub async fn download_images(
        &self,
        task_id: TaskId,
        output_path: impl AsRef<Path>,
        layout: ImageLayout,
    ) -> Result<Vec<PathBuf>> {
        self.download_images_with_cancel(task_id, output_path, layout, &CancellationToken::new())
            .await
    }

    /// [`download_images`](Self::download_images) with an external cancellation token
    pub async fn download_images_with_cancel(
        &self,
        task_id: TaskId,
        output_path: impl AsRef<Path>,
        layout: ImageLayout,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>> {
        let output_path = output_path.as_ref();

        self.wait_for_export(task_id, cancel).await?;
        let source = self.fetch_export_archive(task_id, output_path).await?;

        let dest = match layout {
            ImageLayout::PreservePaths => {
                tokio::fs::create_dir_all(output_path).await?;
                output_path.to_path_buf()
            }
            ImageLayout::PerTask => {
                tokio::fs::create_dir_all(output_path).await?;
                let task_dir = output_path.join(task_dir_name(task_id));
                tokio::fs::create_dir(&task_dir).await.map_err(|e| {
                    Error::Io(std::io::Error::new(
                        e.kind(),
                        format!("cannot create {}: {}", task_dir.display(), e),
                    ))
                })?;
                task_dir
            }
        };

        let image_extensions = self.config.image_extensions.clone();
        let extract_dest = dest.clone();
        let (source, extracted) = spawn_blocking(move || {
            let result =
                ImageExtractor::extract_images(task_id, &source, &extract_dest, &image_extensions);
            (source, result)
        })
        .await
        .map_err(|e| Error::Other(format!("extraction task panicked: {}", e)))?;
        let mut files = extracted?;

        if self.config.remove_downloaded_archive
            && let Some(archive_path) = source.file_path()
            && let Err(e) = tokio::fs::remove_file(archive_path).await
        {
            warn!(?archive_path, error = %e, "failed to remove downloaded archive");
        }

        if layout == ImageLayout::PerTask {
            let prefix = PathBuf::from(task_dir_name(task_id));
            files = files.into_iter().map(|f| prefix.join(f)).collect();
        }

        debug!(
            task_id = task_id.get(),
            state = %ExportState::Extracted,
            "Downloaded and extracted {} files to '{}'",
            files.len(),
            dest.display()
        );

        Ok(files)
    }

    /// Poll the export endpoint until the archive is ready
    ///
    /// Returns how many times the poll interval was slept.
    pub async fn wait_for_export(
        &self,
        task_id: TaskId,
        cancel: &CancellationToken,
    ) -> Result<u32> {
        let url = self.export_url(task_id);
        let started = Instant::now();
        let mut sleeps = 0u32;

        debug!(
            task_id = task_id.get(),
            state = %ExportState::Requested,
            "requesting dataset export"
        );

        loop {
            if cancel.is_cancelled() {
                return Err(ExportError::Cancelled { task_id }.into());
            }

            let response = self
                .get(&url)
                .query(&[("format", self.config.export_format.as_str())])
                .timeout(self.config.request_timeout)
                .send()
                .await?;

            let status = response.status();
            match status.as_u16() {
                201 => {
                    debug!(
                        task_id = task_id.get(),
                        state = %ExportState::Ready,
                        polls = sleeps + 1,
                        "dataset export ready"
                    );
                    return Ok(sleeps);
                }
                500 => {
                    let body = response.text().await.unwrap_or_default();
                    error!(
                        task_id = task_id.get(),
                        "Error: received response 500 with content: {}", body
                    );
                }
                code if status.is_success() => {
                    debug!(
                        task_id = task_id.get(),
                        state = %ExportState::Pending,
                        status = code,
                        "dataset export pending"
                    );
                }
                code => {
                    warn!(
                        task_id = task_id.get(),
                        status = code,
                        "unexpected status while waiting for export, polling again"
                    );
                }
            }

            if let Some(limit) = self.config.export_timeout
                && started.elapsed() >= limit
            {
                return Err(ExportError::Timeout {
                    task_id,
                    waited_secs: started.elapsed().as_secs(),
                }
                .into());
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(ExportError::Cancelled { task_id }.into());
                }
                _ = tokio::time::sleep(self.config.export_poll_interval) => {}
            }
            sleeps += 1;
        }
    }

    /// Download a ready export, choosing memory or disk from the advertised size
    pub(crate) async fn fetch_export_archive(
        &self,
        task_id: TaskId,
        output_path: &Path,
    ) -> Result<ArchiveSource> {
        let url = self.export_url(task_id);
        let response = self
            .get(&url)
            .query(&[
                ("format", self.config.export_format.as_str()),
                ("action", "download"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let content_length = response.content_length();
        let keep_in_memory = fits_in_memory(content_length, self.config.download_threshold_gb);

        debug!(
            task_id = task_id.get(),
            state = %ExportState::Downloading,
            ?content_length,
            keep_in_memory,
            "downloading dataset export"
        );

        if keep_in_memory {
            let bytes = response.bytes().await?;
            return Ok(ArchiveSource::Memory(Vec::from(bytes)));
        }

        tokio::fs::create_dir_all(output_path).await?;
        let archive_path = output_path.join(format!("{}.zip", task_dir_name(task_id)));
        let written = stream_to_file(response, &archive_path).await?;
        debug!(task_id = task_id.get(), ?archive_path, written, "export written to disk");

        Ok(ArchiveSource::File(archive_path))
    }

    fn export_url(&self, task_id: TaskId) -> String {
        self.api_url(&format!("tasks/{}/dataset", task_id))
    }
}

/// Whether an export of the advertised size should be buffered in memory
///
/// An unknown size never is.
pub(crate) fn fits_in_memory(content_length: Option<u64>, threshold_gb: f64) -> bool {
    match content_length {
        Some(len) => len as f64 / BYTES_PER_GB <= threshold_gb,
        None => false,
    }
}

fn task_dir_name(task_id: TaskId) -> String {
    format!("task-{}", task_id)
}

/// Stream a response body to `path`, returning the number of bytes written
///
/// A transfer that fails part way removes the truncated file.
async fn stream_to_file(mut response: reqwest::Response, path: &Path) -> Result<u64> {
    let file = tokio::fs::File::create(path).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to create {}: {}", path.display(), e),
        ))
    })?;
    let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);

    match copy_body(&mut response, &mut writer).await {
        Ok(written) => Ok(written),
        Err(e) => {
            drop(writer);
            if let Err(remove_err) = tokio::fs::remove_file(path).await {
                warn!(?path, error = %remove_err, "failed to remove partial archive");
            }
            Err(e)
        }
    }
}

async fn copy_body(
    response: &mut reqwest::Response,
    writer: &mut BufWriter<tokio::fs::File>,
) -> Result<u64> {
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;
    Ok(written)
}
