use crate::error::{Error, ExportError, Result};
use crate::types::TaskId;
use crate::utils::is_image;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::ArchiveSource;

/// Extracts the image members of an export archive
pub struct ImageExtractor;

impl ImageExtractor {
    /// Extract every image member of the archive into `dest_path`
    ///
    /// Members whose extension is not in `image_extensions` are never written. Returns
    /// the member names that were extracted, relative to `dest_path`, in archive order.
    pub fn extract_images(
        task_id: TaskId,
        source: &ArchiveSource,
        dest_path: &Path,
        image_extensions: &[String],
    ) -> Result<Vec<PathBuf>> {
        debug!(
            task_id = task_id.get(),
            archive = ?source.file_path(),
            ?dest_path,
            "opening export archive"
        );

        let reader = source.open()?;
        let mut archive = zip::ZipArchive::new(reader).map_err(|e| {
            Error::Export(ExportError::InvalidArchive {
                task_id,
                reason: format!("failed to read ZIP archive: {}", e),
            })
        })?;

        let mut extracted = Vec::new();
        let mut skipped = 0usize;

        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(|e| {
                Error::Export(ExportError::InvalidArchive {
                    task_id,
                    reason: format!("failed to read ZIP entry {}: {}", i, e),
                })
            })?;

            if file.is_dir() || !is_image(file.name(), image_extensions) {
                skipped += 1;
                continue;
            }

            if let Some(relative) = Self::extract_entry(file, dest_path)? {
                extracted.push(relative);
            }
        }

        info!(
            task_id = task_id.get(),
            ?dest_path,
            extracted_count = extracted.len(),
            skipped_count = skipped,
            "image extraction successful"
        );

        Ok(extracted)
    }

    /// Write one archive member below `dest_path`, creating parent directories
    fn extract_entry(mut file: zip::read::ZipFile, dest_path: &Path) -> Result<Option<PathBuf>> {
        let member = file.name().to_string();

        let relative = match file.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                warn!(member = %member, "skipping entry with unsafe path");
                return Ok(None);
            }
        };
        let file_path = dest_path.join(&relative);

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to create {}: {}", parent.display(), e),
                ))
            })?;
        }

        let mut outfile = std::fs::File::create(&file_path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to create {}: {}", file_path.display(), e),
            ))
        })?;

        std::io::copy(&mut file, &mut outfile).map_err(|e| {
            Error::Export(ExportError::ExtractionFailed {
                member,
                dest: dest_path.to_path_buf(),
                reason: e.to_string(),
            })
        })?;

        Ok(Some(relative))
    }
}
