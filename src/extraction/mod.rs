//! Archive extraction for dataset exports
//!
//! An export arrives either fully buffered in memory or streamed to a `.zip` file on
//! disk. Both are wrapped in an [`ArchiveSource`] so the extraction code reads a single
//! `Read + Seek` handle regardless of where the bytes live.

mod zip;

pub use zip::ImageExtractor;

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

/// Random-access byte source an archive can be read from
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Where a downloaded export archive lives
#[derive(Debug)]
pub enum ArchiveSource {
    /// The whole payload buffered in memory
    Memory(Vec<u8>),
    /// The payload streamed to a file on disk
    File(PathBuf),
}

impl ArchiveSource {
    /// Open the source for reading
    pub fn open(&self) -> std::io::Result<Box<dyn ReadSeek + '_>> {
        match self {
            ArchiveSource::Memory(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            ArchiveSource::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        }
    }

    /// Path of the backing file, if any
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            ArchiveSource::Memory(_) => None,
            ArchiveSource::File(path) => Some(path),
        }
    }

    /// Size of the archive in bytes
    pub fn len(&self) -> std::io::Result<u64> {
        match self {
            ArchiveSource::Memory(bytes) => Ok(bytes.len() as u64),
            ArchiveSource::File(path) => Ok(std::fs::metadata(path)?.len()),
        }
    }

    /// Whether the archive holds no bytes
    pub fn is_empty(&self) -> std::io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
