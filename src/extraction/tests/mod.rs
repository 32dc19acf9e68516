use crate::error::{Error, ExportError};
use crate::extraction::*;
use crate::types::TaskId;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn image_extensions() -> Vec<String> {
    vec!["jpg".into(), "jpeg".into(), "png".into()]
}

/// Build a ZIP archive in memory containing the given members
fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ::zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// A typical CVAT images export: annotation XML next to the image tree
fn export_members() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("annotations.xml", b"<annotations/>"),
        ("images/", b""),
        ("images/cam1/0001.jpg", b"jpg-1"),
        ("images/cam1/0002.PNG", b"png-2"),
        ("images/notes.txt", b"not an image"),
        ("images/cam2/0003.jpeg", b"jpeg-3"),
    ]
}

fn all_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

// ---------------------------------------------------------------------------
// ArchiveSource
// ---------------------------------------------------------------------------

#[test]
fn memory_and_file_sources_read_the_same_bytes() {
    let temp = TempDir::new().unwrap();
    let bytes = zip_bytes(&[("a.png", b"a")]);
    let path = temp.path().join("task-1.zip");
    std::fs::write(&path, &bytes).unwrap();

    let memory = ArchiveSource::Memory(bytes.clone());
    let file = ArchiveSource::File(path.clone());

    assert_eq!(memory.len().unwrap(), bytes.len() as u64);
    assert_eq!(file.len().unwrap(), bytes.len() as u64);
    assert!(memory.file_path().is_none());
    assert_eq!(file.file_path(), Some(path.as_path()));

    let mut from_memory = Vec::new();
    memory.open().unwrap().read_to_end(&mut from_memory).unwrap();
    let mut from_file = Vec::new();
    file.open().unwrap().read_to_end(&mut from_file).unwrap();
    assert_eq!(from_memory, from_file);
}

#[test]
fn missing_file_source_fails_to_open() {
    let source = ArchiveSource::File(PathBuf::from("/nonexistent/task-1.zip"));
    assert!(source.open().is_err());
}

#[test]
fn empty_memory_source_reports_empty() {
    assert!(ArchiveSource::Memory(Vec::new()).is_empty().unwrap());
}

// ---------------------------------------------------------------------------
// ImageExtractor
// ---------------------------------------------------------------------------

#[test]
fn extracts_only_images_in_archive_order() {
    let temp = TempDir::new().unwrap();
    let source = ArchiveSource::Memory(zip_bytes(&export_members()));

    let files =
        ImageExtractor::extract_images(TaskId(1), &source, temp.path(), &image_extensions())
            .unwrap();

    assert_eq!(
        files,
        vec![
            PathBuf::from("images/cam1/0001.jpg"),
            PathBuf::from("images/cam1/0002.PNG"),
            PathBuf::from("images/cam2/0003.jpeg"),
        ]
    );

    // Nothing but the images reached the disk
    let mut expected = files.clone();
    expected.sort();
    assert_eq!(all_files(temp.path()), expected);
    assert!(!temp.path().join("annotations.xml").exists());
    assert!(!temp.path().join("images/notes.txt").exists());

    assert_eq!(
        std::fs::read(temp.path().join("images/cam1/0001.jpg")).unwrap(),
        b"jpg-1"
    );
}

#[test]
fn extracts_from_file_source() {
    let temp = TempDir::new().unwrap();
    let archive_path = temp.path().join("task-2.zip");
    std::fs::write(&archive_path, zip_bytes(&export_members())).unwrap();
    let dest = temp.path().join("out");

    let source = ArchiveSource::File(archive_path);
    let files =
        ImageExtractor::extract_images(TaskId(2), &source, &dest, &image_extensions()).unwrap();

    assert_eq!(files.len(), 3);
    assert!(dest.join("images/cam2/0003.jpeg").is_file());
}

#[test]
fn archive_without_images_extracts_nothing() {
    let temp = TempDir::new().unwrap();
    let source = ArchiveSource::Memory(zip_bytes(&[
        ("annotations.xml", b"<annotations/>"),
        ("meta/readme.md", b"hello"),
    ]));

    let files =
        ImageExtractor::extract_images(TaskId(3), &source, temp.path(), &image_extensions())
            .unwrap();

    assert!(files.is_empty());
    assert!(all_files(temp.path()).is_empty());
}

#[test]
fn custom_extension_list_is_honoured() {
    let temp = TempDir::new().unwrap();
    let source = ArchiveSource::Memory(zip_bytes(&export_members()));

    let files =
        ImageExtractor::extract_images(TaskId(4), &source, temp.path(), &["png".to_string()])
            .unwrap();

    assert_eq!(files, vec![PathBuf::from("images/cam1/0002.PNG")]);
}

#[test]
fn unsafe_member_paths_are_skipped() {
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("dest");
    let source = ArchiveSource::Memory(zip_bytes(&[
        ("../escape.png", b"evil"),
        ("ok.png", b"fine"),
    ]));

    let files = ImageExtractor::extract_images(TaskId(5), &source, &dest, &image_extensions())
        .unwrap();

    assert_eq!(files, vec![PathBuf::from("ok.png")]);
    assert!(!temp.path().join("escape.png").exists());
}

#[test]
fn garbage_payload_is_an_invalid_archive() {
    let temp = TempDir::new().unwrap();
    let source = ArchiveSource::Memory(b"this is not a zip file".to_vec());

    let result =
        ImageExtractor::extract_images(TaskId(6), &source, temp.path(), &image_extensions());

    match result {
        Err(Error::Export(ExportError::InvalidArchive { task_id, reason })) => {
            assert_eq!(task_id, TaskId(6));
            assert!(reason.contains("ZIP"), "got: {reason}");
        }
        other => panic!("expected InvalidArchive, got {other:?}"),
    }
}

#[test]
fn existing_files_are_overwritten() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("ok.png"), b"stale").unwrap();
    let source = ArchiveSource::Memory(zip_bytes(&[("ok.png", b"fresh")]));

    ImageExtractor::extract_images(TaskId(7), &source, temp.path(), &image_extensions())
        .unwrap();

    assert_eq!(std::fs::read(temp.path().join("ok.png")).unwrap(), b"fresh");
}
