use super::*;
use crate::config::RetryConfig;
use crate::types::TaskId;
use serde_json::{Value, json};
use std::io::Write;
use std::time::Duration;
use wiremock::MockServer;


/// Client pointed at the mock server with fast polling and retries
pub(super) fn test_client(server: &MockServer) -> CvatClient {
    test_client_with(server, |_| {})
}

/// Like [`test_client`], with a hook to adjust the configuration first
pub(super) fn test_client_with(
    server: &MockServer,
    adjust: impl FnOnce(&mut Config),
) -> CvatClient {
    let mut config = Config {
        api_url: format!("{}/api/v1", server.uri()),
        export_poll_interval: Duration::from_millis(10),
        retry: RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Default::default()
    };
    adjust(&mut config);
    CvatClient::new(config).unwrap()
}

/// Task with two single-job segments covering frames 0..=4 and 5..=9
pub(super) fn two_segment_task(server: &MockServer, task_id: i64) -> Value {
    let job = |id: i64, status: &str| {
        json!({
            "id": id,
            "url": format!("{}/api/v1/jobs/{}", server.uri(), id),
            "status": status,
            "assignee": null
        })
    };
    json!({
        "id": task_id,
        "name": "street scenes",
        "project_id": 1,
        "status": "annotation",
        "mode": "annotation",
        "size": 10,
        "segment_size": 5,
        "segments": [
            { "start_frame": 0, "stop_frame": 4, "jobs": [job(21, "annotation")] },
            { "start_frame": 5, "stop_frame": 9, "jobs": [job(22, "completed")] }
        ]
    })
}

/// Metadata listing `count` frames starting at frame 0
pub(super) fn task_meta(count: usize) -> Value {
    let frames: Vec<Value> = (0..count)
        .map(|i| json!({ "name": format!("images/img_{:03}.png", i), "width": 640, "height": 480 }))
        .collect();
    json!({
        "start_frame": 0,
        "stop_frame": 9,
        "size": count,
        "frames": frames
    })
}

/// A small CVAT export: annotation XML plus two images and a stray text file
pub(super) fn export_zip() -> Vec<u8> {
    let mut writer = ::zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in [
        ("annotations.xml", b"<annotations/>".as_slice()),
        ("images/img_000.png", b"png-0".as_slice()),
        ("images/readme.txt", b"text".as_slice()),
        ("images/img_001.jpg", b"jpg-1".as_slice()),
    ] {
        writer.start_file(name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub(super) const TASK: TaskId = TaskId(7);

#[test]
fn new_rejects_invalid_config() {
    let config = Config {
        api_url: "definitely not a url".into(),
        ..Default::default()
    };
    assert!(matches!(CvatClient::new(config), Err(Error::Config { .. })));
}

#[test]
fn api_url_joins_paths_with_a_single_slash() {
    let config = Config {
        api_url: "http://cvat.local/api/v1/".into(),
        ..Default::default()
    };
    let client = CvatClient::new(config).unwrap();
    assert_eq!(client.api_url("tasks/3"), "http://cvat.local/api/v1/tasks/3");
    assert_eq!(client.api_url("/projects/1"), "http://cvat.local/api/v1/projects/1");
}

#[test]
fn record_name_strips_module_path() {
    assert_eq!(record_name::<crate::types::TaskRecord>(), "TaskRecord");
}
