//! Mock CVAT server fixtures

use serde_json::{Value, json};
use std::io::Write;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Frame file names served by [`mount_task`], in frame order
pub const FRAME_NAMES: [&str; 6] = [
    "train/cam_a/000.jpg",
    "train/cam_a/001.jpg",
    "train/cam_a/002.jpg",
    "train/cam_b/003.png",
    "train/cam_b/004.png",
    "train/cam_b/005.png",
];

/// Task JSON with three two-frame segments, one job each
pub fn task_json(server: &MockServer, task_id: i64) -> Value {
    let segments: Vec<Value> = (0..3)
        .map(|i| {
            let job_id = task_id * 100 + i;
            let status = if i == 0 { "completed" } else { "annotation" };
            json!({
                "start_frame": i * 2,
                "stop_frame": i * 2 + 1,
                "jobs": [{
                    "id": job_id,
                    "url": format!("{}/api/v1/jobs/{}", server.uri(), job_id),
                    "status": status,
                    "assignee": null,
                    "reviewer": null
                }]
            })
        })
        .collect();

    json!({
        "id": task_id,
        "name": format!("task {}", task_id),
        "project_id": 1,
        "mode": "annotation",
        "status": "annotation",
        "size": FRAME_NAMES.len(),
        "segment_size": 2,
        "segments": segments
    })
}

/// Metadata JSON matching [`task_json`]
pub fn meta_json() -> Value {
    json!({
        "start_frame": 0,
        "stop_frame": FRAME_NAMES.len() - 1,
        "size": FRAME_NAMES.len(),
        "image_quality": 70,
        "frame_filter": "",
        "frames": FRAME_NAMES
            .iter()
            .map(|name| json!({ "name": name, "width": 1920, "height": 1080 }))
            .collect::<Vec<_>>()
    })
}

/// Mount the task, metadata and per-job annotation endpoints
pub async fn mount_task(server: &MockServer, task_id: i64) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/tasks/{}", task_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json(server, task_id)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/tasks/{}/data/meta", task_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(meta_json()))
        .mount(server)
        .await;
    for i in 0..3 {
        let job_id = task_id * 100 + i;
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/jobs/{}/annotations", job_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": 1,
                "tags": [{ "frame": i * 2, "label_id": 3, "attributes": [] }],
                "shapes": [],
                "tracks": []
            })))
            .mount(server)
            .await;
    }
}

/// Mount an export that is ready after `pending` polls and serves `archive`
pub async fn mount_export(server: &MockServer, task_id: i64, pending: u64, archive: Vec<u8>) {
    let export_path = format!("/api/v1/tasks/{}/dataset", task_id);

    Mock::given(method("GET"))
        .and(path(export_path.clone()))
        .and(query_param("action", "download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .with_priority(1)
        .mount(server)
        .await;
    if pending > 0 {
        Mock::given(method("GET"))
            .and(path(export_path.clone()))
            .respond_with(ResponseTemplate::new(202))
            .up_to_n_times(pending)
            .with_priority(2)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(export_path))
        .respond_with(ResponseTemplate::new(201))
        .with_priority(3)
        .mount(server)
        .await;
}

/// Export archive holding every frame of [`FRAME_NAMES`] below `images/`
pub fn export_archive() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();

    writer.start_file("annotations.xml", options).unwrap();
    writer.write_all(b"<annotations><version>1.1</version></annotations>").unwrap();
    for name in FRAME_NAMES {
        writer.start_file(format!("images/{}", name), options).unwrap();
        writer.write_all(name.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
