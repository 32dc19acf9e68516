//! Core types for cvat-dl
//!
//! Records mirror the JSON documents returned by the CVAT REST API. Required fields
//! have no serde defaults so a missing field fails decoding; fields the client does
//! not rely on are optional. Unknown remote fields are ignored on decode and reported
//! as schema drift by the fetch layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Frame id, unique within a single task only
pub type FrameId = i64;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Get the inner i64 value
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl PartialEq<i64> for $name {
            fn eq(&self, other: &i64) -> bool {
                self.0 == *other
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a CVAT project
    ProjectId
);
id_type!(
    /// Identifier of a CVAT task
    TaskId
);
id_type!(
    /// Identifier of a CVAT job
    JobId
);

/// A project as returned by `GET /projects/{id}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Project id
    pub id: ProjectId,
    /// Project name
    pub name: String,
    /// Ids of the tasks in the project, in server order
    pub tasks: Vec<TaskId>,
    /// Project status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Canonical project URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A job nested inside a task segment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Job id
    pub id: JobId,
    /// Canonical job URL, the base for annotation requests
    pub url: String,
    /// Job status (e.g. "annotation", "validation", "completed")
    pub status: String,
    /// Assigned user, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<serde_json::Value>,
    /// Assigned reviewer, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<serde_json::Value>,
}

/// A contiguous frame range of a task, expected to own exactly one job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First frame of the segment
    pub start_frame: FrameId,
    /// Last frame of the segment (inclusive)
    pub stop_frame: FrameId,
    /// Jobs of the segment
    pub jobs: Vec<JobDescriptor>,
}

/// A task as returned by `GET /tasks/{id}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task id
    pub id: TaskId,
    /// Task name
    pub name: String,
    /// Segments of the task, in server order
    pub segments: Vec<Segment>,
    /// Owning project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    /// Canonical task URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Task status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Data mode ("annotation" or "interpolation")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Number of frames in the task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Number of frames per segment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_size: Option<u64>,
}

/// A task reduced to its descriptive fields, as listed by [`load_project_data`]
///
/// [`load_project_data`]: crate::CvatClient::load_project_data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    /// Task id
    pub id: TaskId,
    /// Task name
    pub name: String,
    /// Owning project
    pub project_id: Option<ProjectId>,
    /// Task status
    pub status: Option<String>,
    /// Data mode
    pub mode: Option<String>,
    /// Number of frames in the task
    pub size: Option<u64>,
    /// Canonical task URL
    pub url: Option<String>,
}

impl From<&TaskRecord> for TaskSummary {
    fn from(task: &TaskRecord) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            project_id: task.project_id,
            status: task.status.clone(),
            mode: task.mode.clone(),
            size: task.size,
            url: task.url.clone(),
        }
    }
}

/// Per-frame descriptor from the task metadata
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    /// Stored file path of the frame
    pub name: String,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

/// Task frame metadata as returned by `GET /tasks/{id}/data/meta`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadataRecord {
    /// First frame id of the task
    pub start_frame: FrameId,
    /// Last frame id of the task (inclusive)
    pub stop_frame: FrameId,
    /// One descriptor per frame, positionally aligned with the frame range
    pub frames: Vec<FrameMeta>,
    /// Number of frames in the task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Compressed chunk quality
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_quality: Option<u32>,
    /// Frame filter expression (e.g. "step=2")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_filter: Option<String>,
}

/// Annotations of a single job as returned by `GET {job_url}/annotations`
///
/// The shapes, tracks and tags are kept as raw JSON; their structure depends on the
/// task's label schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationsRecord {
    /// Annotation revision
    pub version: i64,
    /// Frame-level tags
    pub tags: Vec<serde_json::Value>,
    /// Per-frame shapes
    pub shapes: Vec<serde_json::Value>,
    /// Interpolated tracks
    pub tracks: Vec<serde_json::Value>,
}

/// A job flattened out of its segment, carrying the segment's frame bounds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    /// Job id
    pub id: JobId,
    /// Job status
    pub status: String,
    /// First frame covered by the job
    pub start_frame: FrameId,
    /// Last frame covered by the job (inclusive)
    pub stop_frame: FrameId,
    /// Canonical job URL
    pub url: String,
}

/// One frame of a task with the job that owns it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Image id derived from the stored path, meant to be unique across a dataset
    pub id: String,
    /// Frame id, unique within the task only
    pub frame_id: FrameId,
    /// Base name of the stored file
    pub file_name: String,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Owning task
    pub task_id: TaskId,
    /// Owning task name
    pub task_name: String,
    /// Owning job
    pub job_id: JobId,
    /// Status of the owning job
    pub status: String,
}

/// All frames of one task keyed by frame id, in ascending frame order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameIndex(BTreeMap<FrameId, Frame>);

impl FrameIndex {
    pub(crate) fn from_map(frames: BTreeMap<FrameId, Frame>) -> Self {
        Self(frames)
    }

    /// Look up a frame by id
    pub fn get(&self, frame_id: FrameId) -> Option<&Frame> {
        self.0.get(&frame_id)
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the index holds no frames
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate frames in ascending frame id order
    pub fn iter(&self) -> impl Iterator<Item = (&FrameId, &Frame)> {
        self.0.iter()
    }

    /// Frame ids in ascending order
    pub fn frame_ids(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.0.keys().copied()
    }

    /// Consume the index into its underlying map
    pub fn into_inner(self) -> BTreeMap<FrameId, Frame> {
        self.0
    }
}

impl<'a> IntoIterator for &'a FrameIndex {
    type Item = (&'a FrameId, &'a Frame);
    type IntoIter = std::collections::btree_map::Iter<'a, FrameId, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Everything known about one task after reconciliation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskData {
    /// The task record as fetched
    pub task: TaskRecord,
    /// Jobs of the task in segment order
    pub jobs: Vec<JobView>,
    /// Frames of the task with their owning jobs
    pub frames: FrameIndex,
}

/// Directory layout for downloaded images
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageLayout {
    /// Extract into the output directory keeping archive paths, so images of several
    /// tasks share one tree (default)
    #[default]
    PreservePaths,
    /// Extract into a fresh `task-{id}` subdirectory that must not exist yet
    PerTask,
}
