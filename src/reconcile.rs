//! Reconciliation of task, task metadata and job records into a frame index
//!
//! CVAT returns a task (with segments and their jobs) and the task's frame metadata
//! as two independent documents. Neither refers to the other by frame id: the
//! metadata lists frames positionally, and each segment only carries a frame range.
//! This module joins them and enforces the structural invariants the client relies on:
//!
//! 1. every segment owns exactly one job
//! 2. the metadata lists exactly one descriptor per frame id in its declared range
//! 3. every frame a job covers exists in the index
//! 4. every frame in the index is covered by some job
//!
//! Overlapping job ranges are tolerated: the later job wins and a warning is logged.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{DataError, Result};
use crate::types::{
    Frame, FrameId, FrameIndex, JobId, JobView, TaskId, TaskMetadataRecord, TaskRecord,
};
use crate::utils::{file_name_from_path, image_path_to_image_id};

/// Reconcile a task and its metadata into its jobs and frame index
///
/// # Errors
/// Returns [`DataError`] (wrapped in [`Error::Data`](crate::Error::Data)) when any of
/// the module-level invariants does not hold.
pub fn reconcile(
    task: &TaskRecord,
    meta: &TaskMetadataRecord,
) -> Result<(Vec<JobView>, FrameIndex)> {
    let jobs = flatten_jobs(task)?;

    let mut builder = FrameIndexBuilder::new(task, meta)?;
    for job in &jobs {
        builder.assign_job(job)?;
    }
    let frames = builder.finish()?;

    debug!(
        task_id = task.id.get(),
        jobs = jobs.len(),
        frames = frames.len(),
        "reconciled task data"
    );

    Ok((jobs, frames))
}

/// Flatten every segment's single job into a [`JobView`] carrying the segment bounds
pub fn flatten_jobs(task: &TaskRecord) -> Result<Vec<JobView>> {
    task.segments
        .iter()
        .enumerate()
        .map(|(i, segment)| match segment.jobs.as_slice() {
            [job] => Ok(JobView {
                id: job.id,
                status: job.status.clone(),
                start_frame: segment.start_frame,
                stop_frame: segment.stop_frame,
                url: job.url.clone(),
            }),
            jobs => Err(DataError::SegmentJobCount {
                task_id: task.id,
                segment: i,
                job_count: jobs.len(),
            }
            .into()),
        })
        .collect()
}

/// A frame whose owning job has not been assigned yet
#[derive(Debug)]
struct PendingFrame {
    id: String,
    file_name: String,
    width: u32,
    height: u32,
    owner: Option<(JobId, String)>,
}

/// Two-pass frame index construction
///
/// The builder is seeded from the metadata, then every job claims its frame range,
/// and [`finish`](Self::finish) checks that no frame was left unclaimed before
/// producing the immutable [`FrameIndex`].
#[derive(Debug)]
pub struct FrameIndexBuilder {
    task_id: TaskId,
    task_name: String,
    frames: BTreeMap<FrameId, PendingFrame>,
}

impl FrameIndexBuilder {
    /// Seed the builder by pairing the declared frame range with the metadata frames
    ///
    /// Position in `meta.frames` is the join key: the n-th descriptor belongs to frame
    /// `start_frame + n`.
    pub fn new(task: &TaskRecord, meta: &TaskMetadataRecord) -> Result<Self> {
        let expected = range_len(meta.start_frame, meta.stop_frame);
        if expected != meta.frames.len() {
            return Err(DataError::FrameCountMismatch {
                task_id: task.id,
                start_frame: meta.start_frame,
                stop_frame: meta.stop_frame,
                expected,
                actual: meta.frames.len(),
            }
            .into());
        }

        let frames = (meta.start_frame..=meta.stop_frame)
            .zip(&meta.frames)
            .map(|(frame_id, frame)| {
                (
                    frame_id,
                    PendingFrame {
                        id: image_path_to_image_id(&frame.name).to_string(),
                        file_name: file_name_from_path(&frame.name).to_string(),
                        width: frame.width,
                        height: frame.height,
                        owner: None,
                    },
                )
            })
            .collect();

        Ok(Self {
            task_id: task.id,
            task_name: task.name.clone(),
            frames,
        })
    }

    /// Mark every frame in the job's range as owned by the job
    ///
    /// A frame already owned by another job is taken over by this one.
    pub fn assign_job(&mut self, job: &JobView) -> Result<()> {
        for frame_id in job.start_frame..=job.stop_frame {
            let frame = self
                .frames
                .get_mut(&frame_id)
                .ok_or(DataError::JobMissingFrame {
                    job_id: job.id,
                    frame_id,
                })?;

            if let Some((previous, _)) = &frame.owner
                && *previous != job.id
            {
                warn!(
                    task_id = self.task_id.get(),
                    frame_id,
                    previous_job = previous.get(),
                    job_id = job.id.get(),
                    "frame claimed by overlapping jobs, keeping the later job"
                );
            }
            frame.owner = Some((job.id, job.status.clone()));
        }
        Ok(())
    }

    /// Check that every frame has an owner and freeze the index
    pub fn finish(self) -> Result<FrameIndex> {
        let mut frames = BTreeMap::new();
        for (frame_id, pending) in self.frames {
            let (job_id, status) = pending
                .owner
                .ok_or(DataError::FrameWithoutJob { frame_id })?;
            frames.insert(
                frame_id,
                Frame {
                    id: pending.id,
                    frame_id,
                    file_name: pending.file_name,
                    width: pending.width,
                    height: pending.height,
                    task_id: self.task_id,
                    task_name: self.task_name.clone(),
                    job_id,
                    status,
                },
            );
        }
        Ok(FrameIndex::from_map(frames))
    }
}

fn range_len(start: FrameId, stop: FrameId) -> usize {
    if stop < start {
        0
    } else {
        stop.checked_sub(start)
            .and_then(|d| d.checked_add(1))
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(usize::MAX)
    }
}
