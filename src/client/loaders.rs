//! Project, task, metadata and annotation loading.

use tracing::{debug, info};

use super::CvatClient;
use crate::error::Result;
use crate::reconcile::reconcile;
use crate::types::{
    AnnotationsRecord, JobView, ProjectId, ProjectRecord, TaskData, TaskId, TaskMetadataRecord,
    TaskRecord, TaskSummary,
};

impl CvatClient {
    /// Fetch a project record
    pub async fn load_project(&self, project_id: ProjectId) -> Result<ProjectRecord> {
        self.fetch(&self.api_url(&format!("projects/{}", project_id)))
            .await
    }

    /// Fetch a task record including its segments and jobs
    pub async fn load_task(&self, task_id: TaskId) -> Result<TaskRecord> {
        self.fetch(&self.api_url(&format!("tasks/{}", task_id))).await
    }

    /// Fetch the frame metadata of a task
    pub async fn load_task_metadata(&self, task_id: TaskId) -> Result<TaskMetadataRecord> {
        self.fetch(&self.api_url(&format!("tasks/{}/data/meta", task_id)))
            .await
    }

    /// Load a project and a summary of each of its tasks
    ///
    /// Tasks are fetched one after another in the order the project lists them.
    pub async fn load_project_data(
        &self,
        project_id: ProjectId,
    ) -> Result<(ProjectRecord, Vec<TaskSummary>)> {
        let project = self.load_project(project_id).await?;

        let mut tasks = Vec::with_capacity(project.tasks.len());
        for task_id in &project.tasks {
            let task = self.load_task(*task_id).await?;
            tasks.push(TaskSummary::from(&task));
        }

        info!(
            project_id = project_id.get(),
            task_count = tasks.len(),
            "loaded project data"
        );

        Ok((project, tasks))
    }

    /// Load a task together with its jobs and its frame index
    ///
    /// The task record and its metadata are fetched separately and reconciled; any
    /// structural inconsistency between them fails the whole call.
    pub async fn load_task_data(&self, task_id: TaskId) -> Result<TaskData> {
        let task = self.load_task(task_id).await?;
        let meta = self.load_task_metadata(task_id).await?;

        let (jobs, frames) = reconcile(&task, &meta)?;

        info!(
            task_id = task_id.get(),
            job_count = jobs.len(),
            frame_count = frames.len(),
            "loaded task data"
        );

        Ok(TaskData { task, jobs, frames })
    }

    /// Load the annotations of a job
    pub async fn load_annotations(&self, job: &JobView) -> Result<AnnotationsRecord> {
        debug!(job_id = job.id.get(), "loading job annotations");
        self.load_annotations_from_url(&job.url).await
    }

    /// Load annotations given only a job URL
    ///
    /// A single trailing slash on `job_url` is ignored.
    pub async fn load_annotations_from_url(&self, job_url: &str) -> Result<AnnotationsRecord> {
        let job_url = job_url.strip_suffix('/').unwrap_or(job_url);
        self.fetch(&format!("{}/annotations", job_url)).await
    }
}
