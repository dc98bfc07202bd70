//! Crawl job lifecycle.
//!
//! Jobs move `pending → running → {completed, failed, canceled}`
//! exactly once; terminal states are final and both transitions and
//! progress updates out of them are rejected. The manager is the sole
//! writer of job state and owns the process-wide event bus, emitting
//! a snapshot on every transition. At most one non-terminal job may
//! exist per source at a time.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{DocsiError, Result};
use crate::events::{DocsiEvent, EventBus};

/// Job lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl JobStatus {
    /// Terminal states accept no further transitions or progress.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

/// Monotonic progress counters for one crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    /// Stored documents only; rejected-after-fetch URLs do not count.
    pub pages_crawled: usize,
    pub pages_discovered: usize,
    pub pages_in_queue: usize,
    pub max_depth_reached: u32,
}

/// One crawl execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub source_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub progress: JobProgress,
    /// Short message derived from the first fatal error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Owner of all job state and the event bus.
pub struct JobManager {
    jobs: DashMap<String, Job>,
    active_by_source: DashMap<String, String>,
    bus: Arc<EventBus>,
}

impl JobManager {
    #[must_use]
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            jobs: DashMap::new(),
            active_by_source: DashMap::new(),
            bus,
        }
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Create a pending job for a source.
    ///
    /// # Errors
    ///
    /// `Validation` when the source already has a non-terminal job:
    /// concurrent crawls of one source are not supported.
    pub fn create_job(&self, source_id: &str) -> Result<Job> {
        let job_id = Uuid::new_v4().to_string();
        // Entry-based insert keeps the check-and-reserve atomic.
        match self.active_by_source.entry(source_id.to_string()) {
            Entry::Occupied(existing) => {
                return Err(DocsiError::Validation(format!(
                    "source {source_id} already has an active job {}",
                    existing.get()
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(job_id.clone());
            }
        }

        let job = Job {
            job_id: job_id.clone(),
            source_id: source_id.to_string(),
            status: JobStatus::Pending,
            start_time: None,
            end_time: None,
            progress: JobProgress::default(),
            error: None,
        };
        self.jobs.insert(job_id, job.clone());
        info!(job_id = %job.job_id, source_id, "job created");
        self.bus.publish(DocsiEvent::JobCreated { job: job.clone() });
        Ok(job)
    }

    /// Move a pending job to running. Happens exactly once per job.
    pub fn mark_running(&self, job_id: &str) -> Result<Job> {
        let job = self.transition(job_id, |job| {
            if job.status != JobStatus::Pending {
                return Err(DocsiError::Validation(format!(
                    "job {job_id} cannot start from {:?}",
                    job.status
                )));
            }
            job.status = JobStatus::Running;
            job.start_time = Some(Utc::now());
            Ok(())
        })?;
        self.bus.publish(DocsiEvent::JobStarted { job: job.clone() });
        Ok(job)
    }

    /// Update progress on a live job. Rejected in terminal states.
    pub fn update_progress(&self, job_id: &str, progress: JobProgress) -> Result<Job> {
        let job = self.transition(job_id, |job| {
            if job.status.is_terminal() {
                return Err(DocsiError::Validation(format!(
                    "job {job_id} is finished, progress rejected"
                )));
            }
            job.progress = progress;
            Ok(())
        })?;
        self.bus.publish(DocsiEvent::JobProgress { job: job.clone() });
        Ok(job)
    }

    /// Finish a running job successfully.
    pub fn mark_completed(&self, job_id: &str) -> Result<Job> {
        let job = self.finish(job_id, JobStatus::Completed, None)?;
        self.bus.publish(DocsiEvent::JobCompleted { job: job.clone() });
        Ok(job)
    }

    /// Finish a running job as failed with a short error message.
    pub fn mark_failed(&self, job_id: &str, error: &str) -> Result<Job> {
        let job = self.finish(job_id, JobStatus::Failed, Some(error.to_string()))?;
        self.bus.publish(DocsiEvent::JobFailed { job: job.clone() });
        Ok(job)
    }

    /// Cancel a pending or running job.
    ///
    /// Returns `false` when the job does not exist or is already
    /// terminal; cancellation of a finished job is not an error.
    pub fn cancel_job(&self, job_id: &str) -> bool {
        match self.finish(job_id, JobStatus::Canceled, None) {
            Ok(job) => {
                self.bus.publish(DocsiEvent::JobCanceled { job });
                true
            }
            Err(_) => false,
        }
    }

    #[must_use]
    pub fn get_job(&self, job_id: &str) -> Option<Job> {
        self.jobs.get(job_id).map(|entry| entry.clone())
    }

    /// Jobs in creation order is not tracked; this lists all known
    /// jobs for diagnostics.
    #[must_use]
    pub fn list_jobs(&self) -> Vec<Job> {
        self.jobs.iter().map(|entry| entry.clone()).collect()
    }

    fn finish(&self, job_id: &str, status: JobStatus, error: Option<String>) -> Result<Job> {
        let job = self.transition(job_id, |job| {
            if job.status.is_terminal() {
                return Err(DocsiError::Validation(format!(
                    "job {job_id} is already {:?}",
                    job.status
                )));
            }
            job.status = status;
            job.end_time = Some(Utc::now());
            job.error = error.clone();
            Ok(())
        })?;
        self.active_by_source.remove(&job.source_id);
        info!(job_id, status = ?status, "job finished");
        Ok(job)
    }

    fn transition<F>(&self, job_id: &str, apply: F) -> Result<Job>
    where
        F: FnOnce(&mut Job) -> Result<()>,
    {
        let mut entry = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| DocsiError::Validation(format!("unknown job {job_id}")))?;
        apply(entry.value_mut())?;
        Ok(entry.clone())
    }
}
