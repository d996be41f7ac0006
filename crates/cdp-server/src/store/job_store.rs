//! Job store
//!
//! Holds every job with its steps and logs, plus the cooperative
//! cancellation flags. All status transitions happen inside the store's
//! write lock, so the statistics invariant (`total` equals the sum of the
//! five buckets) holds at every observable instant.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use cdp_common::types::{
    Job, JobLog, JobLogLevel, JobStatistics, JobStatus, JobStep, StepStatus,
};

/// Errors from job store operations
#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Job {id} cannot transition from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, Job>,
    order: Vec<Uuid>,
    cancel_flags: HashMap<Uuid, Arc<AtomicBool>>,
}

/// Handle to the job store
#[derive(Clone, Default)]
pub struct JobStore {
    inner: Arc<RwLock<Inner>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly submitted job (status `queued`).
    pub async fn insert(&self, job: Job) {
        let mut inner = self.inner.write().await;
        inner.order.push(job.id);
        inner
            .cancel_flags
            .insert(job.id, Arc::new(AtomicBool::new(false)));
        inner.jobs.insert(job.id, job);
    }

    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.inner.read().await.jobs.get(&id).cloned()
    }

    /// Cooperative cancellation flag for a job, checked between steps.
    pub async fn cancel_flag(&self, id: Uuid) -> Option<Arc<AtomicBool>> {
        self.inner.read().await.cancel_flags.get(&id).cloned()
    }

    /// Jobs still in flight (queued or running), newest first.
    pub async fn list_active(&self) -> Vec<Job> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|j| !j.status.is_terminal())
            .cloned()
            .collect()
    }

    /// Job history (all statuses), newest first, bounded by `limit`.
    pub async fn list_history(&self, limit: usize) -> Vec<Job> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.jobs.get(id))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Record the planned steps for a job before execution starts.
    pub async fn set_steps(&self, id: Uuid, names: &[String]) -> Result<(), JobStoreError> {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        job.steps = names
            .iter()
            .map(|name| JobStep {
                name: name.clone(),
                status: StepStatus::Pending,
                records_processed: 0,
                records_failed: 0,
            })
            .collect();
        Ok(())
    }

    /// Apply a mutation to one step.
    pub async fn update_step<F>(&self, id: Uuid, index: usize, f: F) -> Result<(), JobStoreError>
    where
        F: FnOnce(&mut JobStep),
    {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        if let Some(step) = job.steps.get_mut(index) {
            f(step);
        }
        Ok(())
    }

    /// Append an ordered log entry to a job.
    pub async fn append_log(&self, id: Uuid, level: JobLogLevel, message: impl Into<String>) {
        let mut inner = self.inner.write().await;
        if let Some(job) = inner.jobs.get_mut(&id) {
            job.logs.push(JobLog {
                timestamp: Utc::now(),
                level,
                message: message.into(),
            });
        }
    }

    /// `queued -> running`, stamping `started_at`.
    pub async fn mark_running(&self, id: Uuid) -> Result<(), JobStoreError> {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        if job.status != JobStatus::Queued {
            return Err(JobStoreError::InvalidTransition {
                id,
                from: job.status,
                to: JobStatus::Running,
            });
        }
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        Ok(())
    }

    /// `queued -> cancelled` for a job that was dequeued before pickup.
    pub async fn cancel_queued(&self, id: Uuid) -> Result<Job, JobStoreError> {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        if job.status != JobStatus::Queued {
            return Err(JobStoreError::InvalidTransition {
                id,
                from: job.status,
                to: JobStatus::Cancelled,
            });
        }
        job.status = JobStatus::Cancelled;
        job.ended_at = Some(Utc::now());
        Ok(job.clone())
    }

    /// Transition a running job into a terminal status.
    pub async fn finish(
        &self,
        id: Uuid,
        status: JobStatus,
        error_message: Option<String>,
        result_summary: Option<String>,
    ) -> Result<Job, JobStoreError> {
        debug_assert!(status.is_terminal());
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        if job.status.is_terminal() {
            return Err(JobStoreError::InvalidTransition {
                id,
                from: job.status,
                to: status,
            });
        }
        job.status = status;
        job.ended_at = Some(Utc::now());
        job.error_message = error_message;
        job.result_summary = result_summary;
        Ok(job.clone())
    }

    /// Counts by status. Computed in one pass under the read lock, so no
    /// job is ever observed outside exactly one bucket.
    pub async fn statistics(&self) -> JobStatistics {
        let inner = self.inner.read().await;
        let mut stats = JobStatistics {
            queued: 0,
            running: 0,
            completed: 0,
            failed: 0,
            cancelled: 0,
            total: 0,
        };
        for job in inner.jobs.values() {
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
            stats.total += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_common::types::JobType;

    fn queued_job(source: Uuid) -> Job {
        Job {
            id: Uuid::new_v4(),
            name: "test job".to_string(),
            job_type: JobType::FullLoad,
            source_system_id: source,
            status: JobStatus::Queued,
            created_by: "test".to_string(),
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            result_summary: None,
            error_message: None,
            steps: vec![],
            logs: vec![],
        }
    }

    #[tokio::test]
    async fn test_insert_and_lifecycle() {
        let store = JobStore::new();
        let job = queued_job(Uuid::new_v4());
        let id = job.id;
        store.insert(job).await;

        store.mark_running(id).await.unwrap();
        let finished = store
            .finish(id, JobStatus::Completed, None, Some("done".to_string()))
            .await
            .unwrap();
        assert_eq!(finished.status, JobStatus::Completed);
        assert!(finished.ended_at.is_some());
    }

    #[tokio::test]
    async fn test_finish_twice_is_invalid() {
        let store = JobStore::new();
        let job = queued_job(Uuid::new_v4());
        let id = job.id;
        store.insert(job).await;
        store.mark_running(id).await.unwrap();
        store.finish(id, JobStatus::Failed, Some("boom".to_string()), None).await.unwrap();

        let result = store.finish(id, JobStatus::Completed, None, None).await;
        assert!(matches!(result, Err(JobStoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_cancel_queued_only_from_queued() {
        let store = JobStore::new();
        let job = queued_job(Uuid::new_v4());
        let id = job.id;
        store.insert(job).await;
        store.mark_running(id).await.unwrap();

        let result = store.cancel_queued(id).await;
        assert!(matches!(result, Err(JobStoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_statistics_total_invariant() {
        let store = JobStore::new();
        for _ in 0..3 {
            store.insert(queued_job(Uuid::new_v4())).await;
        }
        let running = queued_job(Uuid::new_v4());
        let running_id = running.id;
        store.insert(running).await;
        store.mark_running(running_id).await.unwrap();

        let stats = store.statistics().await;
        assert_eq!(stats.queued, 3);
        assert_eq!(stats.running, 1);
        assert_eq!(
            stats.total,
            stats.queued + stats.running + stats.completed + stats.failed + stats.cancelled
        );
    }

    #[tokio::test]
    async fn test_active_and_history_ordering() {
        let store = JobStore::new();
        let first = queued_job(Uuid::new_v4());
        let second = queued_job(Uuid::new_v4());
        let first_id = first.id;
        let second_id = second.id;
        store.insert(first).await;
        store.insert(second).await;

        let active = store.list_active().await;
        assert_eq!(active[0].id, second_id);
        assert_eq!(active[1].id, first_id);

        store.mark_running(first_id).await.unwrap();
        store.finish(first_id, JobStatus::Completed, None, None).await.unwrap();
        assert_eq!(store.list_active().await.len(), 1);
        assert_eq!(store.list_history(10).await.len(), 2);
    }

    #[tokio::test]
    async fn test_steps_and_logs() {
        let store = JobStore::new();
        let job = queued_job(Uuid::new_v4());
        let id = job.id;
        store.insert(job).await;

        store
            .set_steps(id, &["extract".to_string(), "load".to_string()])
            .await
            .unwrap();
        store
            .update_step(id, 0, |step| {
                step.status = StepStatus::Completed;
                step.records_processed = 42;
            })
            .await
            .unwrap();
        store.append_log(id, JobLogLevel::Info, "step finished").await;

        let job = store.get(id).await.unwrap();
        assert_eq!(job.steps.len(), 2);
        assert_eq!(job.steps[0].records_processed, 42);
        assert_eq!(job.logs.len(), 1);
    }
}
