//! Job orchestrator
//!
//! State machine per job: `queued -> running -> {completed|failed|cancelled}`.
//! A dispatcher drains queues FIFO per source system; jobs for different
//! sources run concurrently on a bounded worker pool. Cancellation is
//! cooperative: a queued job is dequeued directly, a running job's flag is
//! checked between steps so a step always completes or fails atomically.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use cdp_common::types::{Job, JobLogLevel, JobStatus, JobType, StepStatus};

use super::adapter::{JobAdapter, StepError, StepSpec};
use crate::config::JobsConfig;
use crate::store::{JobStore, JobStoreError, SourceRegistry};

/// Errors from job submission
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Job name is required")]
    NameRequired,

    #[error("Source system {0} not found")]
    SourceNotFound(Uuid),

    #[error("Source system {0} is deactivated")]
    SourceInactive(Uuid),
}

/// Errors from cancellation
#[derive(Debug, Error)]
pub enum CancelError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Job {id} is already terminal ({status})")]
    AlreadyTerminal { id: Uuid, status: JobStatus },
}

/// Acknowledgement of a cancel request. Cancellation of a running job is
/// cooperative: the caller gets an ack, not a guarantee of immediate stop.
#[derive(Debug, Clone, Serialize)]
pub struct CancelAck {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

#[derive(Default)]
struct SchedState {
    /// FIFO queue per source system
    queues: HashMap<Uuid, VecDeque<Uuid>>,
    /// Source systems in first-seen order, scanned round-robin
    sources: Vec<Uuid>,
    /// Sources with a job currently running (per-source serialization)
    busy: HashSet<Uuid>,
    running: usize,
}

/// The job orchestrator.
pub struct JobOrchestrator {
    store: JobStore,
    registry: SourceRegistry,
    adapters: HashMap<JobType, Arc<dyn JobAdapter>>,
    config: JobsConfig,
    sched: Mutex<SchedState>,
    notify: Notify,
}

impl JobOrchestrator {
    pub fn new(
        store: JobStore,
        registry: SourceRegistry,
        adapters: HashMap<JobType, Arc<dyn JobAdapter>>,
        config: JobsConfig,
    ) -> Self {
        Self {
            store,
            registry,
            adapters,
            config,
            sched: Mutex::new(SchedState::default()),
            notify: Notify::new(),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Spawn the dispatcher. Returns its handle; the dispatcher runs for
    /// the life of the process.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                concurrency = self.config.max_concurrency,
                "Job dispatcher started"
            );
            loop {
                Self::dispatch_ready(&self).await;
                self.notify.notified().await;
            }
        })
    }

    /// Validate and enqueue a job; returns immediately with status queued.
    #[tracing::instrument(skip(self))]
    pub async fn submit(
        &self,
        name: &str,
        job_type: JobType,
        source_system_id: Uuid,
        created_by: &str,
    ) -> Result<Job, SubmitError> {
        if name.trim().is_empty() {
            return Err(SubmitError::NameRequired);
        }

        let source = self
            .registry
            .get(source_system_id)
            .await
            .ok_or(SubmitError::SourceNotFound(source_system_id))?;
        if !source.active {
            return Err(SubmitError::SourceInactive(source_system_id));
        }

        let job = Job {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            job_type,
            source_system_id,
            status: JobStatus::Queued,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            result_summary: None,
            error_message: None,
            steps: vec![],
            logs: vec![],
        };

        self.store.insert(job.clone()).await;

        {
            let mut sched = self.sched.lock().await;
            if !sched.sources.contains(&source_system_id) {
                sched.sources.push(source_system_id);
            }
            sched
                .queues
                .entry(source_system_id)
                .or_default()
                .push_back(job.id);
        }
        self.notify.notify_one();

        tracing::info!(job_id = %job.id, job_type = %job_type, source_system_id = %source_system_id, "Job queued");

        Ok(job)
    }

    /// Cancel a job. Queued jobs are cancelled directly; running jobs get
    /// their cooperative flag set; terminal jobs are rejected.
    pub async fn cancel(&self, job_id: Uuid) -> Result<CancelAck, CancelError> {
        let job = self
            .store
            .get(job_id)
            .await
            .ok_or(CancelError::NotFound(job_id))?;

        if job.status.is_terminal() {
            return Err(CancelError::AlreadyTerminal {
                id: job_id,
                status: job.status,
            });
        }

        // Try to pull it out of the queue before the dispatcher does.
        let dequeued = {
            let mut sched = self.sched.lock().await;
            match sched.queues.get_mut(&job.source_system_id) {
                Some(queue) => {
                    let before = queue.len();
                    queue.retain(|id| *id != job_id);
                    before != queue.len()
                },
                None => false,
            }
        };

        if dequeued {
            match self.store.cancel_queued(job_id).await {
                Ok(job) => {
                    self.store
                        .append_log(job_id, JobLogLevel::Info, "Job cancelled while queued")
                        .await;
                    return Ok(CancelAck {
                        job_id,
                        status: job.status,
                        message: "Job cancelled".to_string(),
                    });
                },
                // Raced with the dispatcher; fall through to the flag.
                Err(JobStoreError::InvalidTransition { .. }) => {},
                Err(JobStoreError::NotFound(_)) => return Err(CancelError::NotFound(job_id)),
            }
        }

        if let Some(flag) = self.store.cancel_flag(job_id).await {
            flag.store(true, Ordering::SeqCst);
        }
        self.store
            .append_log(
                job_id,
                JobLogLevel::Info,
                "Cancellation requested; stopping after the current step",
            )
            .await;

        Ok(CancelAck {
            job_id,
            status: JobStatus::Running,
            message: "Cancellation requested".to_string(),
        })
    }

    /// Start every eligible job: FIFO within a source, one job per source
    /// at a time, bounded by the concurrency limit overall.
    async fn dispatch_ready(this: &Arc<Self>) {
        let mut to_start = Vec::new();
        {
            let mut sched = this.sched.lock().await;
            let sources = sched.sources.clone();
            for source_id in sources {
                if sched.running >= this.config.max_concurrency {
                    break;
                }
                if sched.busy.contains(&source_id) {
                    continue;
                }
                let Some(queue) = sched.queues.get_mut(&source_id) else {
                    continue;
                };
                if let Some(job_id) = queue.pop_front() {
                    sched.busy.insert(source_id);
                    sched.running += 1;
                    to_start.push((source_id, job_id));
                }
            }
        }

        for (source_id, job_id) in to_start {
            let orchestrator = Arc::clone(this);
            tokio::spawn(async move {
                orchestrator.run_job(job_id).await;

                {
                    let mut sched = orchestrator.sched.lock().await;
                    sched.busy.remove(&source_id);
                    sched.running -= 1;
                }
                orchestrator.notify.notify_one();
            });
        }
    }

    /// Execute one job to a terminal status.
    async fn run_job(&self, job_id: Uuid) {
        let Some(job) = self.store.get(job_id).await else {
            tracing::error!(job_id = %job_id, "Dispatched job vanished from the store");
            return;
        };

        let cancel_flag = self.store.cancel_flag(job_id).await;
        let cancelled = || {
            cancel_flag
                .as_ref()
                .map(|f| f.load(Ordering::SeqCst))
                .unwrap_or(false)
        };

        if self.store.mark_running(job_id).await.is_err() {
            // Cancelled between dequeue and pickup.
            return;
        }
        self.store
            .append_log(job_id, JobLogLevel::Info, format!("Job '{}' started", job.name))
            .await;

        let Some(adapter) = self.adapters.get(&job.job_type).cloned() else {
            let message = format!("No adapter registered for job type '{}'", job.job_type);
            self.store.append_log(job_id, JobLogLevel::Error, &message).await;
            let _ = self.store.finish(job_id, JobStatus::Failed, Some(message), None).await;
            return;
        };

        let specs = adapter.plan(&job);
        let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        if self.store.set_steps(job_id, &names).await.is_err() {
            return;
        }

        let mut total_processed = 0u64;
        let mut total_failed = 0u64;

        for (index, spec) in specs.iter().enumerate() {
            // Cooperative cancellation, checked between steps only.
            if cancelled() {
                self.skip_remaining(job_id, index, specs.len()).await;
                self.store
                    .append_log(job_id, JobLogLevel::Info, "Job cancelled between steps")
                    .await;
                let _ = self
                    .store
                    .finish(job_id, JobStatus::Cancelled, None, None)
                    .await;
                return;
            }

            let _ = self
                .store
                .update_step(job_id, index, |step| step.status = StepStatus::Running)
                .await;
            self.store
                .append_log(job_id, JobLogLevel::Info, format!("Step '{}' started", spec.name))
                .await;

            match self.run_step_with_retry(&adapter, job_id, spec).await {
                Ok(outcome) => {
                    total_processed += outcome.records_processed;
                    total_failed += outcome.records_failed;
                    let _ = self
                        .store
                        .update_step(job_id, index, |step| {
                            step.status = StepStatus::Completed;
                            step.records_processed = outcome.records_processed;
                            step.records_failed = outcome.records_failed;
                        })
                        .await;
                    let detail = outcome.detail.unwrap_or_else(|| {
                        format!(
                            "{} records processed, {} failed",
                            outcome.records_processed, outcome.records_failed
                        )
                    });
                    self.store
                        .append_log(
                            job_id,
                            JobLogLevel::Info,
                            format!("Step '{}' completed: {}", spec.name, detail),
                        )
                        .await;
                },
                Err(error) => {
                    let _ = self
                        .store
                        .update_step(job_id, index, |step| step.status = StepStatus::Failed)
                        .await;
                    let message = format!("Step '{}' failed: {}", spec.name, error);
                    self.store.append_log(job_id, JobLogLevel::Error, &message).await;

                    if spec.continue_on_error {
                        total_failed += 1;
                        continue;
                    }

                    self.skip_remaining(job_id, index + 1, specs.len()).await;
                    let _ = self
                        .store
                        .finish(job_id, JobStatus::Failed, Some(message), None)
                        .await;
                    return;
                },
            }
        }

        if cancelled() {
            let _ = self
                .store
                .finish(job_id, JobStatus::Cancelled, None, None)
                .await;
            return;
        }

        let summary = format!(
            "{} records processed, {} failed across {} steps",
            total_processed,
            total_failed,
            specs.len()
        );
        self.store
            .append_log(job_id, JobLogLevel::Info, "Job completed")
            .await;
        let _ = self
            .store
            .finish(job_id, JobStatus::Completed, None, Some(summary))
            .await;
    }

    async fn run_step_with_retry(
        &self,
        adapter: &Arc<dyn JobAdapter>,
        job_id: Uuid,
        spec: &StepSpec,
    ) -> Result<super::adapter::StepOutcome, StepError> {
        let mut attempt = 0;
        loop {
            // Fresh snapshot so the adapter sees earlier steps' effects.
            let job = self
                .store
                .get(job_id)
                .await
                .ok_or_else(|| StepError::Fatal("job vanished from the store".to_string()))?;

            match adapter.run_step(&job, spec).await {
                Ok(outcome) => return Ok(outcome),
                Err(StepError::Retryable(msg)) if attempt < self.config.step_retry_limit => {
                    attempt += 1;
                    self.store
                        .append_log(
                            job_id,
                            JobLogLevel::Warn,
                            format!("Step '{}' retry {} after transient error: {}", spec.name, attempt, msg),
                        )
                        .await;
                    tokio::time::sleep(Duration::from_millis(
                        self.config.step_retry_backoff_ms * attempt as u64,
                    ))
                    .await;
                },
                Err(error) => return Err(error),
            }
        }
    }

    async fn skip_remaining(&self, job_id: Uuid, from: usize, total: usize) {
        for index in from..total {
            let _ = self
                .store
                .update_step(job_id, index, |step| {
                    if step.status == StepStatus::Pending {
                        step.status = StepStatus::Skipped;
                    }
                })
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::adapter::StepOutcome;
    use crate::state::test_support;
    use async_trait::async_trait;

    /// Adapter whose second step fails fatally.
    struct FailingAdapter;

    #[async_trait]
    impl JobAdapter for FailingAdapter {
        fn plan(&self, _job: &Job) -> Vec<StepSpec> {
            vec![
                StepSpec::new("extract", false),
                StepSpec::new("load", false),
                StepSpec::new("finalize", false),
            ]
        }

        async fn run_step(&self, _job: &Job, step: &StepSpec) -> Result<StepOutcome, StepError> {
            match step.name.as_str() {
                "extract" => Ok(StepOutcome {
                    records_processed: 10,
                    records_failed: 0,
                    detail: None,
                }),
                "load" => Err(StepError::Fatal("disk on fire".to_string())),
                _ => Ok(StepOutcome::default()),
            }
        }
    }

    /// Adapter that always succeeds instantly.
    struct NoopAdapter;

    #[async_trait]
    impl JobAdapter for NoopAdapter {
        fn plan(&self, _job: &Job) -> Vec<StepSpec> {
            vec![StepSpec::new("noop", false)]
        }

        async fn run_step(&self, _job: &Job, _step: &StepSpec) -> Result<StepOutcome, StepError> {
            Ok(StepOutcome {
                records_processed: 1,
                records_failed: 0,
                detail: None,
            })
        }
    }

    async fn wait_terminal(store: &JobStore, job_id: Uuid) -> Job {
        for _ in 0..200 {
            if let Some(job) = store.get(job_id).await {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} did not reach a terminal status");
    }

    fn orchestrator_with(
        state: &crate::state::AppState,
        adapter: Arc<dyn JobAdapter>,
    ) -> Arc<JobOrchestrator> {
        let mut adapters: HashMap<JobType, Arc<dyn JobAdapter>> = HashMap::new();
        adapters.insert(JobType::FullLoad, adapter);
        Arc::new(JobOrchestrator::new(
            state.jobs.clone(),
            state.sources.clone(),
            adapters,
            state.config.jobs.clone(),
        ))
    }

    #[tokio::test]
    async fn test_submit_validates_fields() {
        let state = test_support::state_with_crm().await;
        let orchestrator = orchestrator_with(&state, Arc::new(NoopAdapter));

        let result = orchestrator
            .submit("  ", JobType::FullLoad, Uuid::new_v4(), "test")
            .await;
        assert!(matches!(result, Err(SubmitError::NameRequired)));

        let result = orchestrator
            .submit("load", JobType::FullLoad, Uuid::new_v4(), "test")
            .await;
        assert!(matches!(result, Err(SubmitError::SourceNotFound(_))));
    }

    #[tokio::test]
    async fn test_job_runs_to_completed() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();
        let orchestrator = orchestrator_with(&state, Arc::new(NoopAdapter));
        orchestrator.clone().start();

        let job = orchestrator
            .submit("nightly load", JobType::FullLoad, source.id, "test")
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Queued);

        let finished = wait_terminal(&state.jobs, job.id).await;
        assert_eq!(finished.status, JobStatus::Completed);
        assert!(finished.started_at.is_some());
        assert!(finished.result_summary.is_some());
    }

    #[tokio::test]
    async fn test_fatal_step_fails_job_with_partial_steps() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();
        let orchestrator = orchestrator_with(&state, Arc::new(FailingAdapter));
        orchestrator.clone().start();

        let job = orchestrator
            .submit("doomed load", JobType::FullLoad, source.id, "test")
            .await
            .unwrap();

        let finished = wait_terminal(&state.jobs, job.id).await;
        assert_eq!(finished.status, JobStatus::Failed);
        let error = finished.error_message.expect("failure captured");
        assert!(error.contains("load"));

        let completed = finished
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        assert!(completed < finished.steps.len());
        assert!(finished
            .steps
            .iter()
            .any(|s| s.status == StepStatus::Skipped));
    }

    #[tokio::test]
    async fn test_cancel_queued_job() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();
        let orchestrator = orchestrator_with(&state, Arc::new(NoopAdapter));
        // Dispatcher not started: the job stays queued.

        let job = orchestrator
            .submit("parked", JobType::FullLoad, source.id, "test")
            .await
            .unwrap();
        let ack = orchestrator.cancel(job.id).await.unwrap();
        assert_eq!(ack.status, JobStatus::Cancelled);

        let stored = state.jobs.get(job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_terminal_job_is_rejected() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();
        let orchestrator = orchestrator_with(&state, Arc::new(NoopAdapter));
        orchestrator.clone().start();

        let job = orchestrator
            .submit("done", JobType::FullLoad, source.id, "test")
            .await
            .unwrap();
        let finished = wait_terminal(&state.jobs, job.id).await;
        assert_eq!(finished.status, JobStatus::Completed);

        let result = orchestrator.cancel(job.id).await;
        assert!(matches!(result, Err(CancelError::AlreadyTerminal { .. })));

        // And the status did not change.
        assert_eq!(
            state.jobs.get(job.id).await.unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_statistics_invariant_through_lifecycle() {
        let state = test_support::state_with_crm().await;
        let source = state.sources.find_by_name("CRM").await.unwrap();
        let orchestrator = orchestrator_with(&state, Arc::new(NoopAdapter));
        orchestrator.clone().start();

        for i in 0..5 {
            orchestrator
                .submit(&format!("job {i}"), JobType::FullLoad, source.id, "test")
                .await
                .unwrap();
        }

        for _ in 0..50 {
            let stats = state.jobs.statistics().await;
            assert_eq!(
                stats.total,
                stats.queued + stats.running + stats.completed + stats.failed + stats.cancelled
            );
            if stats.completed == 5 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("jobs did not drain");
    }
}
