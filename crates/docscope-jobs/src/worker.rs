//! Worker configuration, lifecycle events, and single-job execution.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::{broadcast, Semaphore};
use tracing::{error, info, warn};
use uuid::Uuid;

use docscope_core::defaults::{
    ACQUIRE_TIMEOUT_SECS, ENV_ACQUIRE_TIMEOUT_SECS, ENV_JOB_MAX_CONCURRENT, ENV_OUTPUT_ROOT,
    JOB_MAX_CONCURRENT, OUTPUT_ROOT,
};
use docscope_core::{JobKind, Stage};

use crate::context::JobContext;
use crate::pipeline::Pipeline;
use crate::store::StoredJob;

/// Configuration for job execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Maximum number of jobs running at once. `0` means unbounded.
    pub max_concurrent_jobs: usize,
    /// Timeout for a remote acquisition stage.
    pub acquire_timeout: Duration,
    /// Root under which each job gets `<job_id>/`.
    pub output_root: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: JOB_MAX_CONCURRENT,
            acquire_timeout: Duration::from_secs(ACQUIRE_TIMEOUT_SECS),
            output_root: PathBuf::from(OUTPUT_ROOT),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_MAX_CONCURRENT` | `4` | Max concurrent jobs (`0` = unbounded) |
    /// | `ACQUIRE_TIMEOUT_SECS` | `120` | Remote acquisition timeout |
    /// | `DOCSCOPE_OUTPUT_ROOT` | `docscope-output` | Job output root |
    pub fn from_env() -> Self {
        let max_concurrent_jobs = std::env::var(ENV_JOB_MAX_CONCURRENT)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(JOB_MAX_CONCURRENT);

        let acquire_timeout_secs = std::env::var(ENV_ACQUIRE_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(ACQUIRE_TIMEOUT_SECS);

        let output_root = std::env::var(ENV_OUTPUT_ROOT)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(OUTPUT_ROOT));

        Self {
            max_concurrent_jobs,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            output_root,
        }
    }

    /// Set maximum concurrent jobs (`0` = unbounded).
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    pub(crate) fn semaphore(&self) -> Option<Arc<Semaphore>> {
        (self.max_concurrent_jobs > 0).then(|| Arc::new(Semaphore::new(self.max_concurrent_jobs)))
    }
}

/// Event emitted over a job's lifetime.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was accepted and is waiting for a worker slot.
    JobQueued { job_id: Uuid, kind: JobKind },
    /// A job was started.
    JobStarted { job_id: Uuid, kind: JobKind },
    /// Job progress was updated.
    JobProgress {
        job_id: Uuid,
        percent: u8,
        message: Option<String>,
    },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid, kind: JobKind },
    /// A job failed.
    JobFailed {
        job_id: Uuid,
        kind: JobKind,
        error: String,
    },
}

impl WorkerEvent {
    pub fn job_id(&self) -> Uuid {
        match self {
            WorkerEvent::JobQueued { job_id, .. }
            | WorkerEvent::JobStarted { job_id, .. }
            | WorkerEvent::JobProgress { job_id, .. }
            | WorkerEvent::JobCompleted { job_id, .. }
            | WorkerEvent::JobFailed { job_id, .. } => *job_id,
        }
    }
}

/// Reference bundle for executing one job in a spawned task.
#[derive(Clone)]
pub(crate) struct JobRunner {
    pub(crate) pipeline: Arc<Pipeline>,
    pub(crate) semaphore: Option<Arc<Semaphore>>,
    pub(crate) event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobRunner {
    /// Wait for a worker slot, run the pipeline, and store the outcome.
    pub(crate) async fn execute(self, job: Arc<StoredJob>) {
        let (job_id, config) = job.read(|r| (r.id(), r.config().clone())).await;
        let kind = config.kind;

        let _permit = match &self.semaphore {
            Some(semaphore) => match semaphore.clone().acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    self.store_failure(&job, job_id, kind, Stage::Acquisition, e.to_string())
                        .await;
                    return;
                }
            },
            None => None,
        };

        let start = Instant::now();
        if let Err(e) = job.update(|r| r.mark_running()).await {
            error!(%job_id, error = %e, "Failed to start job");
            return;
        }
        info!(%job_id, job_kind = %kind, "Processing job");
        let _ = self.event_tx.send(WorkerEvent::JobStarted { job_id, kind });

        let ctx = JobContext::new(job_id, kind, job.clone(), self.event_tx.clone());
        let outcome = AssertUnwindSafe(self.pipeline.run(&ctx, &config))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => {
                let total = result.total_entities;
                let files = result.files_processed;
                match job.update(|r| r.complete(result)).await {
                    Ok(()) => {
                        info!(
                            %job_id,
                            job_kind = %kind,
                            document_count = files,
                            match_count = total,
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Job completed successfully"
                        );
                        let _ = self.event_tx.send(WorkerEvent::JobCompleted { job_id, kind });
                    }
                    Err(e) => error!(%job_id, error = %e, "Failed to mark job as completed"),
                }
            }
            Ok(Err(failure)) => {
                self.store_failure(&job, job_id, kind, failure.stage, failure.error.to_string())
                    .await;
            }
            Err(panic) => {
                let stage = ctx.active_stage().await.unwrap_or(Stage::Acquisition);
                let message = format!("pipeline panicked: {}", panic_message(panic.as_ref()));
                error!(%job_id, stage = %stage, %message, "Job task panicked");
                self.store_failure(&job, job_id, kind, stage, message).await;
            }
        }
    }

    async fn store_failure(
        &self,
        job: &StoredJob,
        job_id: Uuid,
        kind: JobKind,
        stage: Stage,
        message: String,
    ) {
        let stored = job
            .update(|r| {
                let failure = r.failure(stage, message.clone());
                r.fail(failure).map(|_| r.snapshot())
            })
            .await;
        match stored {
            Ok(snapshot) => {
                warn!(
                    %job_id,
                    job_kind = %kind,
                    stage = %stage,
                    error = %message,
                    "Job failed"
                );
                let _ = self.event_tx.send(WorkerEvent::JobFailed {
                    job_id,
                    kind,
                    error: snapshot.error_summary.unwrap_or(message),
                });
            }
            Err(e) => error!(%job_id, error = %e, "Failed to mark job as failed"),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.acquire_timeout, Duration::from_secs(120));
        assert_eq!(config.output_root, PathBuf::from("docscope-output"));
    }

    #[test]
    fn test_worker_config_builder() {
        let config = WorkerConfig::default()
            .with_max_concurrent(8)
            .with_acquire_timeout(Duration::from_secs(5))
            .with_output_root("/tmp/out");

        assert_eq!(config.max_concurrent_jobs, 8);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.output_root, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_zero_concurrency_is_unbounded() {
        assert!(WorkerConfig::default().with_max_concurrent(0).semaphore().is_none());
        let semaphore = WorkerConfig::default().with_max_concurrent(2).semaphore().unwrap();
        assert_eq!(semaphore.available_permits(), 2);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[test]
    fn test_event_job_id() {
        let id = Uuid::now_v7();
        let event = WorkerEvent::JobProgress {
            job_id: id,
            percent: 10,
            message: None,
        };
        assert_eq!(event.job_id(), id);
    }
}
