//! Per-job context handed to the pipeline.

use std::sync::Arc;

use tokio::sync::broadcast;

use docscope_core::{JobId, JobKind, LogEntry, Stage};

use crate::store::StoredJob;
use crate::worker::WorkerEvent;

/// Reporting handle for one running job.
///
/// Every method takes the record lock once, so a progress change and the log
/// line describing it become visible together.
#[derive(Clone)]
pub struct JobContext {
    job_id: JobId,
    kind: JobKind,
    job: Arc<StoredJob>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobContext {
    pub(crate) fn new(
        job_id: JobId,
        kind: JobKind,
        job: Arc<StoredJob>,
        event_tx: broadcast::Sender<WorkerEvent>,
    ) -> Self {
        Self {
            job_id,
            kind,
            job,
            event_tx,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    fn emit_progress(&self, percent: u8, message: Option<String>) {
        let _ = self.event_tx.send(WorkerEvent::JobProgress {
            job_id: self.job_id,
            percent,
            message,
        });
    }

    /// Raise progress, optionally logging a line with it.
    pub async fn report_progress(&self, percent: u8, entry: Option<LogEntry>) {
        let message = entry.as_ref().map(|e| e.message.clone());
        let (before, after) = self
            .job
            .update(|r| {
                let before = r.progress();
                let after = r.set_progress(percent);
                if let Some(entry) = entry {
                    r.log(entry);
                }
                (before, after)
            })
            .await;
        if after != before || message.is_some() {
            self.emit_progress(after, message);
        }
    }

    /// Mark `stage` active, set its entry checkpoint and log it.
    pub async fn enter_stage(&self, stage: Stage, percent: u8) {
        let after = self
            .job
            .update(|r| {
                r.enter_stage(stage);
                r.log(LogEntry::info(stage.step_label()));
                r.set_progress(percent)
            })
            .await;
        self.emit_progress(after, Some(stage.step_label().to_string()));
    }

    /// Mark `stage` finished, with its exit checkpoint and a success line.
    pub async fn finish_stage(&self, stage: Stage, percent: u8, message: impl Into<String>) {
        let message = message.into();
        let after = self
            .job
            .update(|r| {
                r.finish_stage(stage);
                r.log(LogEntry::success(message.clone()));
                r.set_progress(percent)
            })
            .await;
        self.emit_progress(after, Some(message));
    }

    pub async fn log(&self, entry: LogEntry) {
        self.job.update(|r| r.log(entry)).await;
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.log(LogEntry::info(message)).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.log(LogEntry::error(message)).await;
    }

    /// Stage currently executing, for attributing unexpected failures.
    pub async fn active_stage(&self) -> Option<Stage> {
        self.job.read(|r| r.active_stage()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobRecord;
    use crate::store::JobStore;
    use docscope_core::{JobConfig, LogLevel};
    use uuid::Uuid;

    async fn context() -> (JobContext, Arc<StoredJob>, broadcast::Receiver<WorkerEvent>) {
        let store = JobStore::new();
        let id = Uuid::now_v7();
        let job = store
            .insert(JobRecord::new(id, JobConfig::fetch("q", 1).with_dictionary("d")))
            .await;
        job.update(|r| r.mark_running()).await.unwrap();
        let (tx, rx) = broadcast::channel(16);
        (JobContext::new(id, JobKind::Fetch, job.clone(), tx), job, rx)
    }

    #[tokio::test]
    async fn test_stage_reporting_updates_record_and_emits() {
        let (ctx, job, mut rx) = context().await;

        ctx.enter_stage(Stage::Acquisition, 10).await;
        assert_eq!(ctx.active_stage().await, Some(Stage::Acquisition));
        ctx.finish_stage(Stage::Acquisition, 25, "Acquired 1 document").await;

        let (progress, last, logs) = job
            .read(|r| (r.progress(), r.last_stage(), r.logs().to_vec()))
            .await;
        assert_eq!(progress, 25);
        assert_eq!(last, Some(Stage::Acquisition));
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].level, LogLevel::Success);

        match rx.recv().await.unwrap() {
            WorkerEvent::JobProgress { percent, .. } => assert_eq!(percent, 10),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_report_progress_never_lowers() {
        let (ctx, job, _rx) = context().await;
        ctx.report_progress(50, None).await;
        ctx.report_progress(30, Some(LogEntry::info("late update"))).await;
        assert_eq!(job.read(|r| r.progress()).await, 50);
        assert_eq!(job.read(|r| r.logs().len()).await, 1);
    }
}
