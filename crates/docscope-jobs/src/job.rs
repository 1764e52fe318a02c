//! Job record: the authoritative state of one analysis job.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use docscope_core::defaults::PROGRESS_COMPLETE;
use docscope_core::{
    AnalysisResult, Error, JobConfig, JobError, JobId, JobStatus, JobStatusSnapshot, LogEntry,
    Result, Stage,
};

/// Step label of a job that has not started.
pub const STEP_QUEUED: &str = "Queued";
/// Step label of a completed job.
pub const STEP_COMPLETED: &str = "Completed";
/// Step label of a failed job.
pub const STEP_FAILED: &str = "Failed";

/// Mutable state of one job, guarded by the store's per-record lock.
///
/// Progress never decreases and only reaches 100 on completion. Status
/// moves forward only; a terminal record rejects further transitions.
#[derive(Debug, Clone)]
pub struct JobRecord {
    id: JobId,
    config: Arc<JobConfig>,
    status: JobStatus,
    progress: u8,
    current_step: String,
    active_stage: Option<Stage>,
    last_stage: Option<Stage>,
    logs: Vec<LogEntry>,
    result: Option<Arc<AnalysisResult>>,
    error: Option<JobError>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(id: JobId, config: JobConfig) -> Self {
        Self {
            id,
            config: Arc::new(config),
            status: JobStatus::Queued,
            progress: 0,
            current_step: STEP_QUEUED.to_string(),
            active_stage: None,
            last_stage: None,
            logs: Vec::new(),
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn config(&self) -> &Arc<JobConfig> {
        &self.config
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn current_step(&self) -> &str {
        &self.current_step
    }

    /// Stage currently executing, if any.
    pub fn active_stage(&self) -> Option<Stage> {
        self.active_stage
    }

    /// Last stage that finished successfully.
    pub fn last_stage(&self) -> Option<Stage> {
        self.last_stage
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn result(&self) -> Option<&Arc<AnalysisResult>> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    fn transition(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::Internal(format!(
                "Illegal transition for job {}: {} -> {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_running(&mut self) -> Result<()> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Raise progress to `percent`. Lower values are ignored and values at or
    /// above 100 are held at 99 until completion. Returns the stored value.
    pub fn set_progress(&mut self, percent: u8) -> u8 {
        if self.status.is_terminal() {
            return self.progress;
        }
        let capped = percent.min(PROGRESS_COMPLETE - 1);
        self.progress = self.progress.max(capped);
        self.progress
    }

    pub fn enter_stage(&mut self, stage: Stage) {
        if self.status.is_terminal() {
            return;
        }
        self.active_stage = Some(stage);
        self.current_step = stage.step_label().to_string();
    }

    pub fn finish_stage(&mut self, stage: Stage) {
        if self.active_stage == Some(stage) {
            self.active_stage = None;
        }
        self.last_stage = Some(self.last_stage.map_or(stage, |last| last.max(stage)));
    }

    /// Append a log entry. Terminal records stay read-only.
    pub fn log(&mut self, entry: LogEntry) {
        if !self.status.is_terminal() {
            self.logs.push(entry);
        }
    }

    pub fn complete(&mut self, result: AnalysisResult) -> Result<()> {
        self.transition(JobStatus::Completed)?;
        self.logs.push(LogEntry::success(format!(
            "Analysis complete: {} files, {} matches",
            result.files_processed, result.total_entities
        )));
        self.progress = PROGRESS_COMPLETE;
        self.current_step = STEP_COMPLETED.to_string();
        self.active_stage = None;
        self.result = Some(Arc::new(result));
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: JobError) -> Result<()> {
        self.transition(JobStatus::Failed)?;
        self.logs.push(LogEntry::error(error.summary()));
        self.current_step = STEP_FAILED.to_string();
        self.active_stage = None;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Build a [`JobError`] for a failure in `stage`.
    pub fn failure(&self, stage: Stage, message: impl Into<String>) -> JobError {
        JobError {
            stage,
            message: message.into(),
            last_stage: self.last_stage,
        }
    }

    pub fn snapshot(&self) -> JobStatusSnapshot {
        JobStatusSnapshot {
            job_id: self.id,
            kind: self.config.kind,
            status: self.status,
            progress: self.progress,
            current_step: self.current_step.clone(),
            error_summary: self.error.as_ref().map(JobError::summary),
            last_stage: self.last_stage,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscope_core::MatchResult;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn record() -> JobRecord {
        JobRecord::new(
            Uuid::now_v7(),
            JobConfig::fetch("malaria", 5).with_dictionary("software"),
        )
    }

    fn result() -> AnalysisResult {
        AnalysisResult {
            files_processed: 1,
            total_entities: 2,
            processing_time_ms: 10,
            output_files: BTreeMap::new(),
            data: MatchResult::new(),
            fallback_documents: Vec::new(),
        }
    }

    #[test]
    fn test_new_record_is_queued() {
        let r = record();
        let snap = r.snapshot();
        assert_eq!(snap.status, JobStatus::Queued);
        assert_eq!(snap.progress, 0);
        assert_eq!(snap.current_step, STEP_QUEUED);
        assert!(snap.started_at.is_none());
    }

    #[test]
    fn test_progress_is_monotonic_and_capped() {
        let mut r = record();
        r.mark_running().unwrap();
        assert_eq!(r.set_progress(40), 40);
        assert_eq!(r.set_progress(25), 40);
        assert_eq!(r.set_progress(100), 99);
        r.complete(result()).unwrap();
        assert_eq!(r.progress(), 100);
        assert_eq!(r.set_progress(10), 100);
    }

    #[test]
    fn test_transitions_are_one_directional() {
        let mut r = record();
        assert!(r.complete(result()).is_err(), "queued cannot complete");
        r.mark_running().unwrap();
        assert!(r.mark_running().is_err());
        r.complete(result()).unwrap();
        let err = r.failure(Stage::Export, "late");
        assert!(r.fail(err).is_err());
        assert_eq!(r.status(), JobStatus::Completed);
    }

    #[test]
    fn test_failure_keeps_progress_and_last_stage() {
        let mut r = record();
        r.mark_running().unwrap();
        r.enter_stage(Stage::Acquisition);
        r.set_progress(25);
        r.finish_stage(Stage::Acquisition);
        r.enter_stage(Stage::Sectioning);
        assert_eq!(r.active_stage(), Some(Stage::Sectioning));

        let err = r.failure(Stage::Sectioning, "boom");
        r.fail(err).unwrap();

        let snap = r.snapshot();
        assert_eq!(snap.status, JobStatus::Failed);
        assert_eq!(snap.progress, 25);
        assert_eq!(snap.last_stage, Some(Stage::Acquisition));
        assert_eq!(snap.error_summary.as_deref(), Some("sectioning failed: boom"));
        assert!(r.result().is_none());
        assert_eq!(r.logs().last().unwrap().level, docscope_core::LogLevel::Error);
    }

    #[test]
    fn test_terminal_record_rejects_logs() {
        let mut r = record();
        r.mark_running().unwrap();
        r.log(LogEntry::info("working"));
        r.complete(result()).unwrap();
        let count = r.logs().len();
        r.log(LogEntry::info("after"));
        assert_eq!(r.logs().len(), count);
    }
}
