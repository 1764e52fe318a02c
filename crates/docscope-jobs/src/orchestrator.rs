//! Job orchestrator: submission, status, results, and artifact lookup.
//!
//! Submitting a job validates its configuration, registers a queued record,
//! and spawns a task that waits for a worker slot before running the
//! pipeline. The caller never blocks on the job. Status, logs and results
//! are read from the shared store at any time.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use docscope_core::defaults::{ENTITY_TYPES, ENTITY_TYPE_ALL, EVENT_BUS_CAPACITY};
use docscope_core::{
    AnalysisResult, CorpusClient, DictionaryInfo, DictionarySource, EntityRecognizer, Error,
    JobConfig, JobId, JobStatus, JobStatusSnapshot, LogEntry, Result, SectionCode,
};
use docscope_inference::GlinerBackend;
use docscope_text::{DictionaryStore, DirectoryDictionarySource, Sectioner};

use crate::europe_pmc::EuropePmcClient;
use crate::job::JobRecord;
use crate::pipeline::Pipeline;
use crate::store::JobStore;
use crate::worker::{JobRunner, WorkerConfig, WorkerEvent};

/// Builder for [`JobOrchestrator`].
pub struct OrchestratorBuilder {
    dictionaries: Arc<DictionaryStore>,
    recognizer: Option<Arc<dyn EntityRecognizer>>,
    corpus: Option<Arc<dyn CorpusClient>>,
    config: WorkerConfig,
}

impl OrchestratorBuilder {
    /// Start from a dictionary source. No recognizer or corpus client is
    /// configured until added.
    pub fn new(source: Arc<dyn DictionarySource>) -> Self {
        Self::with_dictionary_store(Arc::new(DictionaryStore::new(source)))
    }

    /// Start from an existing, possibly shared, dictionary store.
    pub fn with_dictionary_store(dictionaries: Arc<DictionaryStore>) -> Self {
        Self {
            dictionaries,
            recognizer: None,
            corpus: None,
            config: WorkerConfig::default(),
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_corpus_client(mut self, corpus: Arc<dyn CorpusClient>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> JobOrchestrator {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let semaphore = self.config.semaphore();
        let pipeline = Pipeline {
            dictionaries: self.dictionaries.clone(),
            recognizer: self.recognizer,
            corpus: self.corpus,
            sectioner: Sectioner::new(),
            config: self.config.clone(),
        };

        info!(
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            output_root = %self.config.output_root.display(),
            "Job orchestrator ready"
        );

        JobOrchestrator {
            store: Arc::new(JobStore::new()),
            runner: JobRunner {
                pipeline: Arc::new(pipeline),
                semaphore,
                event_tx: event_tx.clone(),
            },
            dictionaries: self.dictionaries,
            event_tx,
            config: self.config,
        }
    }
}

/// Entry point for running analysis jobs.
pub struct JobOrchestrator {
    store: Arc<JobStore>,
    runner: JobRunner,
    dictionaries: Arc<DictionaryStore>,
    event_tx: broadcast::Sender<WorkerEvent>,
    config: WorkerConfig,
}

impl JobOrchestrator {
    pub fn builder(source: Arc<dyn DictionarySource>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(source)
    }

    /// Create from environment variables.
    ///
    /// Dictionaries come from `DICTIONARY_DIR`, entity recognition is enabled
    /// when `GLINER_BASE_URL` is set, and fetch jobs use Europe PMC.
    pub fn from_env() -> Self {
        let source: Arc<dyn DictionarySource> = Arc::new(DirectoryDictionarySource::from_env());
        let mut builder = OrchestratorBuilder::new(source)
            .with_config(WorkerConfig::from_env())
            .with_corpus_client(Arc::new(EuropePmcClient::from_env()));
        if let Some(gliner) = GlinerBackend::from_env() {
            builder = builder.with_recognizer(Arc::new(gliner));
        }
        builder.build()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Subscribe to job lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Validate and enqueue a job, returning its id immediately.
    ///
    /// Must be called within a tokio runtime. An invalid configuration is
    /// rejected before any job is registered.
    pub async fn submit(&self, config: JobConfig) -> Result<JobId> {
        config.validate()?;

        let job_id = Uuid::now_v7();
        let kind = config.kind;
        let job = self.store.insert(JobRecord::new(job_id, config)).await;

        info!(%job_id, job_kind = %kind, "Job queued");
        let _ = self.event_tx.send(WorkerEvent::JobQueued { job_id, kind });

        tokio::spawn(self.runner.clone().execute(job));
        Ok(job_id)
    }

    pub async fn status(&self, job_id: JobId) -> Result<JobStatusSnapshot> {
        let job = self.store.get(job_id).await?;
        Ok(job.read(|r| r.snapshot()).await)
    }

    /// Chronological job log.
    pub async fn logs(&self, job_id: JobId) -> Result<Vec<LogEntry>> {
        let job = self.store.get(job_id).await?;
        Ok(job.read(|r| r.logs().to_vec()).await)
    }

    /// Result of a completed job.
    ///
    /// Fails with [`Error::NotReady`] while the job is queued or running and
    /// with [`Error::JobFailed`] once it has failed.
    pub async fn result(&self, job_id: JobId) -> Result<Arc<AnalysisResult>> {
        let job = self.store.get(job_id).await?;
        job.read(|r| match (r.status(), r.result(), r.error()) {
            (JobStatus::Completed, Some(result), _) => Ok(result.clone()),
            (JobStatus::Failed, _, Some(error)) => Err(error.clone().into()),
            (status, _, _) => Err(Error::NotReady { job_id, status }),
        })
        .await
    }

    /// Stored location of one artifact of a completed job.
    pub async fn artifact(&self, job_id: JobId, filename: &str) -> Result<PathBuf> {
        let result = self.result(job_id).await?;
        result
            .output_files
            .get(filename)
            .cloned()
            .ok_or_else(|| Error::ArtifactNotFound(filename.to_string()))
    }

    /// Wait until the job completes or fails, returning its final snapshot.
    pub async fn wait(&self, job_id: JobId) -> Result<JobStatusSnapshot> {
        let job = self.store.get(job_id).await?;
        job.wait_terminal().await;
        debug!(%job_id, "Job reached terminal state");
        Ok(job.read(|r| r.snapshot()).await)
    }

    pub async fn job_count(&self) -> usize {
        self.store.len().await
    }

    pub async fn list_dictionaries(&self) -> Result<Vec<DictionaryInfo>> {
        self.dictionaries.list().await
    }

    /// Section codes accepted in [`JobConfig::sections`].
    pub fn section_codes(&self) -> &'static [SectionCode] {
        &SectionCode::ALL
    }

    /// Entity types accepted in [`JobConfig::entities`], `ALL` first.
    pub fn entity_types(&self) -> Vec<&'static str> {
        std::iter::once(ENTITY_TYPE_ALL)
            .chain(ENTITY_TYPES.iter().copied())
            .collect()
    }
}
