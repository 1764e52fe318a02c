//! The document processing pipeline: acquire, section, match, export.
//!
//! Stages run strictly in order. Each stage reports its entry and exit
//! checkpoints through the [`JobContext`]; an error ends the run with the
//! stage it happened in. Sectioning and term matching are CPU-bound and run
//! on the blocking pool, one document at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use docscope_core::defaults::{
    PROGRESS_ACQUIRE_DONE, PROGRESS_ACQUIRE_START, PROGRESS_EXPORT_START, PROGRESS_MATCHED,
    PROGRESS_SECTIONED,
};
use docscope_core::{
    extension_of, AnalysisResult, CorpusClient, Document, EntityRecognizer, Error, JobConfig,
    MatchResult, Result, Section, Stage,
};
use docscope_text::{merge_entities, ContentHint, DictionaryStore, Matcher, Sectioner};

use crate::acquire::Acquirer;
use crate::context::JobContext;
use crate::export::{self, ExportSummary};
use crate::worker::WorkerConfig;

/// An error together with the stage that raised it.
#[derive(Debug)]
pub(crate) struct StageFailure {
    pub(crate) stage: Stage,
    pub(crate) error: Error,
}

/// A document after sectioning.
struct SectionedInput {
    document: Document,
    sections: Vec<Section>,
}

/// Shared collaborators of every job run.
pub(crate) struct Pipeline {
    pub(crate) dictionaries: Arc<DictionaryStore>,
    pub(crate) recognizer: Option<Arc<dyn EntityRecognizer>>,
    pub(crate) corpus: Option<Arc<dyn CorpusClient>>,
    pub(crate) sectioner: Sectioner,
    pub(crate) config: WorkerConfig,
}

impl Pipeline {
    /// Directory holding everything a job writes.
    pub(crate) fn job_dir(&self, ctx: &JobContext) -> PathBuf {
        self.config.output_root.join(ctx.job_id().to_string())
    }

    pub(crate) async fn run(
        &self,
        ctx: &JobContext,
        config: &Arc<JobConfig>,
    ) -> std::result::Result<AnalysisResult, StageFailure> {
        let start = Instant::now();
        let job_dir = self.job_dir(ctx);
        let fail = |stage: Stage| {
            let job_id = ctx.job_id();
            move |error: Error| {
                error!(%job_id, stage = %stage, error = %error, "Stage failed");
                StageFailure { stage, error }
            }
        };

        // Acquisition
        let stage_start = Instant::now();
        ctx.enter_stage(Stage::Acquisition, PROGRESS_ACQUIRE_START).await;
        let documents = self
            .acquire(ctx, config, &job_dir)
            .await
            .map_err(fail(Stage::Acquisition))?;
        ctx.finish_stage(
            Stage::Acquisition,
            PROGRESS_ACQUIRE_DONE,
            format!("Acquired {} document(s)", documents.len()),
        )
        .await;
        log_stage(ctx, Stage::Acquisition, stage_start);

        // Sectioning
        let stage_start = Instant::now();
        ctx.enter_stage(Stage::Sectioning, PROGRESS_ACQUIRE_DONE).await;
        let (inputs, fallback_documents) = self
            .section_documents(ctx, documents)
            .await
            .map_err(fail(Stage::Sectioning))?;
        ctx.finish_stage(
            Stage::Sectioning,
            PROGRESS_SECTIONED,
            format!("Sectioned {} document(s)", inputs.len()),
        )
        .await;
        log_stage(ctx, Stage::Sectioning, stage_start);

        // Matching
        let stage_start = Instant::now();
        ctx.enter_stage(Stage::Matching, PROGRESS_SECTIONED).await;
        let files_processed = inputs.len();
        let data = self
            .match_documents(ctx, config, inputs)
            .await
            .map_err(fail(Stage::Matching))?;
        ctx.finish_stage(
            Stage::Matching,
            PROGRESS_MATCHED,
            format!("Found {} matches for {} distinct terms", data.total(), data.len()),
        )
        .await;
        log_stage(ctx, Stage::Matching, stage_start);

        // Export
        let stage_start = Instant::now();
        ctx.enter_stage(Stage::Export, PROGRESS_EXPORT_START).await;
        let result = AnalysisResult {
            files_processed,
            total_entities: data.total(),
            processing_time_ms: start.elapsed().as_millis() as u64,
            output_files: export::planned_files(&job_dir, config.output_format),
            data,
            fallback_documents,
        };
        export::write_results(
            &job_dir,
            &result,
            config.output_format,
            &ExportSummary::new(ctx.job_id()),
        )
        .await
        .map_err(fail(Stage::Export))?;
        let names: Vec<&str> = result.output_files.keys().map(String::as_str).collect();
        ctx.finish_stage(
            Stage::Export,
            PROGRESS_EXPORT_START,
            format!("Wrote {}", names.join(", ")),
        )
        .await;
        log_stage(ctx, Stage::Export, stage_start);

        Ok(result)
    }

    async fn acquire(
        &self,
        ctx: &JobContext,
        config: &JobConfig,
        job_dir: &Path,
    ) -> Result<Vec<Document>> {
        let acquirer = Acquirer::new(self.corpus.clone(), self.config.acquire_timeout);
        let documents = acquirer.acquire(ctx, config, job_dir).await?;
        if documents.is_empty() {
            return Err(Error::Fetch("no documents were acquired".to_string()));
        }
        Ok(documents)
    }

    async fn section_documents(
        &self,
        ctx: &JobContext,
        documents: Vec<Document>,
    ) -> Result<(Vec<SectionedInput>, Vec<String>)> {
        let mut inputs = Vec::with_capacity(documents.len());
        let mut fallbacks = Vec::new();

        for document in documents {
            let bytes = match tokio::fs::read(&document.path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(
                        job_id = %ctx.job_id(),
                        document_id = %document.id,
                        error = %e,
                        "Skipping unreadable document"
                    );
                    ctx.error(format!("Could not read {}: {}", document.id, e)).await;
                    continue;
                }
            };

            let hint = document
                .path
                .to_str()
                .and_then(extension_of)
                .map(|ext| ContentHint::from_extension(&ext))
                .unwrap_or(ContentHint::Unknown);
            let sectioner = self.sectioner;
            let sectioned = tokio::task::spawn_blocking(move || {
                let content = String::from_utf8_lossy(&bytes);
                sectioner.section(&content, hint)
            })
            .await
            .map_err(|e| Error::Internal(format!("Sectioning task failed: {}", e)))?;

            if let Some(reason) = &sectioned.fallback {
                warn!(
                    job_id = %ctx.job_id(),
                    document_id = %document.id,
                    error = %reason,
                    "Sectioning fell back to whole document"
                );
                ctx.info(format!(
                    "{}: structure could not be parsed, analysing whole document",
                    document.id
                ))
                .await;
                fallbacks.push(document.id.clone());
            }

            debug!(
                document_id = %document.id,
                section_count = sectioned.sections.len(),
                "Document sectioned"
            );
            inputs.push(SectionedInput {
                document,
                sections: sectioned.sections,
            });
        }
        Ok((inputs, fallbacks))
    }

    async fn match_documents(
        &self,
        ctx: &JobContext,
        config: &Arc<JobConfig>,
        inputs: Vec<SectionedInput>,
    ) -> Result<MatchResult> {
        let terms = self.dictionaries.resolve(&config.dictionaries).await?;
        let matcher = Matcher::new(Arc::new(terms));

        let entity_types = config.resolved_entity_types();
        let label_filter = (!config.wants_all_entities()).then_some(entity_types.as_slice());
        let recognizer = if entity_types.is_empty() {
            None
        } else {
            let recognizer = self.recognizer.clone().ok_or_else(|| {
                Error::RecognitionUnavailable("no entity recognizer is configured".to_string())
            })?;
            Some(recognizer)
        };

        debug!(
            job_id = %ctx.job_id(),
            term_count = matcher.term_count(),
            entity_types = ?entity_types,
            "Matching configured"
        );

        let total = inputs.len();
        let mut data = MatchResult::new();
        for (index, input) in inputs.into_iter().enumerate() {
            let matcher = matcher.clone();
            let filter = config.clone();
            let sections = input.sections;
            let (sections, mut result) = tokio::task::spawn_blocking(move || {
                let result = matcher.match_sections(&sections, |code| filter.section_selected(code));
                (sections, result)
            })
            .await
            .map_err(|e| Error::Internal(format!("Matching task failed: {}", e)))?;

            if let Some(recognizer) = &recognizer {
                for section in sections
                    .iter()
                    .filter(|s| config.section_selected(s.code) && !s.text.trim().is_empty())
                {
                    let entities = recognizer.recognize(&section.text, &entity_types).await?;
                    merge_entities(&mut result, section.code, &entities, label_filter);
                }
            }

            debug!(
                document_id = %input.document.id,
                match_count = result.total(),
                "Document matched"
            );
            data.merge(result);

            let span = (PROGRESS_MATCHED - PROGRESS_SECTIONED) as usize;
            let percent = PROGRESS_SECTIONED as usize + span * (index + 1) / total.max(1);
            ctx.report_progress(percent as u8, None).await;
        }
        Ok(data)
    }
}

fn log_stage(ctx: &JobContext, stage: Stage, started: Instant) {
    info!(
        job_id = %ctx.job_id(),
        stage = %stage,
        duration_ms = started.elapsed().as_millis() as u64,
        "Stage complete"
    );
}
