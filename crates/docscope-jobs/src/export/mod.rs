//! Result export.
//!
//! `results.csv` is always written; the configured format is written beside
//! it when it differs. All artifacts go to the job directory. The artifact
//! set is fixed before rendering so the JSON document can list it.

mod csv;
mod html;
mod json;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use docscope_core::{AnalysisResult, Error, JobId, OutputFormat, Result};

pub use self::csv::render_csv;
pub use self::html::render_html;
pub use self::json::render_json;

/// Job identity and render time, included in the JSON and HTML artifacts.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub job_id: JobId,
    pub generated_at: DateTime<Utc>,
}

impl ExportSummary {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            generated_at: Utc::now(),
        }
    }
}

/// Render one artifact.
pub fn render(
    format: OutputFormat,
    result: &AnalysisResult,
    summary: &ExportSummary,
) -> Result<String> {
    match format {
        OutputFormat::Csv => Ok(render_csv(&result.data)),
        OutputFormat::Json => render_json(result, summary),
        OutputFormat::Html => Ok(render_html(result, summary)),
    }
}

/// Formats written for a requested output format, CSV first.
pub fn formats_for(requested: OutputFormat) -> Vec<OutputFormat> {
    let mut formats = vec![OutputFormat::Csv];
    if requested != OutputFormat::Csv {
        formats.push(requested);
    }
    formats
}

/// Filename → path of every artifact `write_results` produces for `requested`.
pub fn planned_files(dir: &Path, requested: OutputFormat) -> BTreeMap<String, PathBuf> {
    formats_for(requested)
        .into_iter()
        .map(|format| {
            let filename = format.filename();
            let path = dir.join(&filename);
            (filename, path)
        })
        .collect()
}

/// Write every artifact for a job into `dir`, returning filename → path.
pub async fn write_results(
    dir: &Path,
    result: &AnalysisResult,
    requested: OutputFormat,
    summary: &ExportSummary,
) -> Result<BTreeMap<String, PathBuf>> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        Error::Export(format!("failed to create {}: {}", dir.display(), e))
    })?;

    let mut written = BTreeMap::new();
    for format in formats_for(requested) {
        let content = render(format, result, summary)?;
        let filename = format.filename();
        let path = dir.join(&filename);
        tokio::fs::write(&path, content.as_bytes())
            .await
            .map_err(|e| Error::Export(format!("failed to write {}: {}", path.display(), e)))?;
        debug!(file = %path.display(), bytes = content.len(), "Artifact written");
        written.insert(filename, path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscope_core::{MatchKey, MatchResult, SectionCode};
    use uuid::Uuid;

    fn result(dir: &Path, requested: OutputFormat) -> AnalysisResult {
        let mut data = MatchResult::new();
        data.record(MatchKey::term("python"), Some("software"), SectionCode::Methods, 2);
        data.record(MatchKey::term("spss"), Some("software"), SectionCode::Methods, 1);
        AnalysisResult {
            files_processed: 1,
            total_entities: data.total(),
            processing_time_ms: 5,
            output_files: planned_files(dir, requested),
            data,
            fallback_documents: Vec::new(),
        }
    }

    #[test]
    fn test_formats_always_include_csv() {
        assert_eq!(formats_for(OutputFormat::Csv), vec![OutputFormat::Csv]);
        assert_eq!(
            formats_for(OutputFormat::Html),
            vec![OutputFormat::Csv, OutputFormat::Html]
        );
    }

    #[tokio::test]
    async fn test_write_results_matches_planned_files() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("job");
        let result = result(&dir, OutputFormat::Json);
        let summary = ExportSummary::new(Uuid::now_v7());
        let files = write_results(&dir, &result, OutputFormat::Json, &summary)
            .await
            .unwrap();

        assert_eq!(files, result.output_files);
        assert_eq!(
            files.keys().cloned().collect::<Vec<_>>(),
            vec!["results.csv".to_string(), "results.json".to_string()]
        );
        let csv = tokio::fs::read_to_string(&files["results.csv"]).await.unwrap();
        assert!(csv.starts_with("term,category,section,count"));
    }

    #[tokio::test]
    async fn test_write_failure_is_export_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("blocked");
        tokio::fs::write(&blocker, "not a directory").await.unwrap();

        let dir = blocker.join("job");
        let err = write_results(
            &dir,
            &result(&dir, OutputFormat::Csv),
            OutputFormat::Csv,
            &ExportSummary::new(Uuid::now_v7()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Export(_)));
    }
}
