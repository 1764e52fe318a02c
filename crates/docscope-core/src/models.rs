//! Core data models for docscope.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};
use crate::file_safety::has_allowed_extension;

/// Opaque job identifier (UUIDv7, time-ordered).
pub type JobId = Uuid;

// =============================================================================
// JOB TYPES
// =============================================================================

/// Where a job's documents come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Files uploaded by the caller.
    Upload,
    /// Records downloaded from the remote corpus.
    Fetch,
    /// Documents already present in a project directory.
    ExistingProject,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Upload => "upload",
            JobKind::Fetch => "fetch",
            JobKind::ExistingProject => "existing-project",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a job.
///
/// Transitions only move forward: `Queued → Running → {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Acquisition,
    Sectioning,
    Matching,
    Export,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquisition => "acquisition",
            Stage::Sectioning => "sectioning",
            Stage::Matching => "matching",
            Stage::Export => "export",
        }
    }

    /// Human-readable step label shown while the stage runs.
    pub fn step_label(&self) -> &'static str {
        match self {
            Stage::Acquisition => "Acquiring documents...",
            Stage::Sectioning => "Splitting documents into sections...",
            Stage::Matching => "Matching terms and entities...",
            Stage::Export => "Writing results...",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a job log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

/// One entry of a job's append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }
}

/// Requested output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
        }
    }

    /// Artifact filename for this format, e.g. `results.json`.
    pub fn filename(&self) -> String {
        format!("{}.{}", defaults::RESULTS_STEM, self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "html" => Ok(OutputFormat::Html),
            other => Err(Error::InvalidConfig(format!(
                "unsupported output format: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// JOB CONFIGURATION
// =============================================================================

/// Remote corpus query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSpec {
    pub query: String,
    /// Maximum number of records to download.
    pub limit: usize,
}

/// A file the caller already uploaded to local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub original_name: String,
    pub path: PathBuf,
}

/// Configuration of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub kind: JobKind,
    #[serde(default)]
    pub fetch: Option<FetchSpec>,
    #[serde(default)]
    pub uploads: Vec<UploadedFile>,
    #[serde(default)]
    pub project_path: Option<PathBuf>,
    /// Dictionary ids, in priority order.
    #[serde(default)]
    pub dictionaries: Vec<String>,
    /// Sections to match. Empty means every section.
    #[serde(default)]
    pub sections: Vec<SectionCode>,
    /// Entity types to recognize. Empty disables recognition.
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl JobConfig {
    fn with_kind(kind: JobKind) -> Self {
        Self {
            kind,
            fetch: None,
            uploads: Vec::new(),
            project_path: None,
            dictionaries: Vec::new(),
            sections: Vec::new(),
            entities: Vec::new(),
            output_format: OutputFormat::default(),
        }
    }

    /// Job downloading up to `limit` records matching `query`.
    pub fn fetch(query: impl Into<String>, limit: usize) -> Self {
        let mut config = Self::with_kind(JobKind::Fetch);
        config.fetch = Some(FetchSpec {
            query: query.into(),
            limit,
        });
        config
    }

    /// Job over already-uploaded files.
    pub fn upload(files: Vec<UploadedFile>) -> Self {
        let mut config = Self::with_kind(JobKind::Upload);
        config.uploads = files;
        config
    }

    /// Job over an existing project directory.
    pub fn existing_project(path: impl Into<PathBuf>) -> Self {
        let mut config = Self::with_kind(JobKind::ExistingProject);
        config.project_path = Some(path.into());
        config
    }

    pub fn with_dictionary(mut self, id: impl Into<String>) -> Self {
        self.dictionaries.push(id.into());
        self
    }

    pub fn with_sections(mut self, sections: impl IntoIterator<Item = SectionCode>) -> Self {
        self.sections.extend(sections);
        self
    }

    pub fn with_entities<S: Into<String>>(mut self, entities: impl IntoIterator<Item = S>) -> Self {
        self.entities.extend(entities.into_iter().map(Into::into));
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Check that the configuration names an input source for its kind and at
    /// least one analysis target.
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            JobKind::Fetch => {
                let spec = self.fetch.as_ref().ok_or_else(|| {
                    Error::InvalidConfig("fetch job requires a query".to_string())
                })?;
                if spec.query.trim().is_empty() {
                    return Err(Error::InvalidConfig("fetch query is empty".to_string()));
                }
                if spec.limit == 0 || spec.limit > defaults::FETCH_MAX_HITS {
                    return Err(Error::InvalidConfig(format!(
                        "fetch limit must be between 1 and {}",
                        defaults::FETCH_MAX_HITS
                    )));
                }
            }
            JobKind::Upload => {
                if self.uploads.is_empty() {
                    return Err(Error::InvalidConfig(
                        "upload job requires at least one file".to_string(),
                    ));
                }
                if let Some(bad) = self
                    .uploads
                    .iter()
                    .find(|f| !has_allowed_extension(&f.original_name))
                {
                    return Err(Error::InvalidConfig(format!(
                        "unsupported file type: {}",
                        bad.original_name
                    )));
                }
            }
            JobKind::ExistingProject => {
                let missing = self
                    .project_path
                    .as_ref()
                    .map(|p| p.as_os_str().is_empty())
                    .unwrap_or(true);
                if missing {
                    return Err(Error::InvalidConfig(
                        "existing-project job requires a project path".to_string(),
                    ));
                }
            }
        }

        if self.dictionaries.iter().all(|d| d.trim().is_empty()) && !self.wants_entities() {
            return Err(Error::InvalidConfig(
                "at least one dictionary or entity type is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn wants_entities(&self) -> bool {
        self.entities.iter().any(|e| !e.trim().is_empty())
    }

    /// Whether the entity filter includes `ALL`.
    pub fn wants_all_entities(&self) -> bool {
        self.entities
            .iter()
            .any(|e| e.trim().eq_ignore_ascii_case(defaults::ENTITY_TYPE_ALL))
    }

    /// Entity types to request from the recognizer: upper-cased, sorted, `ALL` expanded.
    pub fn resolved_entity_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .entities
            .iter()
            .map(|e| e.trim().to_ascii_uppercase())
            .filter(|e| !e.is_empty())
            .collect();
        if self.wants_all_entities() {
            types = defaults::ENTITY_TYPES.iter().map(|s| s.to_string()).collect();
        }
        types.sort();
        types.dedup();
        types
    }

    /// Whether a section participates in matching under this configuration.
    pub fn section_selected(&self, code: SectionCode) -> bool {
        self.sections.is_empty()
            || self.sections.contains(&SectionCode::WholeDocument)
            || self.sections.contains(&code)
    }
}

// =============================================================================
// DOCUMENTS & SECTIONS
// =============================================================================

/// Semantic section codes produced by the sectioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionCode {
    #[serde(rename = "TIL", alias = "title")]
    Title,
    #[serde(rename = "ABS", alias = "abstract")]
    Abstract,
    #[serde(rename = "INT", alias = "introduction")]
    Introduction,
    #[serde(rename = "MET", alias = "methods")]
    Methods,
    #[serde(rename = "RES", alias = "results")]
    Results,
    #[serde(rename = "DIS", alias = "discussion")]
    Discussion,
    #[serde(rename = "CON", alias = "conclusion")]
    Conclusion,
    #[serde(rename = "ETH", alias = "ethics")]
    Ethics,
    #[serde(rename = "ACK", alias = "acknowledgments")]
    Acknowledgments,
    #[serde(rename = "AFF", alias = "affiliations")]
    Affiliations,
    #[serde(rename = "AUT", alias = "authors")]
    Authors,
    #[serde(rename = "KEY", alias = "keywords")]
    Keywords,
    #[serde(rename = "FIG", alias = "figures")]
    Figures,
    #[serde(rename = "TAB", alias = "tables")]
    Tables,
    #[serde(rename = "ALL", alias = "whole_document")]
    WholeDocument,
}

impl SectionCode {
    pub const ALL: [SectionCode; 15] = [
        SectionCode::Title,
        SectionCode::Abstract,
        SectionCode::Introduction,
        SectionCode::Methods,
        SectionCode::Results,
        SectionCode::Discussion,
        SectionCode::Conclusion,
        SectionCode::Ethics,
        SectionCode::Acknowledgments,
        SectionCode::Affiliations,
        SectionCode::Authors,
        SectionCode::Keywords,
        SectionCode::Figures,
        SectionCode::Tables,
        SectionCode::WholeDocument,
    ];

    /// Three-letter code used in filters and exports.
    pub fn code(&self) -> &'static str {
        match self {
            SectionCode::Title => "TIL",
            SectionCode::Abstract => "ABS",
            SectionCode::Introduction => "INT",
            SectionCode::Methods => "MET",
            SectionCode::Results => "RES",
            SectionCode::Discussion => "DIS",
            SectionCode::Conclusion => "CON",
            SectionCode::Ethics => "ETH",
            SectionCode::Acknowledgments => "ACK",
            SectionCode::Affiliations => "AFF",
            SectionCode::Authors => "AUT",
            SectionCode::Keywords => "KEY",
            SectionCode::Figures => "FIG",
            SectionCode::Tables => "TAB",
            SectionCode::WholeDocument => "ALL",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SectionCode::Title => "title",
            SectionCode::Abstract => "abstract",
            SectionCode::Introduction => "introduction",
            SectionCode::Methods => "methods",
            SectionCode::Results => "results",
            SectionCode::Discussion => "discussion",
            SectionCode::Conclusion => "conclusion",
            SectionCode::Ethics => "ethics",
            SectionCode::Acknowledgments => "acknowledgments",
            SectionCode::Affiliations => "affiliations",
            SectionCode::Authors => "authors",
            SectionCode::Keywords => "keywords",
            SectionCode::Figures => "figures",
            SectionCode::Tables => "tables",
            SectionCode::WholeDocument => "whole_document",
        }
    }
}

impl fmt::Display for SectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SectionCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        SectionCode::ALL
            .iter()
            .copied()
            .find(|c| c.code().eq_ignore_ascii_case(needle) || c.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| Error::InvalidConfig(format!("unknown section code: {}", needle)))
    }
}

/// A typed span of document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub code: SectionCode,
    pub text: String,
}

impl Section {
    pub fn new(code: SectionCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    pub fn whole_document(text: impl Into<String>) -> Self {
        Self::new(SectionCode::WholeDocument, text)
    }
}

/// How a document entered the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentOrigin {
    Fetched { external_id: String },
    Uploaded { original_name: String },
    Existing,
}

/// An acquired unit of input, owned by one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: Option<String>,
    pub path: PathBuf,
    pub origin: DocumentOrigin,
}

/// A record downloaded by a corpus client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedRecord {
    pub external_id: String,
    pub title: Option<String>,
    pub stored_path: PathBuf,
}

// =============================================================================
// DICTIONARIES & ENTITIES
// =============================================================================

/// One entry of a curated term list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryTerm {
    pub term: String,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl DictionaryTerm {
    /// Create a term. Returns `None` when the text is blank.
    pub fn new(term: impl AsRef<str>) -> Option<Self> {
        let term = term.as_ref().trim();
        if term.is_empty() {
            return None;
        }
        Some(Self {
            term: term.to_string(),
            category: None,
            description: None,
        })
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Case-folded form used for identity and matching.
    pub fn normalized(&self) -> String {
        self.term.to_lowercase()
    }
}

/// Listing entry of a dictionary source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryInfo {
    pub id: String,
    pub name: String,
    pub entries: usize,
}

/// A loaded dictionary with unique term text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    pub id: String,
    pub name: String,
    pub terms: Vec<DictionaryTerm>,
}

/// Entity span returned by a recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedEntity {
    pub label: String,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

// =============================================================================
// MATCH RESULTS
// =============================================================================

/// Aggregation key: a dictionary term or a recognized entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MatchKey {
    Term { term: String },
    Entity { label: String, text: String },
}

impl MatchKey {
    pub fn term(term: impl Into<String>) -> Self {
        MatchKey::Term { term: term.into() }
    }

    pub fn entity(label: impl AsRef<str>, text: impl AsRef<str>) -> Self {
        MatchKey::Entity {
            label: label.as_ref().trim().to_ascii_uppercase(),
            text: text.as_ref().trim().to_lowercase(),
        }
    }

    /// Text shown in the `term` column of exports.
    pub fn display_text(&self) -> &str {
        match self {
            MatchKey::Term { term } => term,
            MatchKey::Entity { text, .. } => text,
        }
    }
}

/// Counts for one key, by section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEntry {
    pub category: Option<String>,
    pub by_section: BTreeMap<SectionCode, u64>,
}

impl MatchEntry {
    pub fn total(&self) -> u64 {
        self.by_section.values().sum()
    }
}

/// Aggregated occurrence counts. Iteration order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchResult {
    #[serde(with = "match_entries")]
    entries: BTreeMap<MatchKey, MatchEntry>,
}

impl MatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` occurrences of `key` in `section`. Zero counts are ignored.
    pub fn record(
        &mut self,
        key: MatchKey,
        category: Option<&str>,
        section: SectionCode,
        count: u64,
    ) {
        if count == 0 {
            return;
        }
        let entry = self.entries.entry(key).or_default();
        if entry.category.is_none() {
            entry.category = category.map(str::to_string);
        }
        *entry.by_section.entry(section).or_insert(0) += count;
    }

    /// Fold another aggregation into this one.
    pub fn merge(&mut self, other: MatchResult) {
        for (key, entry) in other.entries {
            for (section, count) in entry.by_section {
                self.record(key.clone(), entry.category.as_deref(), section, count);
            }
        }
    }

    pub fn get(&self, key: &MatchKey) -> Option<&MatchEntry> {
        self.entries.get(key)
    }

    /// Total count for a dictionary term (exact stored text).
    pub fn term_count(&self, term: &str) -> u64 {
        self.get(&MatchKey::term(term))
            .map(MatchEntry::total)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MatchKey, &MatchEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every per-section count.
    pub fn total(&self) -> u64 {
        self.entries.values().map(MatchEntry::total).sum()
    }

    /// Entity occurrences summed per label.
    pub fn entity_label_totals(&self) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::new();
        for (key, entry) in &self.entries {
            if let MatchKey::Entity { label, .. } = key {
                *totals.entry(label.clone()).or_insert(0) += entry.total();
            }
        }
        totals
    }
}

/// JSON maps need string keys, so entries serialize as an ordered list.
mod match_entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{MatchEntry, MatchKey, SectionCode};

    #[derive(Serialize)]
    struct Row<'a> {
        key: &'a MatchKey,
        category: &'a Option<String>,
        total: u64,
        by_section: &'a BTreeMap<SectionCode, u64>,
    }

    #[derive(Deserialize)]
    struct OwnedRow {
        key: MatchKey,
        category: Option<String>,
        by_section: BTreeMap<SectionCode, u64>,
    }

    pub fn serialize<S: Serializer>(
        entries: &BTreeMap<MatchKey, MatchEntry>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(entries.iter().map(|(key, entry)| Row {
            key,
            category: &entry.category,
            total: entry.total(),
            by_section: &entry.by_section,
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<MatchKey, MatchEntry>, D::Error> {
        let rows = Vec::<OwnedRow>::deserialize(deserializer)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.key,
                    MatchEntry {
                        category: row.category,
                        by_section: row.by_section,
                    },
                )
            })
            .collect())
    }
}

// =============================================================================
// RESULTS & STATUS
// =============================================================================

/// Final output of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub files_processed: usize,
    pub total_entities: u64,
    pub processing_time_ms: u64,
    /// Artifact filename → stored location.
    pub output_files: BTreeMap<String, PathBuf>,
    pub data: MatchResult,
    /// Documents whose markup could not be parsed and were matched whole.
    #[serde(default)]
    pub fallback_documents: Vec<String>,
}

/// Failure captured on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub stage: Stage,
    pub message: String,
    /// Last stage that finished successfully before the failure.
    pub last_stage: Option<Stage>,
}

impl JobError {
    /// One-line message for status displays.
    pub fn summary(&self) -> String {
        format!("{} failed: {}", self.stage, self.message)
    }
}

impl From<JobError> for Error {
    fn from(e: JobError) -> Self {
        Error::JobFailed {
            stage: e.stage,
            message: e.message,
        }
    }
}

/// Consistent point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusSnapshot {
    pub job_id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress: u8,
    pub current_step: String,
    pub error_summary: Option<String>,
    pub last_stage: Option<Stage>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> UploadedFile {
        UploadedFile {
            original_name: name.to_string(),
            path: PathBuf::from(format!("/tmp/{}", name)),
        }
    }

    #[test]
    fn test_status_transitions_are_forward_only() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn test_validate_rejects_missing_input_source() {
        let mut config = JobConfig::upload(vec![]).with_dictionary("software");
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config = JobConfig::existing_project("").with_dictionary("software");
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config = JobConfig::fetch("  ", 10).with_dictionary("software");
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_missing_analysis_target() {
        let config = JobConfig::upload(vec![upload("paper.xml")]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dictionary or entity"));
    }

    #[test]
    fn test_validate_accepts_entities_without_dictionary() {
        let config = JobConfig::upload(vec![upload("paper.xml")]).with_entities(["ORG"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_fetch_limit_and_extension() {
        let config = JobConfig::fetch("covid", 0).with_dictionary("d");
        assert!(config.validate().is_err());

        let config = JobConfig::upload(vec![upload("scan.pdf")]).with_dictionary("d");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scan.pdf"));
    }

    #[test]
    fn test_resolved_entity_types_expands_all() {
        let config = JobConfig::upload(vec![upload("a.txt")]).with_entities(["all"]);
        assert_eq!(
            config.resolved_entity_types(),
            vec!["GPE", "LANGUAGE", "ORG", "PERSON"]
        );

        let config = JobConfig::upload(vec![upload("a.txt")]).with_entities(["person", "ORG", "org"]);
        assert_eq!(config.resolved_entity_types(), vec!["ORG", "PERSON"]);
    }

    #[test]
    fn test_section_selected() {
        let all = JobConfig::upload(vec![upload("a.txt")]);
        assert!(all.section_selected(SectionCode::Tables));

        let filtered = all
            .clone()
            .with_sections([SectionCode::Methods, SectionCode::Results]);
        assert!(filtered.section_selected(SectionCode::Methods));
        assert!(!filtered.section_selected(SectionCode::Abstract));
        assert!(!filtered.section_selected(SectionCode::WholeDocument));
    }

    #[test]
    fn test_section_code_parsing() {
        assert_eq!("MET".parse::<SectionCode>().unwrap(), SectionCode::Methods);
        assert_eq!("methods".parse::<SectionCode>().unwrap(), SectionCode::Methods);
        assert_eq!("all".parse::<SectionCode>().unwrap(), SectionCode::WholeDocument);
        assert!("XYZ".parse::<SectionCode>().is_err());
    }

    #[test]
    fn test_section_code_serde_uses_codes() {
        let json = serde_json::to_string(&SectionCode::Acknowledgments).unwrap();
        assert_eq!(json, "\"ACK\"");
        let parsed: SectionCode = serde_json::from_str("\"methods\"").unwrap();
        assert_eq!(parsed, SectionCode::Methods);
    }

    #[test]
    fn test_job_config_deserializes_with_defaults() {
        let config: JobConfig = serde_json::from_value(serde_json::json!({
            "kind": "existing-project",
            "project_path": "/data/project",
            "dictionaries": ["software"],
            "sections": ["MET", "RES"]
        }))
        .unwrap();
        assert_eq!(config.kind, JobKind::ExistingProject);
        assert_eq!(config.output_format, OutputFormat::Csv);
        assert_eq!(config.sections, vec![SectionCode::Methods, SectionCode::Results]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_match_result_totals_equal_section_sums() {
        let mut result = MatchResult::new();
        result.record(MatchKey::term("python"), Some("software"), SectionCode::Methods, 2);
        result.record(MatchKey::term("python"), None, SectionCode::Results, 1);
        result.record(MatchKey::entity("org", "WHO"), None, SectionCode::Abstract, 3);
        result.record(MatchKey::term("spss"), None, SectionCode::Methods, 0);

        assert_eq!(result.len(), 2);
        assert_eq!(result.term_count("python"), 3);
        assert_eq!(result.total(), 6);
        let per_section: u64 = result
            .iter()
            .flat_map(|(_, e)| e.by_section.values())
            .sum();
        assert_eq!(per_section, result.total());
        assert_eq!(result.entity_label_totals().get("ORG"), Some(&3));
        assert_eq!(
            result.get(&MatchKey::term("python")).unwrap().category.as_deref(),
            Some("software")
        );
    }

    #[test]
    fn test_match_result_merge() {
        let mut a = MatchResult::new();
        a.record(MatchKey::term("r"), None, SectionCode::Methods, 1);
        let mut b = MatchResult::new();
        b.record(MatchKey::term("r"), Some("software"), SectionCode::Methods, 2);
        b.record(MatchKey::term("sas"), None, SectionCode::Results, 1);
        a.merge(b);
        assert_eq!(a.term_count("r"), 3);
        assert_eq!(a.term_count("sas"), 1);
    }

    #[test]
    fn test_match_result_json_uses_ordered_rows() {
        let mut result = MatchResult::new();
        result.record(MatchKey::term("spss"), None, SectionCode::Methods, 1);
        result.record(MatchKey::term("python"), None, SectionCode::Methods, 1);
        let json = serde_json::to_value(&result).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows[0]["key"]["term"], "python");
        assert_eq!(rows[1]["key"]["term"], "spss");
        assert_eq!(rows[0]["by_section"]["MET"], 1);

        let back: MatchResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_dictionary_term_rejects_blank() {
        assert!(DictionaryTerm::new("   ").is_none());
        let term = DictionaryTerm::new(" SPSS ").unwrap();
        assert_eq!(term.term, "SPSS");
        assert_eq!(term.normalized(), "spss");
    }

    #[test]
    fn test_job_error_summary() {
        let err = JobError {
            stage: Stage::Acquisition,
            message: "timed out".to_string(),
            last_stage: None,
        };
        assert_eq!(err.summary(), "acquisition failed: timed out");
        let core: Error = err.into();
        assert!(matches!(core, Error::JobFailed { stage: Stage::Acquisition, .. }));
    }
}
