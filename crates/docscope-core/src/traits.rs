//! Collaborator interfaces consumed by the pipeline.
//!
//! Each trait is a narrow seam: the pipeline only depends on these, so tests
//! can inject deterministic implementations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::models::{DictionaryInfo, DictionaryTerm, FetchedRecord, RecognizedEntity};
use crate::Result;

/// Remote corpus acquisition.
#[async_trait]
pub trait CorpusClient: Send + Sync {
    /// Download up to `limit` records matching `query` into `dest`.
    ///
    /// Errors are reported as [`crate::Error::Fetch`].
    async fn fetch(&self, query: &str, limit: usize, dest: &Path) -> Result<Vec<FetchedRecord>>;

    /// Download a single record by external id into `dest`, returning its path.
    async fn fetch_by_id(&self, external_id: &str, dest: &Path) -> Result<PathBuf>;

    /// Client name for logs.
    fn name(&self) -> &str;
}

/// Named-entity recognition capability.
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    /// Recognize entities of the given types in `text`.
    ///
    /// Errors are reported as [`crate::Error::RecognitionUnavailable`].
    async fn recognize(&self, text: &str, entity_types: &[String])
        -> Result<Vec<RecognizedEntity>>;

    /// Check if the recognizer is reachable.
    async fn health_check(&self) -> Result<bool>;

    /// Model name used for recognition.
    fn model_name(&self) -> &str;
}

/// Source of curated term lists.
#[async_trait]
pub trait DictionarySource: Send + Sync {
    async fn list_dictionaries(&self) -> Result<Vec<DictionaryInfo>>;

    /// Load raw terms for `id`. Duplicates may be present; the store merges them.
    ///
    /// Unknown ids are reported as [`crate::Error::DictionaryNotFound`].
    async fn load_dictionary(&self, id: &str) -> Result<(DictionaryInfo, Vec<DictionaryTerm>)>;
}
