//! Error types for docscope.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{JobStatus, Stage};

/// Result type alias using docscope's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docscope operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Submission rejected before a job was created
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unknown job identifier
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    /// Result requested before the job completed
    #[error("Job {job_id} is not ready (status: {status})")]
    NotReady { job_id: Uuid, status: JobStatus },

    /// Document acquisition failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Document structure could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Entity recognition capability missing or failing
    #[error("Recognition unavailable: {0}")]
    RecognitionUnavailable(String),

    /// Dictionary id unknown to the dictionary source
    #[error("Dictionary not found: {0}")]
    DictionaryNotFound(String),

    /// Writing an output artifact failed
    #[error("Export error: {0}")]
    Export(String),

    /// Terminal job failure with the stage that raised it
    #[error("Job failed during {stage}: {message}")]
    JobFailed { stage: Stage, message: String },

    /// Artifact name not declared by a completed job
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error may be absorbed by the pipeline instead of failing a job.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
