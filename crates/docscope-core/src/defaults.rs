//! Centralized default constants for docscope.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// JOBS
// =============================================================================

/// Maximum number of jobs executing at once. `0` disables the cap.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Number of shards in the in-memory job store.
pub const JOB_STORE_SHARDS: usize = 16;

/// Root directory for job-scoped output directories.
pub const OUTPUT_ROOT: &str = "docscope-output";

// =============================================================================
// PROGRESS CHECKPOINTS
// =============================================================================

/// Progress when acquisition begins.
pub const PROGRESS_ACQUIRE_START: u8 = 10;

/// Progress once all documents are acquired.
pub const PROGRESS_ACQUIRE_DONE: u8 = 25;

/// Progress once every document is sectioned.
pub const PROGRESS_SECTIONED: u8 = 40;

/// Progress once matching has covered every document.
pub const PROGRESS_MATCHED: u8 = 70;

/// Progress when export begins.
pub const PROGRESS_EXPORT_START: u8 = 80;

/// Progress of a completed job. Never reported for any other status.
pub const PROGRESS_COMPLETE: u8 = 100;

// =============================================================================
// ACQUISITION
// =============================================================================

/// Timeout for a whole remote acquisition stage.
pub const ACQUIRE_TIMEOUT_SECS: u64 = 120;

/// Per-request HTTP timeout for corpus calls.
pub const CORPUS_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Europe PMC REST API base URL.
pub const EUROPE_PMC_BASE_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest";

/// Upper bound on hits for a single fetch request.
pub const FETCH_MAX_HITS: usize = 1000;

/// File extensions accepted as document input.
pub const ALLOWED_EXTENSIONS: &[&str] = &["xml", "html", "htm", "txt"];

/// File stem used for every acquired document inside its directory.
pub const FULLTEXT_STEM: &str = "fulltext";

/// Maximum filename length after sanitization.
pub const FILENAME_MAX_LENGTH: usize = 255;

// =============================================================================
// RECOGNITION
// =============================================================================

/// Entity types supported when the filter says `ALL`.
pub const ENTITY_TYPES: &[&str] = &["GPE", "LANGUAGE", "ORG", "PERSON"];

/// Filter value selecting every supported entity type.
pub const ENTITY_TYPE_ALL: &str = "ALL";

/// GLiNER request timeout.
pub const NER_TIMEOUT_SECS: u64 = 30;

/// Default GLiNER confidence threshold.
pub const NER_THRESHOLD: f32 = 0.5;

// =============================================================================
// DICTIONARIES
// =============================================================================

/// Default directory scanned for dictionary XML files.
pub const DICTIONARY_DIR: &str = "dictionary";

// =============================================================================
// EXPORT
// =============================================================================

/// Base name of every result artifact (`results.csv`, `results.json`, ...).
pub const RESULTS_STEM: &str = "results";

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

pub const ENV_JOB_MAX_CONCURRENT: &str = "JOB_MAX_CONCURRENT";
pub const ENV_ACQUIRE_TIMEOUT_SECS: &str = "ACQUIRE_TIMEOUT_SECS";
pub const ENV_OUTPUT_ROOT: &str = "DOCSCOPE_OUTPUT_ROOT";
pub const ENV_DICTIONARY_DIR: &str = "DICTIONARY_DIR";
pub const ENV_GLINER_BASE_URL: &str = "GLINER_BASE_URL";
pub const ENV_EUROPE_PMC_BASE_URL: &str = "EUROPE_PMC_BASE_URL";
