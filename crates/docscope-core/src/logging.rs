//! Structured logging schema, field name constants, and subscriber setup.
//!
//! All crates use these constants for structured `tracing` fields so log
//! aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Job failed, or a collaborator is unusable |
//! | WARN  | Recoverable issue, automatic fallback applied (e.g. sectioning) |
//! | INFO  | Job lifecycle and stage completions |
//! | DEBUG | Decision points, cache hits, config choices |
//! | TRACE | Per-section / per-term iteration |

use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{Error, Result};

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "jobs", "text", "inference", "export"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "orchestrator", "sectioner", "matcher", "gliner", "europe_pmc"
pub const COMPONENT: &str = "component";

/// Job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Job kind (`upload`, `fetch`, `existing-project`).
pub const JOB_KIND: &str = "job_kind";

/// Pipeline stage name.
pub const STAGE: &str = "stage";

/// Document identifier within a job.
pub const DOCUMENT_ID: &str = "document_id";

/// Dictionary identifier.
pub const DICTIONARY_ID: &str = "dictionary_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of documents handled by a stage.
pub const DOCUMENT_COUNT: &str = "document_count";

/// Number of sections produced or scanned.
pub const SECTION_COUNT: &str = "section_count";

/// Number of dictionary terms loaded.
pub const TERM_COUNT: &str = "term_count";

/// Total matched occurrences.
pub const MATCH_COUNT: &str = "match_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Default filter directive when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "docscope=info,docscope_jobs=info,docscope_text=info";

/// Install the global tracing subscriber.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `RUST_LOG` | [`DEFAULT_FILTER`] | standard env filter |
/// | `LOG_FORMAT` | `text` | `json` or `text` |
/// | `LOG_FILE` | unset | path of a daily-rotated log file |
/// | `LOG_ANSI` | auto | force ANSI colors on/off for console output |
///
/// The returned guard must be held for the process lifetime when file logging
/// is enabled, otherwise buffered lines are dropped.
pub fn init_tracing() -> Result<Option<WorkerGuard>> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let init_err = |e: tracing_subscriber::util::TryInitError| {
        Error::Internal(format!("Failed to install tracing subscriber: {}", e))
    };

    if let Some(ref path) = log_file {
        let path = Path::new(path);
        let file_dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("docscope.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .try_init()
                .map_err(init_err)?;
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).try_init().map_err(init_err)?;
        }
        announce(&log_format, Some(path));
        return Ok(Some(guard));
    }

    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(init_err)?;
    } else {
        let mut layer = tracing_subscriber::fmt::layer();
        if let Some(ansi) = log_ansi {
            layer = layer.with_ansi(ansi);
        }
        registry.with(layer).try_init().map_err(init_err)?;
    }
    announce(&log_format, None);
    Ok(None)
}

fn announce(log_format: &str, log_file: Option<&Path>) {
    match log_file {
        Some(path) => info!(
            subsystem = "core",
            log_format,
            log_file = %path.display(),
            "Tracing initialised"
        ),
        None => info!(subsystem = "core", log_format, "Tracing initialised"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error_instead_of_panicking() {
        let first = init_tracing();
        let second = init_tracing();
        // Whichever call lost the race to install the global subscriber errors.
        assert!(first.is_err() || second.is_err());
        if let Err(e) = second {
            assert!(e.to_string().contains("tracing subscriber"));
        }
    }

    /// Shared buffer the fmt layer writes into.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_announce_reports_format_and_file() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            announce("json", Some(Path::new("/var/log/docscope.log")));
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Tracing initialised"));
        assert!(output.contains("log_file=/var/log/docscope.log"));
        assert!(output.contains("json"));
    }

    #[test]
    fn test_field_names_are_snake_case() {
        for field in [JOB_ID, JOB_KIND, STAGE, DOCUMENT_ID, DURATION_MS, MATCH_COUNT] {
            assert!(field.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
