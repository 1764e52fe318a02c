//! Deterministic gazetteer recognizer for testing.
//!
//! Labels fixed phrases wherever they occur on token boundaries (ASCII
//! case-insensitive). Can be told to fail, to simulate an unreachable
//! recognition service.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docscope_inference::mock::MockRecognizer;
//!
//! let recognizer = MockRecognizer::new()
//!     .with_entity("NASA", "ORG")
//!     .with_entity("Alice Smith", "PERSON");
//! assert_eq!(recognizer.call_count(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use docscope_core::{EntityRecognizer, Error, RecognizedEntity, Result};

/// Mock entity recognizer.
#[derive(Clone, Default)]
pub struct MockRecognizer {
    gazetteer: Vec<(String, String)>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label every occurrence of `phrase` with `label`.
    pub fn with_entity(mut self, phrase: impl Into<String>, label: impl Into<String>) -> Self {
        let phrase: String = phrase.into();
        let label: String = label.into();
        let phrase = phrase.trim().to_ascii_lowercase();
        if !phrase.is_empty() {
            self.gazetteer
                .push((phrase, label.trim().to_ascii_uppercase()));
        }
        self
    }

    /// Fail every recognition call.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of `recognize` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[async_trait]
impl EntityRecognizer for MockRecognizer {
    async fn recognize(&self, text: &str, entity_types: &[String]) -> Result<Vec<RecognizedEntity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::RecognitionUnavailable(
                "mock recognizer configured to fail".to_string(),
            ));
        }

        // ASCII lower-casing keeps byte offsets aligned with `text`.
        let haystack = text.to_ascii_lowercase();
        let bytes = haystack.as_bytes();
        let mut found = Vec::new();

        for (phrase, label) in &self.gazetteer {
            if !entity_types.iter().any(|t| t.eq_ignore_ascii_case(label)) {
                continue;
            }
            for (start, _) in haystack.match_indices(phrase.as_str()) {
                let end = start + phrase.len();
                let before_ok = start == 0 || !is_word_byte(bytes[start - 1]);
                let after_ok = end == bytes.len() || !is_word_byte(bytes[end]);
                if before_ok && after_ok {
                    found.push(RecognizedEntity {
                        label: label.clone(),
                        start,
                        end,
                        text: text[start..end].to_string(),
                    });
                }
            }
        }

        found.sort_by_key(|e| (e.start, e.end));
        Ok(found)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn model_name(&self) -> &str {
        "mock-gazetteer"
    }
}
