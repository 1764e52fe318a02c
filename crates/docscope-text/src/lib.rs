//! # docscope-text
//!
//! Text processing for docscope:
//! - Dictionary store with per-id load-once caching
//! - Dictionary sources (AMI-style XML directory, in-memory)
//! - Sectioner splitting structured documents into typed sections
//! - Matcher counting dictionary terms and merging recognized entities

pub mod dictionary;
pub mod dictionary_source;
pub mod matcher;
pub mod sectioner;

pub use dictionary::{merge_duplicate_terms, DictionaryStore, ResolvedTerm, TermSet};
pub use dictionary_source::{DirectoryDictionarySource, InMemoryDictionarySource};
pub use matcher::{count_occurrences, merge_entities, Matcher};
pub use sectioner::{ContentHint, SectionedDocument, Sectioner};

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  c "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }
}
