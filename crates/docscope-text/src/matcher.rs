//! Dictionary term matching and entity aggregation.
//!
//! Matching is case-insensitive and runs on whitespace-collapsed text. A
//! match must sit on token boundaries wherever the term itself starts or ends
//! with a word character, so `r` does not match inside `for` while `c++` is
//! only checked at its leading edge. Occurrences of one term never overlap;
//! different terms are counted independently even when their spans overlap.

use std::sync::Arc;

use tracing::trace;

use docscope_core::{MatchKey, MatchResult, RecognizedEntity, Section, SectionCode};

use crate::{normalize_whitespace, TermSet};

/// Counts dictionary terms in document sections.
#[derive(Debug, Clone)]
pub struct Matcher {
    terms: Arc<TermSet>,
}

impl Matcher {
    pub fn new(terms: Arc<TermSet>) -> Self {
        Self { terms }
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Count every term in each selected section.
    pub fn match_sections(
        &self,
        sections: &[Section],
        selected: impl Fn(SectionCode) -> bool,
    ) -> MatchResult {
        let mut result = MatchResult::new();
        if self.terms.is_empty() {
            return result;
        }

        for section in sections.iter().filter(|s| selected(s.code)) {
            let haystack = normalize_whitespace(&section.text.to_lowercase());
            if haystack.is_empty() {
                continue;
            }
            for term in self.terms.iter() {
                let count = count_occurrences(&haystack, &term.needle);
                if count > 0 {
                    trace!(term = %term.term, section = %section.code, count, "Term matched");
                }
                result.record(
                    MatchKey::term(term.term.clone()),
                    term.category.as_deref(),
                    section.code,
                    count,
                );
            }
        }
        result
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Non-overlapping occurrences of `needle` in `haystack`.
///
/// Both are expected in matching form (lower-cased, whitespace collapsed).
pub fn count_occurrences(haystack: &str, needle: &str) -> u64 {
    let (first, last) = match (needle.chars().next(), needle.chars().last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 0,
    };
    let check_start = is_word_char(first);
    let check_end = is_word_char(last);

    let mut count = 0;
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(needle) {
        let start = from + offset;
        let end = start + needle.len();

        let start_ok = !check_start
            || haystack[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !is_word_char(c));
        let end_ok = !check_end
            || haystack[end..]
                .chars()
                .next()
                .map_or(true, |c| !is_word_char(c));

        if start_ok && end_ok {
            count += 1;
            from = end;
        } else {
            // Step one character past the rejected start.
            from = start
                + haystack[start..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
        }
        if from >= haystack.len() {
            break;
        }
    }
    count
}

/// Fold recognized entities of one section into `result`.
///
/// With `allowed` set, entities whose label is not listed (upper-case labels)
/// are dropped; `None` keeps every label the recognizer returns.
/// The key is (label upper-cased, text lower-cased); the category is the label.
pub fn merge_entities(
    result: &mut MatchResult,
    section: SectionCode,
    entities: &[RecognizedEntity],
    allowed: Option<&[String]>,
) {
    for entity in entities {
        let key = MatchKey::entity(&entity.label, &entity.text);
        let label = match &key {
            MatchKey::Entity { label, text } if !text.is_empty() => label.clone(),
            _ => continue,
        };
        if let Some(allowed) = allowed {
            if !allowed.iter().any(|a| a == &label) {
                continue;
            }
        }
        result.record(key, Some(&label), section, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscope_core::{Dictionary, DictionaryTerm};

    fn matcher(terms: &[&str]) -> Matcher {
        let dictionary = Arc::new(Dictionary {
            id: "test".into(),
            name: "Test".into(),
            terms: terms.iter().filter_map(DictionaryTerm::new).collect(),
        });
        Matcher::new(Arc::new(TermSet::from_dictionaries(&[dictionary])))
    }

    #[test]
    fn test_count_respects_word_boundaries() {
        assert_eq!(count_occurrences("we used r for analysis", "r"), 1);
        assert_eq!(count_occurrences("for reasons", "r"), 0);
        assert_eq!(count_occurrences("python, python; python.", "python"), 3);
        assert_eq!(count_occurrences("pythonic code", "python"), 0);
    }

    #[test]
    fn test_count_symbol_edges() {
        assert_eq!(count_occurrences("covid-19 is", "covid-19"), 1);
        assert_eq!(count_occurrences("covid-19covid-19", "covid-19"), 0);
        assert_eq!(count_occurrences("written in c++ and c", "c++"), 1);
    }

    #[test]
    fn test_symbol_trailing_edge_is_not_a_boundary() {
        // Only the leading `c` is checked, so a word character after `++` is allowed.
        assert_eq!(count_occurrences("the c++x dialect", "c++"), 1);
        assert_eq!(count_occurrences("objc++ sources", "c++"), 0);
        assert_eq!(count_occurrences("asp.net core", ".net"), 1);
        assert_eq!(count_occurrences("asp.netcore", ".net"), 0);
    }

    #[test]
    fn test_count_non_overlapping() {
        assert_eq!(count_occurrences("aa aa aa", "aa aa"), 1);
        assert_eq!(count_occurrences("", "x"), 0);
        assert_eq!(count_occurrences("x", ""), 0);
    }

    #[test]
    fn test_count_multibyte_text() {
        assert_eq!(count_occurrences("über café über", "über"), 2);
        assert_eq!(count_occurrences("naïve café", "café"), 1);
    }

    #[test]
    fn test_match_sections_case_insensitive_and_filtered() {
        let m = matcher(&["Python", "SPSS", "R"]);
        let sections = vec![
            Section::new(SectionCode::Methods, "We used Python and SPSS for analysis."),
            Section::new(SectionCode::Results, "PYTHON\n  again."),
        ];

        let all = m.match_sections(&sections, |_| true);
        assert_eq!(all.term_count("Python"), 2);
        assert_eq!(all.term_count("SPSS"), 1);
        assert_eq!(all.term_count("R"), 0);
        assert!(all.get(&MatchKey::term("R")).is_none());
        assert_eq!(all.total(), 3);

        let methods_only = m.match_sections(&sections, |c| c == SectionCode::Methods);
        assert_eq!(methods_only.term_count("Python"), 1);
        let entry = methods_only.get(&MatchKey::term("Python")).unwrap();
        assert_eq!(entry.category.as_deref(), Some("Test"));
        assert_eq!(entry.by_section.get(&SectionCode::Methods), Some(&1));
    }

    #[test]
    fn test_multiword_term_spans_line_breaks() {
        let m = matcher(&["random forest"]);
        let sections = vec![Section::whole_document("a Random\nForest model")];
        assert_eq!(m.match_sections(&sections, |_| true).term_count("random forest"), 1);
    }

    #[test]
    fn test_overlapping_terms_count_independently() {
        let m = matcher(&["random forest", "forest", "random"]);
        let sections = vec![Section::new(SectionCode::Methods, "A random forest was trained.")];

        let result = m.match_sections(&sections, |_| true);
        assert_eq!(result.term_count("random forest"), 1);
        assert_eq!(result.term_count("forest"), 1);
        assert_eq!(result.term_count("random"), 1);
        assert_eq!(result.total(), 3);
    }

    #[test]
    fn test_merge_entities_without_filter_keeps_every_label() {
        let mut result = MatchResult::new();
        let entities = vec![
            RecognizedEntity {
                label: "disease".into(),
                start: 0,
                end: 7,
                text: "Malaria".into(),
            },
            RecognizedEntity {
                label: "ORG".into(),
                start: 12,
                end: 15,
                text: "WHO".into(),
            },
        ];

        merge_entities(&mut result, SectionCode::Abstract, &entities, None);

        assert_eq!(result.get(&MatchKey::entity("DISEASE", "malaria")).unwrap().total(), 1);
        assert_eq!(result.get(&MatchKey::entity("ORG", "who")).unwrap().total(), 1);
    }

    #[test]
    fn test_merge_entities_normalizes_and_filters() {
        let mut result = MatchResult::new();
        let entities = vec![
            RecognizedEntity {
                label: "org".into(),
                start: 0,
                end: 3,
                text: "NASA".into(),
            },
            RecognizedEntity {
                label: "ORG".into(),
                start: 10,
                end: 13,
                text: "nasa ".into(),
            },
            RecognizedEntity {
                label: "PERSON".into(),
                start: 20,
                end: 25,
                text: "Alice".into(),
            },
        ];

        let allowed = ["ORG".to_string()];
        merge_entities(&mut result, SectionCode::Introduction, &entities, Some(&allowed[..]));

        let key = MatchKey::entity("ORG", "nasa");
        let entry = result.get(&key).unwrap();
        assert_eq!(entry.total(), 2);
        assert_eq!(entry.category.as_deref(), Some("ORG"));
        assert!(result.get(&MatchKey::entity("PERSON", "alice")).is_none());
        assert_eq!(result.entity_label_totals().get("ORG"), Some(&2));
    }
}
