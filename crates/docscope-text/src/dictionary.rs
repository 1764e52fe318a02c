//! Dictionary store: loads term lists once per id and shares them read-only.
//!
//! Term text is unique within a loaded dictionary. Duplicates (compared
//! case-insensitively, whitespace collapsed) are merged at load time: the
//! first occurrence wins and later copies only fill a missing category or
//! description.
//!
//! When several dictionaries are selected for one job, [`TermSet`] merges them
//! the same way: a term present in more than one dictionary is matched and
//! counted once, under the category of the first dictionary that lists it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use docscope_core::{Dictionary, DictionaryInfo, DictionarySource, DictionaryTerm, Result};

use crate::normalize_whitespace;

/// Caching front of a [`DictionarySource`].
pub struct DictionaryStore {
    source: Arc<dyn DictionarySource>,
    cache: Mutex<HashMap<String, Arc<OnceCell<Arc<Dictionary>>>>>,
}

impl DictionaryStore {
    pub fn new(source: Arc<dyn DictionarySource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// List dictionaries offered by the source.
    pub async fn list(&self) -> Result<Vec<DictionaryInfo>> {
        self.source.list_dictionaries().await
    }

    /// Get a dictionary, loading it from the source on first use.
    ///
    /// Concurrent first requests for the same id share a single load.
    /// A failed load is not cached.
    pub async fn get(&self, id: &str) -> Result<Arc<Dictionary>> {
        let cell = {
            let mut cache = self.cache.lock().await;
            cache.entry(id.to_string()).or_default().clone()
        };

        let dictionary = cell
            .get_or_try_init(|| async {
                let (info, raw_terms) = self.source.load_dictionary(id).await?;
                let raw_count = raw_terms.len();
                let terms = merge_duplicate_terms(raw_terms);
                info!(
                    dictionary_id = %id,
                    term_count = terms.len(),
                    merged = raw_count - terms.len(),
                    "Loaded dictionary"
                );
                Ok::<_, docscope_core::Error>(Arc::new(Dictionary {
                    id: info.id,
                    name: info.name,
                    terms,
                }))
            })
            .await?;

        Ok(dictionary.clone())
    }

    /// Resolve the dictionaries of one job into a merged [`TermSet`].
    pub async fn resolve(&self, ids: &[String]) -> Result<TermSet> {
        let mut dictionaries = Vec::with_capacity(ids.len());
        for id in ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
            dictionaries.push(self.get(id).await?);
        }
        Ok(TermSet::from_dictionaries(&dictionaries))
    }

    /// Number of dictionaries currently loaded.
    pub async fn loaded_count(&self) -> usize {
        let cache = self.cache.lock().await;
        cache.values().filter(|cell| cell.initialized()).count()
    }
}

/// Merge duplicate terms, keeping first-occurrence order.
pub fn merge_duplicate_terms(raw: Vec<DictionaryTerm>) -> Vec<DictionaryTerm> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut terms: Vec<DictionaryTerm> = Vec::with_capacity(raw.len());

    for term in raw {
        let key = normalize_whitespace(&term.normalized());
        if key.is_empty() {
            continue;
        }
        match index.get(&key) {
            Some(&i) => {
                let existing = &mut terms[i];
                if existing.category.is_none() {
                    existing.category = term.category;
                }
                if existing.description.is_none() {
                    existing.description = term.description;
                }
            }
            None => {
                index.insert(key, terms.len());
                terms.push(term);
            }
        }
    }
    terms
}

/// A term ready for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTerm {
    /// Term text as written in the dictionary (used as the aggregation key).
    pub term: String,
    /// Lower-cased, whitespace-collapsed form searched in section text.
    pub needle: String,
    pub category: Option<String>,
    pub dictionary_id: String,
}

/// Union of the dictionaries selected for a job, one entry per distinct term.
#[derive(Debug, Clone, Default)]
pub struct TermSet {
    terms: Vec<ResolvedTerm>,
}

impl TermSet {
    /// Merge dictionaries in priority order.
    pub fn from_dictionaries(dictionaries: &[Arc<Dictionary>]) -> Self {
        let mut seen = HashSet::new();
        let mut terms = Vec::new();

        for dictionary in dictionaries {
            for term in &dictionary.terms {
                let needle = normalize_whitespace(&term.normalized());
                if needle.is_empty() || !seen.insert(needle.clone()) {
                    continue;
                }
                terms.push(ResolvedTerm {
                    term: term.term.clone(),
                    needle,
                    category: term
                        .category
                        .clone()
                        .or_else(|| Some(dictionary.name.clone())),
                    dictionary_id: dictionary.id.clone(),
                });
            }
        }

        terms.sort_by(|a, b| a.needle.cmp(&b.needle));
        debug!(term_count = terms.len(), "Resolved term set");
        Self { terms }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedTerm> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryDictionarySource;
    use docscope_core::Error;

    fn term(text: &str) -> DictionaryTerm {
        DictionaryTerm::new(text).unwrap()
    }

    #[test]
    fn test_merge_duplicate_terms_first_wins_and_fills_gaps() {
        let merged = merge_duplicate_terms(vec![
            term("Python").with_category("language"),
            term("python").with_description("A programming language"),
            term("  PYTHON ").with_category("snake"),
            term("SPSS"),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].term, "Python");
        assert_eq!(merged[0].category.as_deref(), Some("language"));
        assert_eq!(merged[0].description.as_deref(), Some("A programming language"));
        assert_eq!(merged[1].term, "SPSS");
    }

    #[test]
    fn test_merge_collapses_inner_whitespace() {
        let merged = merge_duplicate_terms(vec![term("random forest"), term("random   forest")]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_term_set_merges_across_dictionaries() {
        let software = Arc::new(Dictionary {
            id: "software".into(),
            name: "Software".into(),
            terms: vec![term("R"), term("python")],
        });
        let stats = Arc::new(Dictionary {
            id: "stats".into(),
            name: "Statistics".into(),
            terms: vec![term("r").with_category("language"), term("anova")],
        });

        let set = TermSet::from_dictionaries(&[software, stats]);
        assert_eq!(set.len(), 3);
        let r = set.iter().find(|t| t.needle == "r").unwrap();
        assert_eq!(r.dictionary_id, "software");
        assert_eq!(r.term, "R");
        assert_eq!(r.category.as_deref(), Some("Software"));
        let needles: Vec<_> = set.iter().map(|t| t.needle.as_str()).collect();
        assert_eq!(needles, vec!["anova", "python", "r"]);
    }

    #[tokio::test]
    async fn test_store_caches_and_reports_missing() {
        let source = InMemoryDictionarySource::new().with_dictionary(
            "software",
            "Software",
            vec![term("python"), term("Python"), term("spss")],
        );
        let store = DictionaryStore::new(Arc::new(source));

        let first = store.get("software").await.unwrap();
        let second = store.get("software").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.terms.len(), 2);
        assert_eq!(store.loaded_count().await, 1);

        let missing = store.get("nope").await;
        assert!(matches!(missing, Err(Error::DictionaryNotFound(id)) if id == "nope"));
        assert_eq!(store.loaded_count().await, 1);
    }

    #[tokio::test]
    async fn test_store_resolve_skips_blank_ids() {
        let source = InMemoryDictionarySource::new()
            .with_dictionary("a", "A", vec![term("alpha")])
            .with_dictionary("b", "B", vec![term("beta"), term("alpha")]);
        let store = DictionaryStore::new(Arc::new(source));

        let set = store
            .resolve(&["a".to_string(), " ".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(set.len(), 2);
    }
}
