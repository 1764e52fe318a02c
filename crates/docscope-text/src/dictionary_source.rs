//! Dictionary sources.
//!
//! [`DirectoryDictionarySource`] reads AMI-style XML dictionaries from a
//! directory tree; the dictionary id is the path relative to the root without
//! the `.xml` extension (e.g. `software`, `methods/statistics`):
//!
//! ```xml
//! <dictionary title="software">
//!   <entry term="python" name="Python" description="Programming language"/>
//!   <entry term="spss" category="statistics"/>
//! </dictionary>
//! ```

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use docscope_core::defaults::{DICTIONARY_DIR, ENV_DICTIONARY_DIR};
use docscope_core::{DictionaryInfo, DictionarySource, DictionaryTerm, Error, Result};

static DICTIONARY_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("dictionary").expect("valid selector"));
static ENTRY_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("entry").expect("valid selector"));

/// Directory-backed dictionary source.
pub struct DirectoryDictionarySource {
    root: PathBuf,
}

impl DirectoryDictionarySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `DICTIONARY_DIR`, defaulting to `./dictionary`.
    pub fn from_env() -> Self {
        let root = std::env::var(ENV_DICTIONARY_DIR).unwrap_or_else(|_| DICTIONARY_DIR.to_string());
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        let relative = Path::new(id);
        let safe = !id.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.root.join(format!("{}.xml", id)))
    }

    /// Every `.xml` file below the root, as (id, path), sorted by id.
    async fn scan(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut found = Vec::new();
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            return Ok(found);
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                let is_xml = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("xml"))
                    .unwrap_or(false);
                if !is_xml {
                    continue;
                }
                if let Some(id) = dictionary_id(&self.root, &path) {
                    found.push((id, path));
                }
            }
        }
        found.sort();
        Ok(found)
    }
}

/// Relative path without extension, `/`-separated.
fn dictionary_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// `methods/machine_learning` → `Methods/Machine Learning`.
fn display_name(id: &str) -> String {
    let mut name = String::with_capacity(id.len());
    let mut word_start = true;
    for c in id.chars() {
        let c = if c == '_' { ' ' } else { c };
        if word_start {
            name.extend(c.to_uppercase());
        } else {
            name.push(c);
        }
        word_start = c == ' ' || c == '/';
    }
    name
}

/// Parse one AMI dictionary document into (title, terms).
///
/// The entry text falls back from `term` to `name`. Category falls back to
/// the dictionary title.
pub fn parse_ami_dictionary(content: &str) -> (Option<String>, Vec<DictionaryTerm>) {
    let document = Html::parse_fragment(content);
    let title = document
        .select(&DICTIONARY_SEL)
        .next()
        .and_then(|d| d.value().attr("title"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let terms = document
        .select(&ENTRY_SEL)
        .filter_map(|entry| {
            let attrs = entry.value();
            let text = attrs.attr("term").or_else(|| attrs.attr("name"))?;
            let mut term = DictionaryTerm::new(text)?;
            term.category = attrs
                .attr("category")
                .map(str::to_string)
                .or_else(|| title.clone());
            term.description = attrs
                .attr("description")
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty());
            Some(term)
        })
        .collect();

    (title, terms)
}

#[async_trait]
impl DictionarySource for DirectoryDictionarySource {
    async fn list_dictionaries(&self) -> Result<Vec<DictionaryInfo>> {
        let mut infos = Vec::new();
        for (id, path) in self.scan().await? {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    let (_, terms) = parse_ami_dictionary(&content);
                    infos.push(DictionaryInfo {
                        name: display_name(&id),
                        entries: crate::merge_duplicate_terms(terms).len(),
                        id,
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable dictionary");
                }
            }
        }
        Ok(infos)
    }

    async fn load_dictionary(&self, id: &str) -> Result<(DictionaryInfo, Vec<DictionaryTerm>)> {
        let path = self
            .path_for(id)
            .ok_or_else(|| Error::DictionaryNotFound(id.to_string()))?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::DictionaryNotFound(id.to_string()));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let (_, terms) = parse_ami_dictionary(&content);
        debug!(dictionary_id = %id, raw_terms = terms.len(), "Parsed dictionary file");
        let info = DictionaryInfo {
            id: id.to_string(),
            name: display_name(id),
            entries: terms.len(),
        };
        Ok((info, terms))
    }
}

/// In-memory dictionary source, mainly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDictionarySource {
    dictionaries: BTreeMap<String, (String, Vec<DictionaryTerm>)>,
}

impl InMemoryDictionarySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dictionary(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        terms: Vec<DictionaryTerm>,
    ) -> Self {
        self.dictionaries.insert(id.into(), (name.into(), terms));
        self
    }

    /// Convenience: dictionary from bare term strings (blank strings dropped).
    pub fn with_terms<S: AsRef<str>>(
        self,
        id: impl Into<String>,
        terms: impl IntoIterator<Item = S>,
    ) -> Self {
        let id = id.into();
        let terms = terms.into_iter().filter_map(DictionaryTerm::new).collect();
        let name = display_name(&id);
        self.with_dictionary(id, name, terms)
    }
}

#[async_trait]
impl DictionarySource for InMemoryDictionarySource {
    async fn list_dictionaries(&self) -> Result<Vec<DictionaryInfo>> {
        Ok(self
            .dictionaries
            .iter()
            .map(|(id, (name, terms))| DictionaryInfo {
                id: id.clone(),
                name: name.clone(),
                entries: crate::merge_duplicate_terms(terms.clone()).len(),
            })
            .collect())
    }

    async fn load_dictionary(&self, id: &str) -> Result<(DictionaryInfo, Vec<DictionaryTerm>)> {
        let (name, terms) = self
            .dictionaries
            .get(id)
            .ok_or_else(|| Error::DictionaryNotFound(id.to_string()))?;
        let info = DictionaryInfo {
            id: id.to_string(),
            name: name.clone(),
            entries: terms.len(),
        };
        Ok((info, terms.clone()))
    }
}
