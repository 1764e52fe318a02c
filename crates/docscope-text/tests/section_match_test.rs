//! Integration tests for sectioning and dictionary matching.
//!
//! This test suite validates:
//! - Dictionaries loaded from an AMI XML directory match sectioned JATS text
//! - Section filters restrict matching without dropping the document
//! - Terms shared by several dictionaries are counted once
//! - Malformed markup still yields countable whole-document text

use std::sync::Arc;

use docscope_core::{MatchKey, Section, SectionCode};
use docscope_text::{
    ContentHint, DictionaryStore, DirectoryDictionarySource, InMemoryDictionarySource, Matcher,
    Sectioner,
};

const ARTICLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<article>
  <front><article-meta>
    <title-group><article-title>Statistical software in practice</article-title></title-group>
    <abstract><p>We compare SPSS with R.</p></abstract>
  </article-meta></front>
  <body>
    <sec sec-type="methods"><title>Methods</title>
      <p>Analyses were run in Python and SPSS. Python scripts are available.</p>
    </sec>
    <sec><title>Results</title><p>R was faster for bootstrapping.</p></sec>
  </body>
</article>"#;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

async fn write_dictionaries(dir: &std::path::Path) {
    tokio::fs::write(
        dir.join("software.xml"),
        r#"<dictionary title="software">
  <entry term="Python"/>
  <entry term="SPSS"/>
  <entry term="R"/>
  <entry term="python" description="duplicate"/>
</dictionary>"#,
    )
    .await
    .expect("write dictionary");
    tokio::fs::write(
        dir.join("stats.xml"),
        r#"<dictionary title="stats">
  <entry term="spss" category="statistics"/>
  <entry term="bootstrapping"/>
</dictionary>"#,
    )
    .await
    .expect("write dictionary");
}

async fn matcher_for(store: &DictionaryStore, ids: &[&str]) -> Matcher {
    let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    let terms = store.resolve(&ids).await.expect("resolve dictionaries");
    Matcher::new(Arc::new(terms))
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_directory_dictionaries_match_jats_sections() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dictionaries(dir.path()).await;
    let store = DictionaryStore::new(Arc::new(DirectoryDictionarySource::new(dir.path())));

    let listed = store.list().await.expect("list");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].entries, 3, "duplicate python merged");

    let matcher = matcher_for(&store, &["software"]).await;
    let doc = Sectioner::new().section(ARTICLE, ContentHint::Markup);
    let result = matcher.match_sections(&doc.sections, |_| true);

    assert_eq!(result.term_count("Python"), 2);
    assert_eq!(result.term_count("SPSS"), 2);
    assert_eq!(result.term_count("R"), 2);

    let spss = result.get(&MatchKey::term("SPSS")).unwrap();
    assert_eq!(spss.by_section.get(&SectionCode::Abstract), Some(&1));
    assert_eq!(spss.by_section.get(&SectionCode::Methods), Some(&1));
}

#[tokio::test]
async fn test_section_filter_restricts_matching() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dictionaries(dir.path()).await;
    let store = DictionaryStore::new(Arc::new(DirectoryDictionarySource::new(dir.path())));
    let matcher = matcher_for(&store, &["software"]).await;

    let doc = Sectioner::new().section(ARTICLE, ContentHint::Markup);
    let result = matcher.match_sections(&doc.sections, |c| c == SectionCode::Methods);

    assert_eq!(result.term_count("Python"), 2);
    assert_eq!(result.term_count("SPSS"), 1);
    assert_eq!(result.term_count("R"), 0);
}

#[tokio::test]
async fn test_shared_term_counted_once_with_first_category() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dictionaries(dir.path()).await;
    let store = DictionaryStore::new(Arc::new(DirectoryDictionarySource::new(dir.path())));
    let matcher = matcher_for(&store, &["software", "stats"]).await;

    let sections = vec![Section::whole_document("SPSS and bootstrapping, then SPSS again")];
    let result = matcher.match_sections(&sections, |_| true);

    assert_eq!(result.term_count("SPSS"), 2);
    assert_eq!(result.term_count("spss"), 0);
    assert_eq!(result.term_count("bootstrapping"), 1);
    let entry = result.get(&MatchKey::term("SPSS")).unwrap();
    assert_eq!(entry.category.as_deref(), Some("software"));
}

#[tokio::test]
async fn test_malformed_markup_is_still_matched() {
    let source = InMemoryDictionarySource::new().with_terms("software", ["python"]);
    let store = DictionaryStore::new(Arc::new(source));
    let matcher = matcher_for(&store, &["software"]).await;

    let doc = Sectioner::new().section(
        "<article><body><sec><p>Python everywhere</article>",
        ContentHint::Markup,
    );
    assert!(doc.is_fallback());
    let result = matcher.match_sections(&doc.sections, |_| true);
    assert_eq!(result.term_count("python"), 1);
}

#[tokio::test]
async fn test_matching_is_deterministic() {
    let source = InMemoryDictionarySource::new().with_terms("software", ["python", "spss", "r"]);
    let store = DictionaryStore::new(Arc::new(source));
    let matcher = matcher_for(&store, &["software"]).await;

    let doc = Sectioner::new().section(ARTICLE, ContentHint::Markup);
    let first = matcher.match_sections(&doc.sections, |_| true);
    let second = matcher.match_sections(&doc.sections, |_| true);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
