//! Europe PMC corpus client.
//!
//! Searches the Europe PMC REST API and downloads full-text XML for each
//! open-access hit into `<dest>/<pmcid>/fulltext.xml`.
//!
//! # Configuration
//!
//! - `EUROPE_PMC_BASE_URL`: REST base URL (default: the public Europe PMC service)

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use docscope_core::defaults::{
    CORPUS_REQUEST_TIMEOUT_SECS, ENV_EUROPE_PMC_BASE_URL, EUROPE_PMC_BASE_URL, FETCH_MAX_HITS,
    FULLTEXT_STEM,
};
use docscope_core::{sanitize_filename, CorpusClient, Error, FetchedRecord, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    hit_count: u64,
    #[serde(default)]
    result_list: ResultList,
}

#[derive(Debug, Default, Deserialize)]
struct ResultList {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    pmcid: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Europe PMC REST client.
pub struct EuropePmcClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl EuropePmcClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(CORPUS_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Create from environment variables, falling back to the public service.
    pub fn from_env() -> Self {
        let base_url = std::env::var(ENV_EUROPE_PMC_BASE_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| EUROPE_PMC_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search", self.base_url);
        let page_size = limit.clamp(1, FETCH_MAX_HITS).to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", query),
                ("format", "json"),
                ("pageSize", page_size.as_str()),
                ("resultType", "lite"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Europe PMC search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "Europe PMC search returned {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to parse Europe PMC response: {}", e)))?;
        debug!(hit_count = body.hit_count, "Europe PMC search complete");
        Ok(body.result_list.result)
    }
}

#[async_trait]
impl CorpusClient for EuropePmcClient {
    async fn fetch(&self, query: &str, limit: usize, dest: &Path) -> Result<Vec<FetchedRecord>> {
        let hits = self.search(query, limit).await?;

        let mut records = Vec::new();
        for hit in hits.into_iter().filter(|h| h.pmcid.is_some()) {
            if records.len() >= limit {
                break;
            }
            let Some(pmcid) = hit.pmcid else { continue };
            match self.fetch_by_id(&pmcid, dest).await {
                Ok(stored_path) => records.push(FetchedRecord {
                    external_id: pmcid,
                    title: hit.title,
                    stored_path,
                }),
                Err(e) => warn!(pmcid = %pmcid, error = %e, "Skipping record without full text"),
            }
        }
        Ok(records)
    }

    async fn fetch_by_id(&self, external_id: &str, dest: &Path) -> Result<PathBuf> {
        let id = sanitize_filename(external_id);
        let url = format!("{}/{}/fullTextXML", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("Europe PMC download of {} failed: {}", id, e)))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "Europe PMC returned {} for {}",
                response.status(),
                id
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("Europe PMC download of {} failed: {}", id, e)))?;

        let dir = dest.join(&id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.xml", FULLTEXT_STEM));
        tokio::fs::write(&path, &body).await?;
        Ok(path)
    }

    fn name(&self) -> &str {
        "europepmc"
    }
}
