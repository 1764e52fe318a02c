//! GLiNER NER backend for zero-shot named entity recognition.
//!
//! Client for a GLiNER sidecar service exposing `POST /extract` and
//! `GET /health`.
//!
//! # Configuration
//!
//! - `GLINER_BASE_URL`: Base URL of the GLiNER sidecar (e.g. `http://localhost:8090`)
//! - Unset or empty disables entity recognition.

use std::time::Duration;

use async_trait::async_trait;
use docscope_core::defaults::{ENV_GLINER_BASE_URL, NER_THRESHOLD, NER_TIMEOUT_SECS};
use docscope_core::{EntityRecognizer, Error, RecognizedEntity, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A named entity extracted by GLiNER.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NerEntity {
    /// The entity text as it appears in the source.
    pub text: String,
    /// The entity type label (e.g., "ORG", "PERSON").
    pub label: String,
    /// Confidence score from the NER model (0.0-1.0).
    #[serde(default)]
    pub score: f32,
    /// Character start offset in the source text.
    pub start: usize,
    /// Character end offset in the source text.
    pub end: usize,
}

/// Result of NER extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerResult {
    pub entities: Vec<NerEntity>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub text_length: usize,
}

/// GLiNER sidecar client.
pub struct GlinerBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
    threshold: f32,
}

impl GlinerBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: "gliner".to_string(),
            client: reqwest::Client::new(),
            timeout_secs: NER_TIMEOUT_SECS,
            threshold: NER_THRESHOLD,
        }
    }

    /// Create from environment variables.
    /// Returns None if `GLINER_BASE_URL` is unset or empty.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(ENV_GLINER_BASE_URL).unwrap_or_default();
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self::new(base_url))
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Request payload for the GLiNER `/extract` endpoint.
#[derive(Serialize)]
struct ExtractRequest<'a> {
    text: &'a str,
    entity_types: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    threshold: Option<f32>,
}

/// Health check response from GLiNER.
#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

#[async_trait]
impl EntityRecognizer for GlinerBackend {
    async fn recognize(&self, text: &str, entity_types: &[String]) -> Result<Vec<RecognizedEntity>> {
        if text.trim().is_empty() || entity_types.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/extract", self.base_url);
        let request = ExtractRequest {
            text,
            entity_types,
            threshold: Some(self.threshold),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::RecognitionUnavailable(format!("GLiNER request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "GLiNER extraction rejected");
            return Err(Error::RecognitionUnavailable(format!(
                "GLiNER API returned {}: {}",
                status, body
            )));
        }

        let result: NerResult = response.json().await.map_err(|e| {
            Error::RecognitionUnavailable(format!("Failed to parse GLiNER response: {}", e))
        })?;

        debug!(
            entity_count = result.entities.len(),
            text_length = text.len(),
            "GLiNER extraction complete"
        );

        Ok(result
            .entities
            .into_iter()
            .filter(|e| !e.text.trim().is_empty())
            .map(|e| RecognizedEntity {
                label: e.label,
                start: e.start,
                end: e.end,
                text: e.text,
            })
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => Ok(resp
                .json::<HealthResponse>()
                .await
                .map(|health| health.status == "healthy")
                .unwrap_or(false)),
            _ => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
