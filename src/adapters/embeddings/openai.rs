//! OpenAI embedding provider adapter.
//!
//! Calls the `/embeddings` endpoint of OpenAI or any compatible server
//! (Azure OpenAI, local inference servers).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::EmbeddingProvider;
use crate::infrastructure::config::OPENAI_API_KEY_ENV;
use crate::infrastructure::logging::scrub;

const PROVIDER: &str = "openai";

/// Configuration for the OpenAI embedding provider.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    /// API key. Falls back to `OPENAI_API_KEY` env var.
    pub api_key: Option<String>,
    /// Base URL for the API. Default: `https://api.openai.com/v1`.
    pub base_url: String,
    /// Embedding model. Default: `text-embedding-3-small`.
    pub model: String,
    /// Expected embedding dimension. Default: 1536.
    pub dimension: usize,
    /// Request timeout in seconds. Default: 30.
    pub timeout_secs: u64,
    /// Maximum texts per single API request. Default: 2048.
    pub max_batch_size: usize,
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self::from(&EmbeddingConfig::default())
    }
}

impl From<&EmbeddingConfig> for OpenAiEmbeddingConfig {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
            timeout_secs: config.timeout_secs,
            max_batch_size: config.max_batch_size.max(1),
        }
    }
}

impl OpenAiEmbeddingConfig {
    fn get_api_key(&self) -> DomainResult<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(OPENAI_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                DomainError::embedding(
                    PROVIDER,
                    "API key not set. Set OPENAI_API_KEY or configure embedding.api_key",
                )
            })
    }
}

/// OpenAI embedding provider.
pub struct OpenAiEmbeddingProvider {
    config: OpenAiEmbeddingConfig,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiEmbeddingConfig) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    async fn call_embeddings_api(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let api_key = self.config.get_api_key()?;
        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));

        let request_body = EmbeddingsRequest {
            model: &self.config.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| DomainError::embedding(PROVIDER, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(DomainError::embedding(
                PROVIDER,
                format!("API returned {status}: {}", scrub(&body)),
            ));
        }

        let result: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| DomainError::embedding(PROVIDER, format!("malformed response: {e}")))?;

        // Sort by index to maintain input order
        let mut data = result.data;
        data.sort_by_key(|d| d.index);

        if data.len() != texts.len() {
            return Err(DomainError::embedding(
                PROVIDER,
                format!("expected {} embeddings, got {}", texts.len(), data.len()),
            ));
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.max_batch_size) {
            vectors.extend(self.call_embeddings_api(batch).await?);
        }

        debug!(
            model = %self.config.model,
            texts = texts.len(),
            "Embedded batch"
        );
        Ok(vectors)
    }

    fn max_batch_size(&self) -> usize {
        self.config.max_batch_size
    }
}

// -- OpenAI API request/response types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
