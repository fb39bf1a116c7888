use serde::{Deserialize, Serialize};

use super::chunking::ChunkingConfig;
use crate::infrastructure::logging::LogConfig;

/// Main configuration structure for docsnap
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Snapshot storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Document chunking parameters
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Answer generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Query-time retrieval policy
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LogConfig,
}

/// Snapshot storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// One directory per snapshot, published by atomic rename
    #[default]
    Fs,
    /// SQLite database, published by transaction
    Sqlite,
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory (fs) or database file (sqlite)
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String {
    ".docsnap/snapshots".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

/// Embedding provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible `/embeddings` endpoint
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    /// Local hashed bag-of-words vectors (offline, no model)
    Hashed,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected vector dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// API key; falls back to `OPENAI_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-call timeout
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum texts per provider call
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Batches in flight during ingestion
    #[serde(default = "default_embedding_concurrency")]
    pub concurrency: usize,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_embedding_dimension() -> usize {
    1536
}

const fn default_embedding_timeout_secs() -> u64 {
    30
}

const fn default_max_batch_size() -> usize {
    2048
}

const fn default_embedding_concurrency() -> usize {
    4
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            base_url: default_openai_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            api_key: None,
            timeout_secs: default_embedding_timeout_secs(),
            max_batch_size: default_max_batch_size(),
            concurrency: default_embedding_concurrency(),
        }
    }
}

/// Answer generator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProviderKind {
    /// OpenAI-compatible `/chat/completions` endpoint
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProviderKind,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    /// API key; falls back to `OPENAI_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-call timeout
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_temperature() -> f32 {
    0.3
}

const fn default_max_tokens() -> u32 {
    1024
}

const fn default_generation_timeout_secs() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProviderKind::default(),
            base_url: default_openai_base_url(),
            model: default_generation_model(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

/// Query-time retrieval policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Maximum number of built indexes kept in memory
    #[serde(default = "default_index_cache_capacity")]
    pub index_cache_capacity: u64,

    /// Evict a cached index after this long without queries
    #[serde(default = "default_index_cache_idle_secs")]
    pub index_cache_idle_secs: u64,
}

const fn default_top_k() -> usize {
    4
}

const fn default_index_cache_capacity() -> u64 {
    32
}

const fn default_index_cache_idle_secs() -> u64 {
    900
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            index_cache_capacity: default_index_cache_capacity(),
            index_cache_idle_secs: default_index_cache_idle_secs(),
        }
    }
}
