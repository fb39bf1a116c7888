//! Wiring from `Config` to concrete adapters and services.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapters::embeddings::{HashedEmbeddingProvider, OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
use crate::adapters::fs::FsSnapshotStore;
use crate::adapters::generation::{OpenAiAnswerGenerator, OpenAiChatConfig};
use crate::adapters::sqlite::SqliteSnapshotStore;
use crate::domain::models::{
    Config, EmbeddingProviderKind, GenerationProviderKind, StorageBackend, TenantId,
};
use crate::domain::ports::{AnswerGenerator, EmbeddingProvider, SnapshotStore};
use crate::infrastructure::vector::{Chunker, IndexCache};
use crate::services::{IngestionOptions, IngestionService, RetrievalOptions, RetrievalService};

/// Adapters shared by one CLI invocation
pub struct AppContext {
    config: Config,
    store: Arc<dyn SnapshotStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl AppContext {
    /// Open the configured store and embedding provider.
    pub async fn build(config: Config) -> Result<Self> {
        let store = open_store(&config).await?;
        let embedder = build_embedder(&config)?;

        Ok(Self {
            config,
            store,
            embedder,
        })
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn SnapshotStore> {
        Arc::clone(&self.store)
    }

    pub fn ingestion_service(&self) -> Result<IngestionService> {
        let chunker = Chunker::new(self.config.chunking).context("Invalid chunking configuration")?;

        Ok(IngestionService::new(
            chunker,
            Arc::clone(&self.embedder),
            self.store(),
            IngestionOptions::from(&self.config.embedding),
        ))
    }

    pub fn retrieval_service(&self) -> Result<RetrievalService> {
        Ok(RetrievalService::new(
            Arc::clone(&self.embedder),
            build_generator(&self.config)?,
            self.store(),
            IndexCache::from_config(&self.config.retrieval),
            RetrievalOptions::from(&self.config),
        ))
    }
}

/// Parse a `--tenant` argument
pub fn parse_tenant(value: &str) -> Result<TenantId> {
    TenantId::new(value).with_context(|| format!("Invalid tenant id '{value}'"))
}

async fn open_store(config: &Config) -> Result<Arc<dyn SnapshotStore>> {
    let path = &config.storage.path;
    let store: Arc<dyn SnapshotStore> = match config.storage.backend {
        StorageBackend::Fs => Arc::new(FsSnapshotStore::new(path)),
        StorageBackend::Sqlite => Arc::new(
            SqliteSnapshotStore::open(path)
                .await
                .with_context(|| format!("Failed to open snapshot database {path}"))?,
        ),
    };
    Ok(store)
}

fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedding = &config.embedding;
    let embedder: Arc<dyn EmbeddingProvider> = match embedding.provider {
        EmbeddingProviderKind::OpenAi => Arc::new(
            OpenAiEmbeddingProvider::new(OpenAiEmbeddingConfig::from(embedding))
                .context("Failed to create OpenAI embedding provider")?,
        ),
        EmbeddingProviderKind::Hashed => Arc::new(
            HashedEmbeddingProvider::new(embedding.dimension, embedding.max_batch_size)
                .context("Failed to create hashed embedding provider")?,
        ),
    };
    Ok(embedder)
}

fn build_generator(config: &Config) -> Result<Arc<dyn AnswerGenerator>> {
    let generator: Arc<dyn AnswerGenerator> = match config.generation.provider {
        GenerationProviderKind::OpenAi => Arc::new(
            OpenAiAnswerGenerator::new(OpenAiChatConfig::from(&config.generation))
                .context("Failed to create OpenAI answer generator")?,
        ),
    };
    Ok(generator)
}
