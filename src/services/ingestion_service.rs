//! Ingestion pipeline
//!
//! documents → chunks → embeddings → validated index → published snapshot.
//! Any failure aborts before the store is touched, so a failed ingestion
//! never changes what queries see.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use super::call_with_timeout;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Chunk, EmbeddedChunk, EmbeddingConfig, IngestionReport, SourceDocument, TenantId};
use crate::domain::ports::{EmbeddingProvider, SnapshotStore};
use crate::infrastructure::vector::{Chunker, VectorIndex};

const EMBED_STAGE: &str = "embedding chunks";

/// Tuning for the embedding step of ingestion
#[derive(Debug, Clone, Copy)]
pub struct IngestionOptions {
    /// Deadline for each provider call
    pub embed_timeout: Duration,
    /// Upper bound on texts per call; the provider's own limit also applies
    pub max_batch_size: usize,
    /// Provider calls in flight at once
    pub concurrency: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self::from(&EmbeddingConfig::default())
    }
}

impl From<&EmbeddingConfig> for IngestionOptions {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            embed_timeout: Duration::from_secs(config.timeout_secs),
            max_batch_size: config.max_batch_size,
            concurrency: config.concurrency,
        }
    }
}

/// Turns source documents into a published snapshot
pub struct IngestionService {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn SnapshotStore>,
    options: IngestionOptions,
}

impl IngestionService {
    pub fn new(
        chunker: Chunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn SnapshotStore>,
        options: IngestionOptions,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            options,
        }
    }

    /// Chunk, embed, validate, and publish `documents` as a new snapshot.
    #[instrument(skip(self, tenant_id, documents), fields(tenant = %tenant_id, documents = documents.len()))]
    pub async fn ingest(&self, tenant_id: &TenantId, documents: &[SourceDocument]) -> DomainResult<IngestionReport> {
        let started = Instant::now();

        let chunks = self.chunker.split_documents(documents);
        if chunks.is_empty() {
            return Err(DomainError::Validation(
                "documents contain no text to index".to_string(),
            ));
        }
        debug!(chunks = chunks.len(), "Split documents");

        let embedded = self.embed_chunks(chunks).await?;
        let index = VectorIndex::build(embedded)?;
        let (chunk_count, dimension) = (index.len(), index.dimension());

        let snapshot_id = self.store.put(tenant_id, index.into_items()).await?;

        info!(
            snapshot_id = %snapshot_id,
            chunks = chunk_count,
            dimension,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingested snapshot"
        );

        Ok(IngestionReport {
            snapshot_id,
            document_count: documents.len(),
            chunk_count,
            dimension,
        })
    }

    /// Convenience for a single unnamed document
    pub async fn ingest_text(&self, tenant_id: &TenantId, text: &str) -> DomainResult<IngestionReport> {
        self.ingest(tenant_id, &[SourceDocument::new(text)]).await
    }

    /// Embed chunks in provider-sized batches, keeping chunk order.
    pub async fn embed_chunks(&self, chunks: Vec<Chunk>) -> DomainResult<Vec<EmbeddedChunk>> {
        let batch_size = self
            .options
            .max_batch_size
            .min(self.embedder.max_batch_size())
            .max(1);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(batch_size))
            .map(|batch| self.embed_batch(batch))
            .buffered(self.options.concurrency.max(1))
            .try_collect()
            .await?;

        let vectors: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        if vectors.len() != chunks.len() {
            return Err(DomainError::embedding(
                self.embedder.name(),
                format!("expected {} vectors, got {}", chunks.len(), vectors.len()),
            ));
        }

        Ok(chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk::new(chunk, vector))
            .collect())
    }

    async fn embed_batch(&self, batch: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let provider = self.embedder.name();
        let vectors = call_with_timeout(
            self.options.embed_timeout,
            EMBED_STAGE,
            provider,
            self.embedder.embed(batch),
        )
        .await?;

        if vectors.len() != batch.len() {
            return Err(DomainError::embedding(
                provider,
                format!("returned {} vectors for {} texts", vectors.len(), batch.len()),
            ));
        }

        let expected = self.embedder.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.is_empty() || v.len() != expected) {
            return Err(DomainError::embedding(
                provider,
                format!("returned a {}-dimensional vector, expected {expected}", bad.len()),
            ));
        }

        Ok(vectors)
    }
}
