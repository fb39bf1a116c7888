//! docsnap - versioned document snapshots for grounded question answering
//!
//! docsnap splits a tenant's documents into overlapping chunks, embeds them,
//! and publishes the result as an immutable, versioned snapshot. Questions
//! are answered from the latest (or a pinned) snapshot by cosine retrieval
//! followed by a grounded generation call.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors, and the port traits
//! - **Service Layer** (`services`): ingestion and query pipelines
//! - **Infrastructure Layer** (`infrastructure`): config, logging, chunking, vector search
//! - **Adapters** (`adapters`): OpenAI-compatible HTTP clients, fs and SQLite stores
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docsnap::adapters::embeddings::HashedEmbeddingProvider;
//! use docsnap::adapters::fs::FsSnapshotStore;
//! use docsnap::domain::models::{ChunkingConfig, TenantId};
//! use docsnap::infrastructure::vector::Chunker;
//! use docsnap::services::{IngestionOptions, IngestionService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = IngestionService::new(
//!         Chunker::new(ChunkingConfig::default())?,
//!         Arc::new(HashedEmbeddingProvider::new(256, 64)?),
//!         Arc::new(FsSnapshotStore::new(".docsnap/snapshots")),
//!         IngestionOptions::default(),
//!     );
//!     let report = service.ingest_text(&TenantId::new("acme")?, "Cats purr.").await?;
//!     println!("published {}", report.snapshot_id);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Chunk, ChunkingConfig, Config, EmbeddedChunk, IngestionReport, QueryStage, RetrievalAnswer,
    ScoredChunk, Snapshot, SnapshotId, SourceDocument, TenantId,
};
pub use domain::ports::{AnswerGenerator, EmbeddingProvider, SnapshotStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{IngestionService, QueryError, RetrievalService};
