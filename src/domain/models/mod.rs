//! Domain models for chunks, snapshots, retrieval results, and configuration.

pub mod chunking;
pub mod config;
pub mod prompt;
pub mod retrieval;
pub mod snapshot;

pub use chunking::{Chunk, ChunkingConfig, EmbeddedChunk, SourceDocument};
pub use config::{
    Config, EmbeddingConfig, EmbeddingProviderKind, GenerationConfig, GenerationProviderKind,
    RetrievalConfig, StorageBackend, StorageConfig,
};
pub use prompt::{render_grounded_prompt, GROUNDED_ANSWER_INSTRUCTION, NOT_IN_CONTEXT_MARKER};
pub use retrieval::{
    assemble_context, IngestionReport, QueryStage, RetrievalAnswer, RetrievedContext, ScoredChunk,
    CONTEXT_SEPARATOR,
};
pub use snapshot::{validate_embedded_chunks, validate_snapshot_chunks, Snapshot, SnapshotId, TenantId};
