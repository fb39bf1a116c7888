//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - EmbeddingProvider: text to vectors
//! - AnswerGenerator: question and context to answer text
//! - SnapshotStore: durable snapshot persistence

pub mod embedding;
pub mod generation;
pub mod snapshot_store;

pub use embedding::EmbeddingProvider;
pub use generation::AnswerGenerator;
pub use snapshot_store::SnapshotStore;
