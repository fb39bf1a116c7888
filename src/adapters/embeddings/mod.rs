//! Embedding provider adapters.

pub mod hashed;
pub mod openai;

pub use hashed::HashedEmbeddingProvider;
pub use openai::{OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
