//! Embedding provider port for semantic vector generation.
//!
//! Defines the trait for embedding providers that convert text into
//! dense vector representations for similarity search.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Trait for embedding providers.
///
/// Failures of any kind surface as `DomainError::EmbeddingUnavailable`;
/// the core does not retry them.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "hashed").
    fn name(&self) -> &'static str;

    /// Embedding dimension for this provider/model.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts.
    ///
    /// Returns exactly one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>>;

    /// Maximum number of texts per single call.
    fn max_batch_size(&self) -> usize;
}
