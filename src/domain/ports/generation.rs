//! Answer generation port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Trait for the collaborator that writes a natural-language answer from
/// retrieved context.
///
/// Both fields are passed verbatim and the returned text is treated as
/// opaque. Failures surface as `DomainError::GenerationUnavailable`.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generator name (e.g., "openai").
    fn name(&self) -> &'static str;

    /// Answer `question` from `context`.
    async fn answer(&self, question: &str, context: &str) -> DomainResult<String>;
}
