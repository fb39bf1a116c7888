//! Service layer: ingestion and query pipelines over the domain ports.

pub mod ingestion_service;
pub mod retrieval_service;

pub use ingestion_service::{IngestionOptions, IngestionService};
pub use retrieval_service::{QueryError, QueryResult, RetrievalOptions, RetrievalService};

use std::future::Future;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};

/// Await a collaborator call, failing with `DomainError::Timeout` after `limit`
pub(crate) async fn call_with_timeout<T>(
    limit: Duration,
    stage: &str,
    collaborator: &str,
    call: impl Future<Output = DomainResult<T>>,
) -> DomainResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::Timeout {
            stage: stage.to_string(),
            collaborator: collaborator.to_string(),
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
