//! Domain errors for the docsnap retrieval core.

use thiserror::Error;

/// Domain-level errors that can occur in the docsnap core.
///
/// Variants are `Clone` so that a single failure can be shared between
/// concurrent waiters on the same cached index load.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Invalid configuration, rejected when a component is constructed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid call-site arguments.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Embedding provider '{provider}' unavailable: {reason}")]
    EmbeddingUnavailable { provider: String, reason: String },

    #[error("Generation provider '{provider}' unavailable: {reason}")]
    GenerationUnavailable { provider: String, reason: String },

    #[error("Snapshot storage unavailable during {operation}: {reason}")]
    StorageUnavailable { operation: String, reason: String },

    /// The tenant has never published a snapshot. Ingest a document first.
    #[error("No index exists for tenant '{0}'")]
    NoIndexForTenant(String),

    #[error("Snapshot not found: {tenant_id}/{snapshot_id}")]
    SnapshotNotFound {
        tenant_id: String,
        snapshot_id: String,
    },

    #[error("{collaborator} timed out after {timeout_ms}ms while {stage}")]
    Timeout {
        stage: String,
        collaborator: String,
        timeout_ms: u64,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Build a `StorageUnavailable` error for the named store operation.
    pub fn storage(operation: &str, reason: impl ToString) -> Self {
        Self::StorageUnavailable {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Build an `EmbeddingUnavailable` error for the named provider.
    pub fn embedding(provider: &str, reason: impl ToString) -> Self {
        Self::EmbeddingUnavailable {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Build a `GenerationUnavailable` error for the named provider.
    pub fn generation(provider: &str, reason: impl ToString) -> Self {
        Self::GenerationUnavailable {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage("query", err)
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_stage_and_collaborator() {
        let err = DomainError::Timeout {
            stage: "embedding query".to_string(),
            collaborator: "openai".to_string(),
            timeout_ms: 1500,
        };
        assert_eq!(
            err.to_string(),
            "openai timed out after 1500ms while embedding query"
        );

        let err = DomainError::embedding("hashed", "dimension mismatch");
        assert_eq!(
            err.to_string(),
            "Embedding provider 'hashed' unavailable: dimension mismatch"
        );
    }
}
