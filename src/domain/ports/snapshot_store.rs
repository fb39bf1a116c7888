//! Snapshot store port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{EmbeddedChunk, Snapshot, SnapshotId, TenantId};

/// Durable, append-only repository of per-tenant snapshots.
///
/// Implementations must publish a snapshot only after it is fully written,
/// and must allocate ids that strictly increase per tenant.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Backend name (e.g., "fs", "sqlite").
    fn name(&self) -> &'static str;

    /// Write a new snapshot and publish it. All-or-nothing.
    async fn put(&self, tenant_id: &TenantId, chunks: Vec<EmbeddedChunk>) -> DomainResult<SnapshotId>;

    /// Greatest published id, or `DomainError::NoIndexForTenant`.
    async fn latest(&self, tenant_id: &TenantId) -> DomainResult<SnapshotId>;

    /// Load a published snapshot, or `DomainError::SnapshotNotFound`.
    async fn load(&self, tenant_id: &TenantId, snapshot_id: &SnapshotId) -> DomainResult<Snapshot>;

    /// Published ids in ascending order (empty for an unknown tenant).
    async fn list_snapshots(&self, tenant_id: &TenantId) -> DomainResult<Vec<SnapshotId>>;
}
