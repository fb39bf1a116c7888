//! Shared cache of built vector indexes.
//!
//! Snapshots are immutable, so an index built once for `(tenant, snapshot)`
//! stays valid until evicted. Concurrent misses for the same key share a
//! single load.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::index::VectorIndex;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{RetrievalConfig, SnapshotId, TenantId};
use crate::domain::ports::SnapshotStore;

type IndexKey = (TenantId, SnapshotId);

/// moka-backed cache of `Arc<VectorIndex>` keyed by tenant and snapshot
#[derive(Clone)]
pub struct IndexCache {
    indexes: Cache<IndexKey, Arc<VectorIndex>>,
}

impl IndexCache {
    pub fn new(max_capacity: u64, time_to_idle: Duration) -> Self {
        let indexes = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(time_to_idle)
            .build();

        Self { indexes }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(
            config.index_cache_capacity,
            Duration::from_secs(config.index_cache_idle_secs),
        )
    }

    /// Return the index for a snapshot, loading and building it on a miss.
    pub async fn get_or_load(
        &self,
        store: &dyn SnapshotStore,
        tenant_id: &TenantId,
        snapshot_id: &SnapshotId,
    ) -> DomainResult<Arc<VectorIndex>> {
        let key = (tenant_id.clone(), snapshot_id.clone());

        self.indexes
            .try_get_with(key, async {
                let snapshot = store.load(tenant_id, snapshot_id).await?;
                let index = VectorIndex::from_snapshot(snapshot)?;
                debug!(
                    tenant = %tenant_id,
                    snapshot_id = %snapshot_id,
                    chunks = index.len(),
                    "Built vector index"
                );
                Ok::<_, DomainError>(Arc::new(index))
            })
            .await
            .map_err(|err: Arc<DomainError>| (*err).clone())
    }
}
