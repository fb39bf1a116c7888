//! Directory-per-snapshot store.
//!
//! Layout: `<root>/<tenant>/<snapshot_id>/snapshot.json`. A snapshot is
//! written and fsynced under `<root>/<tenant>/.staging/<snapshot_id>/` and
//! then published by renaming its directory into the tenant directory.
//! Readers only consider directory names that parse as snapshot ids, so
//! staging leftovers from crashed or cancelled writes stay invisible. A later
//! allocation removes leftovers older than the newest published snapshot.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{validate_snapshot_chunks, EmbeddedChunk, Snapshot, SnapshotId, TenantId};
use crate::domain::ports::SnapshotStore;

const SNAPSHOT_FILE: &str = "snapshot.json";
const STAGING_DIR: &str = ".staging";

/// Per-tenant allocation state of this process
#[derive(Default)]
struct TenantSlot {
    /// Last id handed out. Holding the lock serializes allocation.
    last: Mutex<Option<SnapshotId>>,
    /// Staged ids whose puts are still running
    in_flight: std::sync::Mutex<HashSet<SnapshotId>>,
}

impl TenantSlot {
    fn in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<SnapshotId>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a staged id as owned by a running put until dropped
struct StagingLease {
    slot: Arc<TenantSlot>,
    snapshot_id: SnapshotId,
    path: PathBuf,
}

impl Drop for StagingLease {
    fn drop(&mut self) {
        self.slot.in_flight().remove(&self.snapshot_id);
    }
}

/// Filesystem-backed snapshot store
pub struct FsSnapshotStore {
    root: PathBuf,
    /// Only held long enough to look up a tenant's slot
    tenants: Mutex<HashMap<TenantId, Arc<TenantSlot>>>,
}

impl FsSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tenants: Mutex::new(HashMap::new()),
        }
    }

    fn tenant_dir(&self, tenant_id: &TenantId) -> PathBuf {
        self.root.join(tenant_id.as_str())
    }

    fn staging_dir(&self, tenant_id: &TenantId) -> PathBuf {
        self.tenant_dir(tenant_id).join(STAGING_DIR)
    }

    async fn slot(&self, tenant_id: &TenantId) -> Arc<TenantSlot> {
        let mut tenants = self.tenants.lock().await;
        tenants.entry(tenant_id.clone()).or_default().clone()
    }

    /// Reserve the next id and create its (empty) staging directory.
    ///
    /// The next id is derived from the greatest of: the last id this process
    /// allocated, any published id, and any staged id on disk.
    async fn allocate(&self, tenant_id: &TenantId) -> DomainResult<StagingLease> {
        let slot = self.slot(tenant_id).await;
        let mut last = slot.last.lock().await;

        let staging_root = self.staging_dir(tenant_id);
        fs::create_dir_all(&staging_root)
            .await
            .map_err(|e| DomainError::storage("put", e))?;

        let published = scan_ids(&self.tenant_dir(tenant_id), "put").await?;
        let staged = scan_ids(&staging_root, "put").await?;
        let newest_published = published.last().cloned();
        let on_disk = newest_published.clone().max(staged.last().cloned());

        if let Some(newest) = &newest_published {
            let in_flight = slot.in_flight().clone();
            for abandoned in staged
                .iter()
                .filter(|id| *id < newest && !in_flight.contains(*id))
            {
                prune_staged(&staging_root, abandoned).await;
            }
        }

        let snapshot_id = SnapshotId::next_after(last.clone().max(on_disk).as_ref(), Utc::now());
        let path = staging_root.join(snapshot_id.as_str());
        fs::create_dir(&path)
            .await
            .map_err(|e| DomainError::storage("put", e))?;

        slot.in_flight().insert(snapshot_id.clone());
        *last = Some(snapshot_id.clone());
        drop(last);

        Ok(StagingLease {
            slot,
            snapshot_id,
            path,
        })
    }

    async fn write_and_publish(&self, snapshot: &Snapshot, staging: &Path) -> DomainResult<()> {
        let bytes = serde_json::to_vec(snapshot)?;

        let mut file = fs::File::create(staging.join(SNAPSHOT_FILE))
            .await
            .map_err(|e| DomainError::storage("put", e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| DomainError::storage("put", e))?;
        file.sync_all()
            .await
            .map_err(|e| DomainError::storage("put", e))?;
        drop(file);

        let tenant_dir = self.tenant_dir(&snapshot.tenant_id);
        let published = tenant_dir.join(snapshot.snapshot_id.as_str());
        fs::rename(staging, &published)
            .await
            .map_err(|e| DomainError::storage("publish", e))?;

        sync_dir(&tenant_dir).await;
        Ok(())
    }
}

/// Snapshot ids among the subdirectories of `dir`, ascending. A missing
/// directory has none.
async fn scan_ids(dir: &Path, operation: &str) -> DomainResult<Vec<SnapshotId>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DomainError::storage(operation, e)),
    };

    let mut ids = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DomainError::storage(operation, e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map_err(|e| DomainError::storage(operation, e))?
            .is_dir();
        if !is_dir {
            continue;
        }
        if let Some(id) = entry
            .file_name()
            .to_str()
            .and_then(|name| SnapshotId::parse(name).ok())
        {
            ids.push(id);
        }
    }

    ids.sort();
    Ok(ids)
}

/// Remove an abandoned staging directory. Best effort.
async fn prune_staged(staging_root: &Path, snapshot_id: &SnapshotId) {
    match fs::remove_dir_all(staging_root.join(snapshot_id.as_str())).await {
        Ok(()) => debug!(snapshot_id = %snapshot_id, "Removed abandoned staging directory"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(snapshot_id = %snapshot_id, error = %e, "Failed to remove abandoned staging directory"),
    }
}

/// Persist a rename by syncing the parent directory. Best effort.
async fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        let result = match fs::File::open(dir).await {
            Ok(handle) => handle.sync_all().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(dir = %dir.display(), error = %e, "Failed to sync snapshot directory");
        }
    }
    #[cfg(not(unix))]
    let _ = dir;
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    fn name(&self) -> &'static str {
        "fs"
    }

    async fn put(&self, tenant_id: &TenantId, chunks: Vec<EmbeddedChunk>) -> DomainResult<SnapshotId> {
        validate_snapshot_chunks(&chunks)?;

        let lease = self.allocate(tenant_id).await?;
        let snapshot_id = lease.snapshot_id.clone();
        let snapshot = Snapshot::new(snapshot_id.clone(), tenant_id.clone(), chunks);

        if let Err(err) = self.write_and_publish(&snapshot, &lease.path).await {
            if let Err(cleanup) = fs::remove_dir_all(&lease.path).await {
                warn!(
                    tenant = %tenant_id,
                    snapshot_id = %snapshot_id,
                    error = %cleanup,
                    "Failed to remove staging directory"
                );
            }
            return Err(err);
        }

        debug!(
            tenant = %tenant_id,
            snapshot_id = %snapshot_id,
            chunks = snapshot.len(),
            "Published snapshot"
        );
        Ok(snapshot_id)
    }

    async fn latest(&self, tenant_id: &TenantId) -> DomainResult<SnapshotId> {
        self.list_snapshots(tenant_id)
            .await?
            .pop()
            .ok_or_else(|| DomainError::NoIndexForTenant(tenant_id.to_string()))
    }

    async fn load(&self, tenant_id: &TenantId, snapshot_id: &SnapshotId) -> DomainResult<Snapshot> {
        let path = self
            .tenant_dir(tenant_id)
            .join(snapshot_id.as_str())
            .join(SNAPSHOT_FILE);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DomainError::SnapshotNotFound {
                    tenant_id: tenant_id.to_string(),
                    snapshot_id: snapshot_id.to_string(),
                })
            }
            Err(e) => return Err(DomainError::storage("load", e)),
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if &snapshot.snapshot_id != snapshot_id || &snapshot.tenant_id != tenant_id {
            return Err(DomainError::storage(
                "load",
                format!("{} does not belong to {tenant_id}/{snapshot_id}", path.display()),
            ));
        }

        Ok(snapshot)
    }

    async fn list_snapshots(&self, tenant_id: &TenantId) -> DomainResult<Vec<SnapshotId>> {
        scan_ids(&self.tenant_dir(tenant_id), "list").await
    }
}
