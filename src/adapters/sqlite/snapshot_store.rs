//! SQLite-backed snapshot store.
//!
//! `put` runs in two steps. The id is reserved under `BEGIN IMMEDIATE`,
//! which takes SQLite's write lock before reading the tenant's high-water
//! mark, so allocation stays monotonic across processes sharing the file.
//! Chunks are then inserted and the header flipped to `published = 1` in a
//! second transaction. Readers filter on `published = 1`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use super::connection::{create_pool, create_test_pool, database_url};
use super::migrations::{all_embedded_migrations, Migrator};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    validate_snapshot_chunks, Chunk, EmbeddedChunk, Snapshot, SnapshotId, TenantId,
};
use crate::domain::ports::SnapshotStore;

/// Snapshot store over a SQLite database
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `path` and apply migrations
    pub async fn open(path: &str) -> DomainResult<Self> {
        let pool = create_pool(&database_url(path), None)
            .await
            .map_err(|e| DomainError::storage("open", e))?;
        Self::migrated(pool).await
    }

    /// Fresh in-memory database, for tests
    pub async fn in_memory() -> DomainResult<Self> {
        let pool = create_test_pool()
            .await
            .map_err(|e| DomainError::storage("open", e))?;
        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> DomainResult<Self> {
        Migrator::new(pool.clone())
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .map_err(|e| DomainError::storage("migrate", e))?;
        Ok(Self::new(pool))
    }

    /// Reserve the next id for a tenant as an unpublished header row
    async fn reserve(&self, tenant_id: &TenantId, dimension: usize, chunk_count: usize) -> DomainResult<SnapshotId> {
        let mut conn = self.pool.acquire().await.map_err(put_failed)?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(put_failed)?;

        match reserve_locked(&mut conn, tenant_id, dimension, chunk_count).await {
            Ok(snapshot_id) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(put_failed)?;
                Ok(snapshot_id)
            }
            Err(err) => {
                if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    warn!(tenant = %tenant_id, error = %rollback, "Rollback of id reservation failed");
                }
                Err(err)
            }
        }
    }

    async fn publish(&self, tenant_id: &TenantId, snapshot_id: &SnapshotId, chunks: &[EmbeddedChunk]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await.map_err(put_failed)?;

        for item in chunks {
            sqlx::query(
                "INSERT INTO snapshot_chunks
                    (tenant_id, snapshot_id, ordinal, source, start_offset, overlap, content, embedding)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(tenant_id.as_str())
            .bind(snapshot_id.as_str())
            .bind(to_i64(item.chunk.ordinal)?)
            .bind(item.chunk.source.as_deref())
            .bind(to_i64(item.chunk.start_offset)?)
            .bind(to_i64(item.chunk.overlap)?)
            .bind(&item.chunk.text)
            .bind(embedding_to_bytes(&item.vector))
            .execute(&mut *tx)
            .await
            .map_err(put_failed)?;
        }

        sqlx::query("UPDATE snapshots SET published = 1 WHERE tenant_id = ? AND snapshot_id = ?")
            .bind(tenant_id.as_str())
            .bind(snapshot_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(put_failed)?;

        tx.commit().await.map_err(put_failed)
    }

    /// Remove an unpublished reservation. The allocation mark is kept.
    async fn release(&self, tenant_id: &TenantId, snapshot_id: &SnapshotId) {
        let result = sqlx::query("DELETE FROM snapshots WHERE tenant_id = ? AND snapshot_id = ? AND published = 0")
            .bind(tenant_id.as_str())
            .bind(snapshot_id.as_str())
            .execute(&self.pool)
            .await;

        if let Err(e) = result {
            warn!(
                tenant = %tenant_id,
                snapshot_id = %snapshot_id,
                error = %e,
                "Failed to release snapshot reservation"
            );
        }
    }
}

async fn reserve_locked(
    conn: &mut SqliteConnection,
    tenant_id: &TenantId,
    dimension: usize,
    chunk_count: usize,
) -> DomainResult<SnapshotId> {
    let last: Option<String> = sqlx::query_scalar(
        "SELECT MAX(id) FROM (
            SELECT last_snapshot_id AS id FROM snapshot_allocations WHERE tenant_id = ?1
            UNION ALL
            SELECT snapshot_id AS id FROM snapshots WHERE tenant_id = ?1
        )",
    )
    .bind(tenant_id.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(put_failed)?;

    let last = last.map(|raw| parse_stored_id(&raw, "put")).transpose()?;
    let snapshot_id = SnapshotId::next_after(last.as_ref(), Utc::now());

    sqlx::query(
        "INSERT INTO snapshots (tenant_id, snapshot_id, dimension, chunk_count, created_at, published)
         VALUES (?, ?, ?, ?, ?, 0)",
    )
    .bind(tenant_id.as_str())
    .bind(snapshot_id.as_str())
    .bind(to_i64(dimension)?)
    .bind(to_i64(chunk_count)?)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(put_failed)?;

    sqlx::query(
        "INSERT INTO snapshot_allocations (tenant_id, last_snapshot_id) VALUES (?, ?)
         ON CONFLICT (tenant_id) DO UPDATE SET last_snapshot_id = excluded.last_snapshot_id",
    )
    .bind(tenant_id.as_str())
    .bind(snapshot_id.as_str())
    .execute(&mut *conn)
    .await
    .map_err(put_failed)?;

    Ok(snapshot_id)
}

fn put_failed(err: sqlx::Error) -> DomainError {
    DomainError::storage("put", err)
}

fn to_i64(value: usize) -> DomainResult<i64> {
    i64::try_from(value).map_err(|_| DomainError::Validation(format!("{value} does not fit in a SQLite integer")))
}

fn to_usize(value: i64, column: &str) -> DomainResult<usize> {
    usize::try_from(value).map_err(|_| DomainError::storage("load", format!("negative {column}: {value}")))
}

fn parse_stored_id(raw: &str, operation: &str) -> DomainResult<SnapshotId> {
    SnapshotId::parse(raw).map_err(|_| DomainError::storage(operation, format!("corrupt snapshot id '{raw}'")))
}

/// Serialize an embedding vector as little-endian f32 bytes
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize an embedding vector from little-endian f32 bytes
pub fn bytes_to_embedding(bytes: &[u8]) -> DomainResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(DomainError::storage(
            "load",
            format!("embedding blob length {} is not a multiple of 4", bytes.len()),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn row_to_chunk(row: &SqliteRow) -> DomainResult<EmbeddedChunk> {
    let chunk = Chunk::new(
        to_usize(row.try_get("ordinal")?, "ordinal")?,
        row.try_get("content")?,
        to_usize(row.try_get("start_offset")?, "start_offset")?,
        to_usize(row.try_get("overlap")?, "overlap")?,
    )
    .with_source(row.try_get("source")?);

    let blob: Vec<u8> = row.try_get("embedding")?;
    Ok(EmbeddedChunk::new(chunk, bytes_to_embedding(&blob)?))
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn put(&self, tenant_id: &TenantId, chunks: Vec<EmbeddedChunk>) -> DomainResult<SnapshotId> {
        let dimension = validate_snapshot_chunks(&chunks)?;

        let snapshot_id = self.reserve(tenant_id, dimension, chunks.len()).await?;
        if let Err(err) = self.publish(tenant_id, &snapshot_id, &chunks).await {
            self.release(tenant_id, &snapshot_id).await;
            return Err(err);
        }

        debug!(
            tenant = %tenant_id,
            snapshot_id = %snapshot_id,
            chunks = chunks.len(),
            "Published snapshot"
        );
        Ok(snapshot_id)
    }

    async fn latest(&self, tenant_id: &TenantId) -> DomainResult<SnapshotId> {
        let latest: Option<String> = sqlx::query_scalar(
            "SELECT MAX(snapshot_id) FROM snapshots WHERE tenant_id = ? AND published = 1",
        )
        .bind(tenant_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage("latest", e))?;

        match latest {
            Some(raw) => parse_stored_id(&raw, "latest"),
            None => Err(DomainError::NoIndexForTenant(tenant_id.to_string())),
        }
    }

    async fn load(&self, tenant_id: &TenantId, snapshot_id: &SnapshotId) -> DomainResult<Snapshot> {
        let header = sqlx::query(
            "SELECT dimension, chunk_count, created_at FROM snapshots
             WHERE tenant_id = ? AND snapshot_id = ? AND published = 1",
        )
        .bind(tenant_id.as_str())
        .bind(snapshot_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage("load", e))?
        .ok_or_else(|| DomainError::SnapshotNotFound {
            tenant_id: tenant_id.to_string(),
            snapshot_id: snapshot_id.to_string(),
        })?;

        let dimension = to_usize(header.try_get("dimension")?, "dimension")?;
        let chunk_count = to_usize(header.try_get("chunk_count")?, "chunk_count")?;
        let created_at: String = header.try_get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| DomainError::storage("load", e))?
            .with_timezone(&Utc);

        let rows = sqlx::query(
            "SELECT ordinal, source, start_offset, overlap, content, embedding FROM snapshot_chunks
             WHERE tenant_id = ? AND snapshot_id = ? ORDER BY ordinal",
        )
        .bind(tenant_id.as_str())
        .bind(snapshot_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage("load", e))?;

        let chunks = rows.iter().map(row_to_chunk).collect::<DomainResult<Vec<_>>>()?;
        if chunks.len() != chunk_count {
            return Err(DomainError::storage(
                "load",
                format!("expected {chunk_count} chunks, found {}", chunks.len()),
            ));
        }

        Ok(Snapshot {
            snapshot_id: snapshot_id.clone(),
            tenant_id: tenant_id.clone(),
            created_at,
            dimension,
            chunks,
        })
    }

    async fn list_snapshots(&self, tenant_id: &TenantId) -> DomainResult<Vec<SnapshotId>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT snapshot_id FROM snapshots WHERE tenant_id = ? AND published = 1 ORDER BY snapshot_id",
        )
        .bind(tenant_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage("list", e))?;

        rows.iter().map(|raw| parse_stored_id(raw, "list")).collect()
    }
}
