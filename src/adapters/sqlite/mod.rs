//! SQLite database adapters for snapshot persistence.

pub mod connection;
pub mod migrations;
pub mod snapshot_store;

pub use connection::{create_pool, create_test_pool, database_url, ConnectionError, PoolConfig};
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use snapshot_store::{bytes_to_embedding, embedding_to_bytes, SqliteSnapshotStore};
