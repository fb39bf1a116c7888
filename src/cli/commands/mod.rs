//! CLI command implementations.

pub mod ask;
pub mod ingest;
pub mod search;
pub mod snapshots;
