//! Infrastructure adapters for external systems.

pub mod embeddings;
pub mod fs;
pub mod generation;
pub mod sqlite;
