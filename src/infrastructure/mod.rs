//! Infrastructure layer module
//!
//! Supporting machinery behind the services:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Chunking, flat vector search, and the built-index cache
//!
//! External systems live in `crate::adapters`.

pub mod config;
pub mod logging;
pub mod vector;
