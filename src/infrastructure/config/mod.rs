//! Layered configuration: defaults, project YAML, then `DOCSNAP_*` env.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader, OPENAI_API_KEY_ENV};
