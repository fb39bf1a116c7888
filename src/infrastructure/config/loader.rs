use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Environment variable consulted when no API key is configured
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid chunking: {0}")]
    InvalidChunking(String),

    #[error("Invalid top_k: 0. Must be at least 1")]
    InvalidTopK,

    #[error("Invalid {0}.timeout_secs: 0. Must be at least 1")]
    ZeroTimeout(&'static str),

    #[error("Invalid embedding dimension: 0. Must be at least 1")]
    InvalidDimension,

    #[error("Invalid max_batch_size: 0. Must be at least 1")]
    InvalidBatchSize,

    #[error("Invalid embedding concurrency: 0. Must be at least 1")]
    InvalidConcurrency,

    #[error("Invalid temperature: {0}. Must be between 0.0 and 2.0")]
    InvalidTemperature(f32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Storage path cannot be empty")]
    EmptyStoragePath,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .docsnap/config.yaml (project config)
    /// 3. .docsnap/local.yaml (local overrides, optional)
    /// 4. Environment variables (DOCSNAP_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".docsnap/config.yaml"))
            .merge(Yaml::file(".docsnap/local.yaml"));

        Self::finish(figment).context("Failed to extract configuration from figment")
    }

    /// Load configuration from a specific file in place of the project files.
    /// Environment overrides still apply.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path));

        Self::finish(figment).context(format!("Failed to load config from {}", path.display()))
    }

    fn finish(figment: Figment) -> Result<Config> {
        let mut config: Config = figment
            .merge(Env::prefixed("DOCSNAP_").split("__"))
            .extract()?;

        Self::resolve_api_keys(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Fill missing provider API keys from `OPENAI_API_KEY`
    pub fn resolve_api_keys(config: &mut Config) {
        let fallback = std::env::var(OPENAI_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());

        if config.embedding.api_key.is_none() {
            config.embedding.api_key.clone_from(&fallback);
        }
        if config.generation.api_key.is_none() {
            config.generation.api_key = fallback;
        }
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.storage.path.trim().is_empty() {
            return Err(ConfigError::EmptyStoragePath);
        }

        config
            .chunking
            .validate()
            .map_err(|e| ConfigError::InvalidChunking(e.to_string()))?;

        if config.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidTopK);
        }

        // Embedding
        if config.embedding.dimension == 0 {
            return Err(ConfigError::InvalidDimension);
        }
        if config.embedding.max_batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if config.embedding.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if config.embedding.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("embedding"));
        }

        // Generation
        if config.generation.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("generation"));
        }
        if !(0.0..=2.0).contains(&config.generation.temperature) {
            return Err(ConfigError::InvalidTemperature(config.generation.temperature));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
