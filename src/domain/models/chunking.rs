//! Text chunking domain models
//!
//! Models for splitting documents into overlapping character windows
//! and pairing them with their embedding vectors.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Configuration for document chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum size of each chunk in characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Maximum number of characters shared with the previous chunk
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

const fn default_max_chars() -> usize {
    10_000
}

const fn default_overlap_chars() -> usize {
    1_000
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

impl ChunkingConfig {
    pub const fn new(max_chars: usize, overlap_chars: usize) -> Self {
        Self {
            max_chars,
            overlap_chars,
        }
    }

    /// Validate the chunking configuration: `0 < overlap_chars < max_chars`
    pub fn validate(&self) -> DomainResult<()> {
        if self.overlap_chars == 0 {
            return Err(DomainError::Configuration(
                "overlap_chars must be greater than 0".to_string(),
            ));
        }

        if self.overlap_chars >= self.max_chars {
            return Err(DomainError::Configuration(format!(
                "overlap_chars ({}) must be less than max_chars ({})",
                self.overlap_chars, self.max_chars
            )));
        }

        Ok(())
    }

    /// Distance between the starts of consecutive chunks
    pub const fn step(&self) -> usize {
        self.max_chars - self.overlap_chars
    }
}

/// A document handed to ingestion as plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Display name of the document (file name, upload name)
    pub name: Option<String>,

    /// Extracted plain text
    pub text: String,
}

impl SourceDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            name: None,
            text: text.into(),
        }
    }

    pub fn named(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            text: text.into(),
        }
    }
}

/// A contiguous slice of source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position within the snapshot (0-based), used for tie-breaking
    pub ordinal: usize,

    /// The text content of this chunk
    pub text: String,

    /// Start position in the source document (character offset)
    pub start_offset: usize,

    /// Number of leading characters shared with the previous chunk
    pub overlap: usize,

    /// Name of the source document, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Chunk {
    pub fn new(ordinal: usize, text: String, start_offset: usize, overlap: usize) -> Self {
        Self {
            ordinal,
            text,
            start_offset,
            overlap,
            source: None,
        }
    }

    /// Attach the source document name
    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    /// Length of the chunk in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The part of the chunk that is not shared with its predecessor
    pub fn head(&self) -> &str {
        match self.text.char_indices().nth(self.overlap) {
            Some((byte, _)) => &self.text[byte..],
            None => "",
        }
    }
}

/// A chunk paired with its embedding vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,

    /// The embedding vector
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    pub const fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self { chunk, vector }
    }

    pub const fn ordinal(&self) -> usize {
        self.chunk.ordinal
    }

    pub fn text(&self) -> &str {
        &self.chunk.text
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_config_default() {
        let config = ChunkingConfig::default();
        assert_eq!(config.max_chars, 10_000);
        assert_eq!(config.overlap_chars, 1_000);
        assert_eq!(config.step(), 9_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chunking_config_validation() {
        assert!(matches!(
            ChunkingConfig::new(10, 0).validate(),
            Err(DomainError::Configuration(_))
        ));
        assert!(matches!(
            ChunkingConfig::new(10, 10).validate(),
            Err(DomainError::Configuration(_))
        ));
        assert!(matches!(
            ChunkingConfig::new(10, 15).validate(),
            Err(DomainError::Configuration(_))
        ));
        assert!(ChunkingConfig::new(10, 9).validate().is_ok());
    }

    #[test]
    fn test_chunk_head_skips_overlap() {
        let chunk = Chunk::new(1, "BBBBBCCCCC".to_string(), 5, 5);
        assert_eq!(chunk.head(), "CCCCC");

        let first = Chunk::new(0, "héllo".to_string(), 0, 0);
        assert_eq!(first.head(), "héllo");
        assert_eq!(first.char_len(), 5);
    }

    #[test]
    fn test_embedded_chunk_serializes_flat() {
        let embedded = EmbeddedChunk::new(
            Chunk::new(0, "cats".to_string(), 0, 0).with_source(Some("a.txt".to_string())),
            vec![1.0, 0.0],
        );
        let json = serde_json::to_value(&embedded).unwrap();
        assert_eq!(json["ordinal"], 0);
        assert_eq!(json["text"], "cats");
        assert_eq!(json["source"], "a.txt");
        assert_eq!(json["vector"], serde_json::json!([1.0, 0.0]));

        let back: EmbeddedChunk = serde_json::from_value(json).unwrap();
        assert_eq!(back, embedded);
    }
}
