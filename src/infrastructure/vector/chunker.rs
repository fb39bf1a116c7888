//! Text chunking implementation
//!
//! Splits text into overlapping character windows, preferring to end each
//! window on the strongest nearby separator (paragraph, line, sentence,
//! whitespace) before falling back to a hard cut.

use std::iter;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Chunk, ChunkingConfig, SourceDocument};

/// Separator tiers in priority order. Within a tier the rightmost match wins.
const SEPARATOR_TIERS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" ", "\t"]];

/// Deterministic overlapping text splitter
///
/// Each chunk starts `max_chars - overlap_chars` characters after the
/// previous one and ends on the best separator inside
/// `(next_start, start + max_chars]`, so consecutive chunks always share
/// between 1 and `overlap_chars` characters.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    /// Create a chunker, rejecting invalid parameters up front
    pub fn new(config: ChunkingConfig) -> DomainResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Split a single text; ordinals start at 0
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        self.split_from(text, 0, None)
    }

    /// Split several documents, numbering chunks continuously across them
    pub fn split_documents(&self, documents: &[SourceDocument]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            let next = self.split_from(&document.text, chunks.len(), document.name.as_deref());
            chunks.extend(next);
        }
        chunks
    }

    fn split_from(&self, text: &str, first_ordinal: usize, source: Option<&str>) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, including the end of the text
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut start = 0;
        let mut prev_end = 0;

        loop {
            let end = if total - start <= self.config.max_chars {
                total
            } else {
                self.boundary(text, &bounds, start)
            };
            let overlap = if chunks.is_empty() { 0 } else { prev_end - start };

            chunks.push(
                Chunk::new(
                    first_ordinal + chunks.len(),
                    text[bounds[start]..bounds[end]].to_string(),
                    start,
                    overlap,
                )
                .with_source(source.map(str::to_string)),
            );

            if end == total {
                break;
            }
            prev_end = end;
            start += self.config.step();
        }

        chunks
    }

    /// Pick the end (char index) of the chunk starting at `start`.
    ///
    /// The end must lie after the next chunk's start so the two overlap.
    fn boundary(&self, text: &str, bounds: &[usize], start: usize) -> usize {
        let next_start = start + self.config.step();
        let hard_end = start + self.config.max_chars;
        let window = &text[bounds[start]..bounds[hard_end]];

        for tier in SEPARATOR_TIERS {
            let best = tier
                .iter()
                .filter_map(|sep| window.rfind(sep).map(|pos| bounds[start] + pos + sep.len()))
                .max();

            if let Some(byte_end) = best {
                let end = bounds.partition_point(|&b| b < byte_end);
                if end > next_start {
                    return end;
                }
            }
        }

        hard_end
    }
}

/// Rebuild the source text of one document by dropping each chunk's overlap
pub fn reassemble(chunks: &[Chunk]) -> String {
    chunks.iter().map(Chunk::head).collect()
}
