//! Retrieval and ingestion result models

use std::fmt;

use serde::{Deserialize, Serialize};

use super::chunking::EmbeddedChunk;
use super::snapshot::SnapshotId;

/// Separator placed between retrieved chunk texts in the assembled context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Stage of a single query through the retrieval pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStage {
    /// Finding the snapshot to answer from
    Resolving,
    /// Embedding the question
    Embedding,
    /// Ranking the snapshot's chunks against the question
    Searching,
    /// Joining retrieved chunks into a context block
    AssemblingContext,
    /// Waiting on the generation collaborator
    Generating,
    Done,
}

impl QueryStage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Embedding => "embedding",
            Self::Searching => "searching",
            Self::AssemblingContext => "assembling_context",
            Self::Generating => "generating",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A search hit: the stored chunk and its cosine similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub item: EmbeddedChunk,
    /// Cosine similarity in `[-1, 1]`; higher is more similar
    pub score: f32,
}

impl ScoredChunk {
    pub const fn new(item: EmbeddedChunk, score: f32) -> Self {
        Self { item, score }
    }

    pub const fn ordinal(&self) -> usize {
        self.item.chunk.ordinal
    }

    pub fn text(&self) -> &str {
        &self.item.chunk.text
    }
}

/// Join chunk texts in result order, separated by a blank line
pub fn assemble_context(results: &[ScoredChunk]) -> String {
    results
        .iter()
        .map(ScoredChunk::text)
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Output of the retrieval half of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedContext {
    /// Snapshot the results were drawn from
    pub snapshot_id: SnapshotId,
    /// Ranked hits, most similar first
    pub results: Vec<ScoredChunk>,
    /// Hits joined for the generation prompt
    pub context: String,
}

/// Final answer together with the corpus version that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalAnswer {
    /// Raw text returned by the generation collaborator
    pub answer: String,
    pub snapshot_id: SnapshotId,
    pub sources: Vec<ScoredChunk>,
}

/// Summary of a completed ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub snapshot_id: SnapshotId,
    pub document_count: usize,
    pub chunk_count: usize,
    pub dimension: usize,
}
