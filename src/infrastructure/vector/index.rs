//! Flat in-memory vector index
//!
//! Brute-force cosine scan over one snapshot's embedded chunks. Corpora are
//! per tenant and expected in the thousands of chunks, so a full scan per
//! query is cheap and exact.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{validate_embedded_chunks, EmbeddedChunk, ScoredChunk, Snapshot};

/// Read-only index over a fixed set of embedded chunks
#[derive(Debug, Clone)]
pub struct VectorIndex {
    items: Vec<EmbeddedChunk>,
    norms: Vec<f32>,
    dimension: usize,
}

impl VectorIndex {
    /// Build an index. Pure and linear in the number of items.
    pub fn build(items: Vec<EmbeddedChunk>) -> DomainResult<Self> {
        let dimension = validate_embedded_chunks(&items)?;
        let norms = items.iter().map(|item| magnitude(&item.vector)).collect();

        Ok(Self {
            items,
            norms,
            dimension,
        })
    }

    pub fn from_snapshot(snapshot: Snapshot) -> DomainResult<Self> {
        Self::build(snapshot.chunks)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Shared vector dimension (0 when empty)
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn into_items(self) -> Vec<EmbeddedChunk> {
        self.items
    }

    /// Top-`k` items by cosine similarity to `query`.
    ///
    /// Results are ordered by descending score; equal scores keep ascending
    /// ordinal order. Asking for more items than stored returns them all.
    pub fn search(&self, query: &[f32], k: usize) -> DomainResult<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(DomainError::Validation("k must be greater than 0".to_string()));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(DomainError::Validation(format!(
                "query vector has dimension {}, index has {}",
                query.len(),
                self.dimension
            )));
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::Validation(
                "query vector has a non-finite component".to_string(),
            ));
        }

        let query_norm = magnitude(query);
        let mut scored: Vec<(usize, f32)> = self
            .items
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(i, (item, &norm))| (i, cosine(query, query_norm, &item.vector, norm)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.items[a.0].ordinal().cmp(&self.items[b.0].ordinal()))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk::new(self.items[i].clone(), score))
            .collect())
    }
}

/// Cosine similarity of two equal-length vectors, in `[-1, 1]`.
///
/// A zero-magnitude vector has no direction and scores 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    cosine(a, magnitude(a), b, magnitude(b))
}

fn cosine(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let score = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);

    // Fold -0.0 into 0.0 so total_cmp treats them as a tie
    if score == 0.0 {
        0.0
    } else {
        score
    }
}

fn magnitude(v: &[f32]) -> f32 {
    // Accumulate in f64 to avoid drift on high-dimensional vectors
    let sum: f64 = v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum();
    sum.sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Chunk;

    fn item(ordinal: usize, text: &str, vector: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk::new(Chunk::new(ordinal, text.to_string(), 0, 0), vector)
    }

    fn ordinals(results: &[ScoredChunk]) -> Vec<usize> {
        results.iter().map(ScoredChunk::ordinal).collect()
    }

    #[test]
    fn test_ranks_by_cosine() {
        let index = VectorIndex::build(vec![
            item(0, "east", vec![1.0, 0.0]),
            item(1, "north", vec![0.0, 1.0]),
            item(2, "north-east", vec![1.0, 1.0]),
            item(3, "west", vec![-1.0, 0.0]),
        ])
        .unwrap();

        let results = index.search(&[1.0, 0.1], 4).unwrap();
        assert_eq!(ordinals(&results), vec![0, 2, 1, 3]);
        assert!((results[3].score + 0.995).abs() < 0.01);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_ties_break_by_ordinal() {
        let index = VectorIndex::build(vec![
            item(5, "b", vec![2.0, 0.0]),
            item(1, "a", vec![1.0, 0.0]),
            item(3, "c", vec![0.0, 1.0]),
            item(2, "d", vec![3.0, 0.0]),
        ])
        .unwrap();

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(ordinals(&results), vec![1, 2, 5]);
    }

    #[test]
    fn test_k_bounds() {
        let index = VectorIndex::build(vec![item(0, "a", vec![1.0]), item(1, "b", vec![2.0])]).unwrap();

        assert!(matches!(index.search(&[1.0], 0), Err(DomainError::Validation(_))));
        assert_eq!(index.search(&[1.0], 10).unwrap().len(), 2);
        assert_eq!(index.search(&[1.0], 1).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = VectorIndex::build(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 2.0], 4).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_query() {
        let index = VectorIndex::build(vec![item(0, "a", vec![1.0, 0.0])]).unwrap();

        assert!(matches!(index.search(&[1.0], 1), Err(DomainError::Validation(_))));
        assert!(matches!(
            index.search(&[f32::INFINITY, 0.0], 1),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_build_rejects_mixed_dimensions() {
        let result = VectorIndex::build(vec![item(0, "a", vec![1.0, 0.0]), item(1, "b", vec![1.0])]);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
    }
}
