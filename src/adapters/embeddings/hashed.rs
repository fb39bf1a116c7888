//! Offline hashed bag-of-words embedder.
//!
//! Lowercased alphanumeric tokens are hashed (FNV-1a) into a fixed number of
//! buckets and the counts are L2-normalized. Texts that share words get a
//! positive cosine similarity, which is enough for local use and tests
//! without network access or model downloads.

use async_trait::async_trait;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::EmbeddingProvider;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Deterministic local embedding provider
#[derive(Debug, Clone)]
pub struct HashedEmbeddingProvider {
    dimension: usize,
    max_batch_size: usize,
}

impl HashedEmbeddingProvider {
    pub fn new(dimension: usize, max_batch_size: usize) -> DomainResult<Self> {
        if dimension == 0 {
            return Err(DomainError::Configuration(
                "hashed embedding dimension must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            dimension,
            max_batch_size: max_batch_size.max(1),
        })
    }

    /// Embed one text. Text without any word characters maps to the zero vector.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];

        for token in tokens(text) {
            let bucket = (fnv1a(token.as_bytes()) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt() as f32;
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingProvider for HashedEmbeddingProvider {
    fn name(&self) -> &'static str {
        "hashed"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}
