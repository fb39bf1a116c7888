use docsnap::domain::models::{Chunk, EmbeddedChunk};
use docsnap::infrastructure::vector::VectorIndex;
use proptest::prelude::*;

const DIM: usize = 4;

/// Small integer components so exact score ties are common
fn vector() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec((-3i8..=3).prop_map(f32::from), DIM)
}

fn items() -> impl Strategy<Value = Vec<EmbeddedChunk>> {
    proptest::collection::vec(vector(), 0..40).prop_map(|vectors| {
        vectors
            .into_iter()
            .enumerate()
            .map(|(i, v)| EmbeddedChunk::new(Chunk::new(i, format!("chunk {i}"), 0, 0), v))
            .collect()
    })
}

proptest! {
    /// Property: results are ordered by non-increasing score, ties by ascending ordinal
    #[test]
    fn prop_results_are_ranked(items in items(), query in vector(), k in 1usize..50) {
        let n = items.len();
        let index = VectorIndex::build(items).unwrap();
        let results = index.search(&query, k).unwrap();

        prop_assert_eq!(results.len(), k.min(n));
        for pair in results.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.score >= b.score);
            if a.score == b.score {
                prop_assert!(a.ordinal() < b.ordinal());
            }
        }
        for hit in &results {
            prop_assert!((-1.0..=1.0).contains(&hit.score));
        }
    }

    /// Property: a smaller k returns a prefix of a larger k
    #[test]
    fn prop_top_k_is_prefix(items in items(), query in vector(), k in 1usize..20) {
        let index = VectorIndex::build(items).unwrap();
        let small = index.search(&query, k).unwrap();
        let large = index.search(&query, k + 5).unwrap();

        let small_ordinals: Vec<usize> = small.iter().map(|h| h.ordinal()).collect();
        let large_ordinals: Vec<usize> = large.iter().take(small.len()).map(|h| h.ordinal()).collect();
        prop_assert_eq!(small_ordinals, large_ordinals);
    }
}
