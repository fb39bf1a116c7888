use docsnap::domain::models::{Chunk, ChunkingConfig};
use docsnap::infrastructure::vector::{reassemble, Chunker};
use proptest::prelude::*;

/// Chunking parameters with `0 < overlap < max`
fn params() -> impl Strategy<Value = (usize, usize)> {
    (2usize..48).prop_flat_map(|max| (Just(max), 1..max))
}

/// Text rich in every separator tier, plus multi-byte characters
fn text() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-cé ,.!?\t\n]{0,300}").expect("valid regex")
}

fn chunker(max: usize, overlap: usize) -> Chunker {
    Chunker::new(ChunkingConfig::new(max, overlap)).expect("valid chunking parameters")
}

fn tail(chunk: &Chunk, n: usize) -> String {
    let len = chunk.char_len();
    chunk.text.chars().skip(len - n).collect()
}

fn head(chunk: &Chunk, n: usize) -> String {
    chunk.text.chars().take(n).collect()
}

proptest! {
    /// Property: dropping each chunk's overlap rebuilds the original text
    #[test]
    fn prop_reassembly_round_trips((max, overlap) in params(), text in text()) {
        let chunks = chunker(max, overlap).split(&text);
        prop_assert_eq!(reassemble(&chunks), text);
    }

    /// Property: consecutive chunks share between 1 and `overlap` characters,
    /// and the shared characters are identical
    #[test]
    fn prop_overlap_invariant((max, overlap) in params(), text in text()) {
        let chunks = chunker(max, overlap).split(&text);

        if let Some(first) = chunks.first() {
            prop_assert_eq!(first.overlap, 0);
        }
        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            prop_assert!(next.overlap > 0 && next.overlap <= overlap);
            prop_assert_eq!(tail(prev, next.overlap), head(next, next.overlap));
        }
    }

    /// Property: chunks are non-empty, bounded, numbered, and start one step apart
    #[test]
    fn prop_chunks_are_bounded_and_stepped((max, overlap) in params(), text in text()) {
        let chunks = chunker(max, overlap).split(&text);

        prop_assert_eq!(chunks.is_empty(), text.is_empty());
        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert_eq!(chunk.ordinal, i);
            prop_assert!(chunk.char_len() > 0);
            prop_assert!(chunk.char_len() <= max);
            prop_assert_eq!(chunk.start_offset, i * (max - overlap));
        }
    }

    /// Property: splitting is deterministic
    #[test]
    fn prop_split_is_deterministic((max, overlap) in params(), text in text()) {
        let splitter = chunker(max, overlap);
        prop_assert_eq!(splitter.split(&text), splitter.split(&text));
    }
}

#[test]
fn test_reference_example() {
    let chunks = chunker(10, 5).split("AAAAABBBBBCCCCC");
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["AAAAABBBBB", "BBBBBCCCCC"]);
}
