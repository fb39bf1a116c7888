//! Vector infrastructure components
//!
//! Text chunking, the flat cosine index, and the shared index cache used
//! for semantic retrieval.

pub mod chunker;
pub mod index;
pub mod index_cache;

pub use chunker::{reassemble, Chunker};
pub use index::{cosine_similarity, VectorIndex};
pub use index_cache::IndexCache;
