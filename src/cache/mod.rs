pub mod embedding_cache;
pub mod fragment_index;

pub use embedding_cache::EmbeddingCache;
pub use fragment_index::{cosine_similarity, FragmentIndex, ScoredFragment};
