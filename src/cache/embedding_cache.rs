use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

/// Thread-safe LRU cache for query embeddings
///
/// Keys combine the embedding model and the query text, so vectors from a
/// different model are never served after a provider switch.
pub struct EmbeddingCache {
    cache: Mutex<LruCache<(String, String), Vec<f32>>>,
}

impl EmbeddingCache {
    /// Create a new embedding cache; a capacity of 0 is treated as 1
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    // A panic while holding the lock leaves the map intact; keep using it.
    fn lock(&self) -> MutexGuard<'_, LruCache<(String, String), Vec<f32>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get a cached embedding for a query under `model`
    pub fn get(&self, model: &str, query: &str) -> Option<Vec<f32>> {
        self.lock()
            .get(&(model.to_string(), query.to_string()))
            .cloned()
    }

    /// Store an embedding for a query under `model`
    pub fn put(&self, model: &str, query: &str, embedding: Vec<f32>) {
        self.lock()
            .put((model.to_string(), query.to_string()), embedding);
    }
}
