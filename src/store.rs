//! Embedding store: persisted fragment vectors plus the in-memory index
//! that answers similarity queries.

use crate::cache::{EmbeddingCache, FragmentIndex};
use crate::corpus::{FragmentMetadata, SchemaFragment};
use crate::db::Db;
use crate::embeddings::storage::{self, FragmentRow};
use crate::embeddings::EmbeddingProvider;
use crate::error::{AiblockError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of an upsert run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpsertReport {
    pub total: usize,
    pub embedded: usize,
    pub skipped: usize,
    pub pruned: usize,
}

/// A fragment returned by similarity search
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub content: String,
    pub metadata: FragmentMetadata,
    pub score: f32,
    /// 1-based position in the result set
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub collection: String,
    pub count: usize,
    pub status: &'static str,
    pub embedding_model: String,
}

pub struct EmbeddingStore {
    db: Db,
    collection: String,
    provider: Arc<dyn EmbeddingProvider>,
    index: FragmentIndex,
    query_cache: EmbeddingCache,
    batch_size: usize,
}

impl EmbeddingStore {
    pub fn new(
        db: Db,
        collection: impl Into<String>,
        provider: Arc<dyn EmbeddingProvider>,
        cache_capacity: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            db,
            collection: collection.into(),
            provider,
            index: FragmentIndex::new(),
            query_cache: EmbeddingCache::new(cache_capacity),
            batch_size: batch_size.max(1),
        }
    }

    pub fn embedding_model(&self) -> &str {
        self.provider.model_name()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ensure every fragment has a current stored vector.
    ///
    /// Fragments whose text hash and model already match are skipped, rows
    /// for ids not in `fragments` are deleted, and the index is reloaded.
    pub async fn upsert(&self, fragments: &[SchemaFragment]) -> Result<UpsertReport> {
        let start = Instant::now();
        let model = self.provider.model_name().to_string();
        let states = storage::load_fragment_states(&self.db, &self.collection).await?;

        let mut pending: Vec<(&SchemaFragment, String, String)> = Vec::new();
        for fragment in fragments {
            let document = fragment.search_document();
            let hash = storage::content_hash(&document);
            let current = states
                .get(&fragment.id)
                .map(|state| state.is_current(&hash, &model))
                .unwrap_or(false);
            if !current {
                pending.push((fragment, document, hash));
            }
        }

        let mut rows = Vec::with_capacity(pending.len());
        for batch in pending.chunks(self.batch_size) {
            let documents: Vec<String> = batch.iter().map(|(_, doc, _)| doc.clone()).collect();
            let vectors = self.provider.embed_batch(&documents).await?;
            if vectors.len() != batch.len() {
                return Err(AiblockError::ServiceUnavailable(format!(
                    "{} returned {} embeddings for {} fragments",
                    model,
                    vectors.len(),
                    batch.len()
                )));
            }
            for ((fragment, _, hash), embedding) in batch.iter().zip(vectors) {
                rows.push(FragmentRow {
                    fragment: (*fragment).clone(),
                    content_hash: hash.clone(),
                    embedding_model: model.clone(),
                    embedding,
                });
            }
        }

        let embedded = storage::write_fragments(&self.db, &self.collection, rows).await?;
        let keep: HashSet<String> = fragments.iter().map(|f| f.id.clone()).collect();
        let pruned = storage::prune_fragments(&self.db, &self.collection, keep).await?;
        self.reload_index().await?;

        let report = UpsertReport {
            total: fragments.len(),
            embedded,
            skipped: fragments.len() - pending.len(),
            pruned,
        };
        log::info!(
            "Upserted collection {}: {} embedded, {} unchanged, {} pruned in {:?}",
            self.collection,
            report.embedded,
            report.skipped,
            report.pruned,
            start.elapsed()
        );
        Ok(report)
    }

    /// Load the vectors for the active model from the database into memory
    pub async fn reload_index(&self) -> Result<usize> {
        let entries = storage::load_embedded_fragments(
            &self.db,
            &self.collection,
            self.provider.model_name(),
        )
        .await?;
        let count = entries.len();
        self.index.replace(entries);
        Ok(count)
    }

    /// Return at most `k` fragments most similar to `query`, best first
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embed_query(query).await?;
        let results = self
            .index
            .top_k(&query_vec, k)
            .into_iter()
            .enumerate()
            .map(|(i, scored)| RetrievedChunk {
                id: scored.fragment.id,
                content: scored.fragment.content,
                metadata: scored.fragment.metadata,
                score: scored.score,
                rank: i + 1,
            })
            .collect::<Vec<_>>();

        log::debug!("Retrieved {} fragments for {:?}", results.len(), query);
        Ok(results)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let model = self.provider.model_name();
        if let Some(cached) = self.query_cache.get(model, query) {
            return Ok(cached);
        }
        let embedding = self.provider.embed(query).await?;
        self.query_cache.put(model, query, embedding.clone());
        Ok(embedding)
    }

    /// Number of fragments in the in-memory index
    pub fn count(&self) -> usize {
        self.index.len()
    }

    pub fn stats(&self) -> StoreStats {
        let count = self.count();
        StoreStats {
            collection: self.collection.clone(),
            count,
            status: if count > 0 { "ready" } else { "empty" },
            embedding_model: self.embedding_model().to_string(),
        }
    }
}
