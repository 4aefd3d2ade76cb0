//! In-memory index of fragment embeddings for similarity search.
//!
//! Populated from the store after each upsert; searches score every entry
//! in memory and never touch the database.

use crate::corpus::SchemaFragment;
use std::cmp::Ordering;
use std::sync::{RwLock, RwLockReadGuard};

/// A fragment with its similarity to a query vector
#[derive(Debug, Clone)]
pub struct ScoredFragment {
    pub fragment: SchemaFragment,
    pub score: f32,
}

pub struct FragmentIndex {
    entries: RwLock<Vec<(SchemaFragment, Vec<f32>)>>,
}

impl FragmentIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<(SchemaFragment, Vec<f32>)>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Swap in a new set of entries atomically
    pub fn replace(&self, entries: Vec<(SchemaFragment, Vec<f32>)>) {
        let count = entries.len();
        *self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = entries;
        log::info!("Fragment index loaded: {} embeddings", count);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Score the query against every entry and return the best `k`.
    ///
    /// Sorted by score descending, ties broken by fragment id ascending.
    /// Entries whose dimension differs from the query are skipped.
    pub fn top_k(&self, query_vec: &[f32], k: usize) -> Vec<ScoredFragment> {
        if k == 0 {
            return Vec::new();
        }

        let entries = self.read();
        let mut scored: Vec<(f32, &SchemaFragment)> = entries
            .iter()
            .filter(|(_, emb)| emb.len() == query_vec.len())
            .map(|(fragment, emb)| (cosine_similarity(query_vec, emb), fragment))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(score, fragment)| ScoredFragment {
                fragment: fragment.clone(),
                score,
            })
            .collect()
    }
}

impl Default for FragmentIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::FragmentMetadata;

    fn fragment(id: &str) -> SchemaFragment {
        SchemaFragment {
            id: id.to_string(),
            content: format!("content of {}", id),
            metadata: FragmentMetadata {
                category: "type_definition".to_string(),
                graphql_type: None,
                related_types: vec![],
                examples: vec![],
                keywords: vec![],
            },
        }
    }

    #[test]
    fn test_empty_index() {
        let index = FragmentIndex::new();
        assert!(index.is_empty());
        assert!(index.top_k(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_top_k_orders_by_score() {
        let index = FragmentIndex::new();
        index.replace(vec![
            (fragment("far"), vec![0.0, 1.0]),
            (fragment("near"), vec![1.0, 0.1]),
            (fragment("exact"), vec![1.0, 0.0]),
        ]);

        let results = index.top_k(&[1.0, 0.0], 2);
        let ids: Vec<&str> = results.iter().map(|r| r.fragment.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_top_k_ties_break_by_id() {
        let index = FragmentIndex::new();
        index.replace(vec![
            (fragment("b"), vec![1.0, 0.0]),
            (fragment("c"), vec![2.0, 0.0]),
            (fragment("a"), vec![3.0, 0.0]),
        ]);

        let ids: Vec<String> = index
            .top_k(&[1.0, 0.0], 3)
            .into_iter()
            .map(|r| r.fragment.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_top_k_bounds() {
        let index = FragmentIndex::new();
        index.replace(vec![
            (fragment("one"), vec![1.0, 0.0]),
            (fragment("two"), vec![0.0, 1.0]),
        ]);

        assert_eq!(index.top_k(&[1.0, 1.0], 10).len(), 2);
        assert!(index.top_k(&[1.0, 1.0], 0).is_empty());
    }

    #[test]
    fn test_top_k_skips_mismatched_dimensions() {
        let index = FragmentIndex::new();
        index.replace(vec![
            (fragment("short"), vec![1.0]),
            (fragment("ok"), vec![1.0, 0.0]),
        ]);
        let results = index.top_k(&[1.0, 0.0], 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].fragment.id, "ok");
    }

    #[test]
    fn test_replace_swaps_contents() {
        let index = FragmentIndex::new();
        index.replace(vec![(fragment("old"), vec![1.0])]);
        index.replace(vec![(fragment("new"), vec![1.0]), (fragment("newer"), vec![1.0])]);
        assert_eq!(index.len(), 2);
        assert!(index.top_k(&[1.0], 5).iter().all(|r| r.fragment.id != "old"));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
