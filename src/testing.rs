//! Deterministic stand-ins for the embedding and completion services.

use crate::corpus::SchemaCorpus;
use crate::embeddings::EmbeddingProvider;
use crate::error::{AiblockError, Result};
use crate::llm::CompletionProvider;
use crate::store::RetrievedChunk;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const KEYWORD_DIMS: usize = 256;

/// Bag-of-words embedder: each lowercase token bumps one FNV-1a bucket
pub struct KeywordEmbedder {
    batch_calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn vectorize(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; KEYWORD_DIMS];
        for token in text
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in token.to_ascii_lowercase().bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % KEYWORD_DIMS as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn model_name(&self) -> &str {
        "keyword-hash"
    }
}

/// Embedder whose backend is always down
pub struct UnavailableEmbedder {
    model: &'static str,
}

impl UnavailableEmbedder {
    pub fn new(model: &'static str) -> Self {
        Self { model }
    }
}

#[async_trait]
impl EmbeddingProvider for UnavailableEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(AiblockError::ServiceUnavailable(
            "embedding service unreachable".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        self.model
    }
}

/// Completion provider that replays queued replies and records prompts.
///
/// Once the queue is empty every call fails with `Generation`.
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// (system, user) pairs in call order
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiblockError::Generation("no scripted reply left".to_string())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Corpus fragments with the given ids as retrieval results, in order
pub fn sample_chunks(ids: &[&str]) -> Vec<RetrievedChunk> {
    let corpus = SchemaCorpus::kusama();
    ids.iter()
        .enumerate()
        .filter_map(|(i, id)| {
            corpus.get(id).map(|f| RetrievedChunk {
                id: f.id.clone(),
                content: f.content.clone(),
                metadata: f.metadata.clone(),
                score: 1.0 - i as f32 * 0.1,
                rank: i + 1,
            })
        })
        .collect()
}
