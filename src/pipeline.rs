//! Question answering pipeline: retrieval, query synthesis, execution and
//! explanation, each failure tagged with its stage.

use crate::agents::{QueryAgent, ResponseAgent};
use crate::config::{Config, SearchConfig};
use crate::corpus::SchemaCorpus;
use crate::db::query_log::{self, QueryLogEntry, QueryLogSummary};
use crate::db::Db;
use crate::embeddings;
use crate::error::{AiblockError, PipelineError, Result, Stage, StageExt};
use crate::graphql::GraphQLExecutor;
use crate::llm::{self, CompletionProvider};
use crate::store::{EmbeddingStore, RetrievedChunk, StoreStats, UpsertReport};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Output of query synthesis
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQuery {
    pub graphql_query: String,
    pub relevant_chunks: Vec<RetrievedChunk>,
}

/// Full pipeline output
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub graphql_query: String,
    pub raw_data: Value,
    /// Chunk content truncated for display
    pub relevant_chunks: Vec<RetrievedChunk>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub store: StoreStats,
    pub total_chunks: usize,
    pub endpoint: String,
    pub completion_model: String,
    pub queries: QueryLogSummary,
}

pub struct Pipeline {
    db: Db,
    store: EmbeddingStore,
    query_agent: QueryAgent,
    response_agent: ResponseAgent,
    executor: GraphQLExecutor,
    completion_model: String,
    search: SearchConfig,
    corpus_size: usize,
}

impl Pipeline {
    pub fn new(
        db: Db,
        store: EmbeddingStore,
        llm: Arc<dyn CompletionProvider>,
        executor: GraphQLExecutor,
        search: SearchConfig,
        corpus_size: usize,
    ) -> Self {
        Self {
            db,
            store,
            query_agent: QueryAgent::new(llm.clone(), executor.endpoint()),
            response_agent: ResponseAgent::new(llm.clone()),
            completion_model: llm.model_name().to_string(),
            executor,
            search,
            corpus_size,
        }
    }

    /// Open the database, select providers and build the pipeline.
    ///
    /// Does not index the corpus; call [`Pipeline::index`] for that.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let db = Db::new(config.db_path());
        let applied = db.migrate().await?;
        if applied > 0 {
            log::info!("Applied {} migrations to {}", applied, db.path().display());
        }

        let embedder = embeddings::select_provider(config).await?;
        let store = EmbeddingStore::new(
            db.clone(),
            config.store.collection.clone(),
            embedder,
            config.embeddings.cache_capacity,
            config.embeddings.batch_size,
        );
        store.reload_index().await?;

        let llm = llm::build_provider(config)?;
        let executor = GraphQLExecutor::new(config.graphql.endpoint.clone(), config.graphql.timeout_secs)?;

        Ok(Self::new(
            db,
            store,
            llm,
            executor,
            config.search.clone(),
            SchemaCorpus::kusama().len(),
        ))
    }

    /// Make sure every corpus fragment is embedded and indexed
    pub async fn index(&self, corpus: &SchemaCorpus) -> Result<UpsertReport> {
        self.store.upsert(corpus.fragments()).await
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    /// Validate a requested chunk count, falling back to the configured default
    pub fn resolve_max_chunks(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            None => Ok(self.search.default_max_chunks),
            Some(0) => Err(AiblockError::InvalidInput(
                "max_chunks must be greater than 0".to_string(),
            )),
            Some(k) => Ok(k),
        }
    }

    /// Retrieval only; an empty result is not an error here
    pub async fn search(&self, question: &str, k: usize) -> PipelineResult<Vec<RetrievedChunk>> {
        let start = Instant::now();
        let result = self.store.search(question, k).await.at_stage(Stage::Retrieval);
        let count = result.as_ref().map(Vec::len).unwrap_or(0);
        self.record("search-chunks", question, start, result.as_ref().err(), count)
            .await;
        result
    }

    /// Retrieval plus query synthesis
    pub async fn generate_query(&self, question: &str, k: usize) -> PipelineResult<GeneratedQuery> {
        let start = Instant::now();
        let result = self.run_generate(question, k).await;
        let count = result.as_ref().map(|g| g.relevant_chunks.len()).unwrap_or(0);
        self.record("generate-query", question, start, result.as_ref().err(), count)
            .await;
        result
    }

    /// The full pipeline. No partial results: any stage failure aborts.
    pub async fn answer(&self, question: &str, k: usize) -> PipelineResult<Answer> {
        let start = Instant::now();
        let result = self.run_answer(question, k).await;
        let count = result.as_ref().map(|a| a.relevant_chunks.len()).unwrap_or(0);
        self.record("answer", question, start, result.as_ref().err(), count)
            .await;
        result
    }

    async fn retrieve(&self, question: &str, k: usize) -> PipelineResult<Vec<RetrievedChunk>> {
        let chunks = self.store.search(question, k).await.at_stage(Stage::Retrieval)?;
        if chunks.is_empty() {
            return Err(PipelineError::new(Stage::Retrieval, AiblockError::NoContext));
        }
        log::info!("Retrieved {} schema fragments for: {}", chunks.len(), question);
        Ok(chunks)
    }

    async fn run_generate(&self, question: &str, k: usize) -> PipelineResult<GeneratedQuery> {
        let relevant_chunks = self.retrieve(question, k).await?;
        let graphql_query = self
            .query_agent
            .synthesize(question, &relevant_chunks)
            .await
            .at_stage(Stage::Synthesis)?;
        Ok(GeneratedQuery {
            graphql_query,
            relevant_chunks,
        })
    }

    async fn run_answer(&self, question: &str, k: usize) -> PipelineResult<Answer> {
        let GeneratedQuery {
            graphql_query,
            relevant_chunks,
        } = self.run_generate(question, k).await?;

        let raw_data = self
            .executor
            .execute(&graphql_query)
            .await
            .at_stage(Stage::Execution)?;

        let answer = self
            .response_agent
            .explain(question, &raw_data, &relevant_chunks)
            .await
            .at_stage(Stage::Explanation)?;

        let limit = self.search.max_chunk_content_length;
        let relevant_chunks = relevant_chunks
            .into_iter()
            .map(|mut chunk| {
                chunk.content = truncate_content(&chunk.content, limit);
                chunk
            })
            .collect();

        Ok(Answer {
            answer,
            graphql_query,
            raw_data,
            relevant_chunks,
        })
    }

    async fn record(
        &self,
        endpoint: &str,
        question: &str,
        start: Instant,
        error: Option<&PipelineError>,
        result_count: usize,
    ) {
        if let Some(e) = error {
            log::error!("{} failed for {:?}: {}", endpoint, question, e);
        }

        let entry = QueryLogEntry {
            request_id: Uuid::new_v4().to_string(),
            endpoint: endpoint.to_string(),
            query: question.to_string(),
            success: error.is_none(),
            failed_stage: error.map(|e| e.stage.to_string()),
            latency_ms: start.elapsed().as_millis() as u64,
            result_count,
        };
        if let Err(e) = query_log::log_query(&self.db, entry).await {
            log::warn!("Failed to write query log: {}", e);
        }
    }

    pub async fn stats(&self) -> Result<PipelineStats> {
        Ok(PipelineStats {
            store: self.store.stats(),
            total_chunks: self.corpus_size,
            endpoint: self.executor.endpoint().to_string(),
            completion_model: self.completion_model.clone(),
            queries: query_log::summarize(&self.db).await?,
        })
    }
}

/// Cut `content` to `limit` characters, appending `...` when shortened
pub fn truncate_content(content: &str, limit: usize) -> String {
    match content.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}
