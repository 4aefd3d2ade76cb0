use crate::db::query_log::QueryLogSummary;
use crate::http::{ApiError, AppState};
use crate::store::RetrievedChunk;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub max_chunks: Option<usize>,
}

#[derive(Serialize)]
pub struct RootResponse {
    message: &'static str,
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_secs: u64,
    indexed_fragments: usize,
}

#[derive(Serialize)]
pub struct StatsResponse {
    chunk_count: usize,
    total_chunks: usize,
    endpoint: String,
    collection: String,
    embedding_model: String,
    completion_model: String,
    queries: QueryLogSummary,
}

#[derive(Serialize)]
pub struct SearchResponse {
    query: String,
    chunks: Vec<RetrievedChunk>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    query: String,
    graphql_query: String,
    relevant_chunks: Vec<RetrievedChunk>,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    answer: String,
    graphql_query: String,
    raw_data: Value,
    relevant_chunks: Vec<RetrievedChunk>,
}

/// Unwrap a JSON body and resolve its chunk count
fn parse_request(
    state: &AppState,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<(String, usize), ApiError> {
    let Json(request) = body?;
    let k = state.pipeline.resolve_max_chunks(request.max_chunks)?;
    Ok((request.query, k))
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "AI Block Backend API",
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness only; never calls external services
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "aiblock",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
        indexed_fragments: state.pipeline.store().count(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.pipeline.stats().await?;
    Ok(Json(StatsResponse {
        chunk_count: stats.store.count,
        total_chunks: stats.total_chunks,
        endpoint: stats.endpoint,
        collection: stats.store.collection,
        embedding_model: stats.store.embedding_model,
        completion_model: stats.completion_model,
        queries: stats.queries,
    }))
}

pub async fn search_chunks(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let (query, k) = parse_request(&state, body)?;
    let chunks = state.pipeline.search(&query, k).await?;
    Ok(Json(SearchResponse { query, chunks }))
}

pub async fn generate_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let (query, k) = parse_request(&state, body)?;
    let generated = state.pipeline.generate_query(&query, k).await?;
    Ok(Json(GenerateResponse {
        query,
        graphql_query: generated.graphql_query,
        relevant_chunks: generated.relevant_chunks,
    }))
}

pub async fn answer(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let (query, k) = parse_request(&state, body)?;
    log::info!("Processing query: {}", query);
    let answer = state.pipeline.answer(&query, k).await?;
    Ok(Json(AnswerResponse {
        answer: answer.answer,
        graphql_query: answer.graphql_query,
        raw_data: answer.raw_data,
        relevant_chunks: answer.relevant_chunks,
    }))
}
