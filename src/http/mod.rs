//! REST facade over the pipeline.

mod error;
mod handlers;

pub use error::{status_for, ApiError};

use crate::config::ServerConfig;
use crate::error::{AiblockError, Result};
use crate::pipeline::Pipeline;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub started: Instant,
}

/// Build the router with tracing and CORS layers
pub fn router(pipeline: Arc<Pipeline>, allowed_origins: &[String]) -> Router {
    // No configured origins means any origin (local development)
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .route("/answer", post(handlers::answer))
        .route("/search-chunks", post(handlers::search_chunks))
        .route("/generate-query", post(handlers::generate_query))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(AppState {
            pipeline,
            started: Instant::now(),
        })
}

/// Bind and serve until the process is stopped
pub async fn serve(pipeline: Arc<Pipeline>, config: &ServerConfig) -> Result<()> {
    let app = router(pipeline, &config.allowed_origins);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AiblockError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to bind to {}: {}", addr, e),
        ))
    })?;
    log::info!("AI Block API listening on http://{}", addr);

    axum::serve(listener, app).await.map_err(|e| {
        AiblockError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("HTTP server error: {}", e),
        ))
    })
}
