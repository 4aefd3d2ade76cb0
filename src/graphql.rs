//! HTTP client for the Kusama indexer GraphQL endpoint.

use crate::error::{AiblockError, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
}

pub struct GraphQLExecutor {
    client: Client,
    endpoint: String,
    timeout_secs: u64,
}

impl GraphQLExecutor {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AiblockError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `query` and return the full response document.
    ///
    /// A response carrying a non-empty `errors` array is a failure even when
    /// the status is 2xx.
    pub async fn execute(&self, query: &str) -> Result<Value> {
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&GraphQLRequest { query })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("GraphQL endpoint returned {}: {}", status, body);
            return Err(AiblockError::Execution(format!(
                "GraphQL endpoint returned {}: {}",
                status, body
            )));
        }

        let document: Value = response.json().await.map_err(|e| self.transport_error(e))?;

        if let Some(errors) = document.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let detail = Value::Array(errors.clone()).to_string();
                log::error!("GraphQL query returned errors: {}", detail);
                return Err(AiblockError::Execution(detail));
            }
        }

        log::debug!("GraphQL query executed in {:?}", start.elapsed());
        Ok(document)
    }

    fn transport_error(&self, e: reqwest::Error) -> AiblockError {
        if e.is_timeout() {
            log::error!("GraphQL endpoint timed out after {}s", self.timeout_secs);
            AiblockError::ExecutionTimeout(self.timeout_secs)
        } else {
            log::error!("GraphQL request failed: {}", e);
            AiblockError::Execution(format!("GraphQL request failed: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::json;

    /// Serve `router` on an ephemeral port and return its URL
    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/graphql", addr)
    }

    #[tokio::test]
    async fn test_execute_returns_document() {
        let router = Router::new().route(
            "/graphql",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"data": {"echo": body["query"]}}))
            }),
        );
        let executor = GraphQLExecutor::new(spawn(router).await, 5).unwrap();

        let result = executor.execute("{ transfers { id } }").await.unwrap();
        assert_eq!(result["data"]["echo"], "{ transfers { id } }");
    }

    #[tokio::test]
    async fn test_execute_reports_graphql_errors() {
        let router = Router::new().route(
            "/graphql",
            post(|| async {
                Json(json!({"errors": [{"message": "Cannot query field \"foo\""}]}))
            }),
        );
        let executor = GraphQLExecutor::new(spawn(router).await, 5).unwrap();

        let err = executor.execute("{ foo }").await.unwrap_err();
        match err {
            AiblockError::Execution(detail) => assert!(detail.contains("Cannot query field")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_empty_errors_is_success() {
        let router = Router::new().route(
            "/graphql",
            post(|| async { Json(json!({"data": {"transfers": []}, "errors": []})) }),
        );
        let executor = GraphQLExecutor::new(spawn(router).await, 5).unwrap();

        let result = executor.execute("{ transfers { id } }").await.unwrap();
        assert_eq!(result["data"]["transfers"], json!([]));
    }

    #[tokio::test]
    async fn test_execute_non_success_status() {
        let router = Router::new().route(
            "/graphql",
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let executor = GraphQLExecutor::new(spawn(router).await, 5).unwrap();

        let err = executor.execute("{ transfers { id } }").await.unwrap_err();
        match err {
            AiblockError::Execution(detail) => {
                assert!(detail.contains("502"));
                assert!(detail.contains("upstream down"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let router = Router::new().route(
            "/graphql",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"data": {}}))
            }),
        );
        let executor = GraphQLExecutor::new(spawn(router).await, 1).unwrap();

        let err = executor.execute("{ transfers { id } }").await.unwrap_err();
        assert!(matches!(err, AiblockError::ExecutionTimeout(1)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_execute_unreachable_endpoint() {
        let executor = GraphQLExecutor::new("http://127.0.0.1:1/graphql", 2).unwrap();
        let err = executor.execute("{ transfers { id } }").await.unwrap_err();
        assert!(matches!(err, AiblockError::Execution(_)), "got {:?}", err);
    }
}
