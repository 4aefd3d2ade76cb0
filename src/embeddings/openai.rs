use crate::embeddings::EmbeddingProvider;
use crate::error::{AiblockError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI caps the number of inputs per embeddings request
const MAX_BATCH_SIZE: usize = 2048;

/// Request structure for OpenAI embeddings API
#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response structure from OpenAI embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// Individual embedding data in API response
#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI (or compatible) embeddings client
///
/// Splits large inputs into batches of at most `batch_size` texts.
pub struct OpenAIEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    batch_size: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `base_url` - API root, e.g. "https://api.openai.com/v1"
    /// * `model` - Model name (e.g., "text-embedding-ada-002")
    /// * `batch_size` - Maximum number of texts per API request (capped at 2048)
    /// * `timeout` - Client-side request timeout
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiblockError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        })
    }

    /// Make a single API request for one batch
    async fn embed_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiblockError::ServiceUnavailable(format!("OpenAI embeddings network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(AiblockError::ServiceUnavailable(format!(
                "OpenAI embeddings API error {}: {}",
                status, body
            )));
        }

        let mut result: EmbeddingResponse = response.json().await.map_err(|e| {
            AiblockError::ServiceUnavailable(format!("Failed to parse embeddings response: {}", e))
        })?;

        if result.data.len() != texts.len() {
            return Err(AiblockError::ServiceUnavailable(format!(
                "OpenAI returned {} embeddings for {} inputs",
                result.data.len(),
                texts.len()
            )));
        }

        result.data.sort_by_key(|d| d.index);
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let start = std::time::Instant::now();
            let embeddings = self.embed_request(batch).await?;
            log::debug!("Embedded {} texts in {:?}", batch.len(), start.elapsed());
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
