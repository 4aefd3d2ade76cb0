use crate::error::{AiblockError, Result};
use crate::llm::CompletionProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Local completion model served by Ollama (`/api/generate`, non-streaming)
pub struct OllamaCompletionClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaCompletionClient {
    pub fn new(base_url: String, model: String, temperature: f32, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiblockError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
        })
    }
}

#[async_trait]
impl CompletionProvider for OllamaCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            system,
            prompt: user,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AiblockError::ServiceUnavailable(format!("Ollama network error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiblockError::ServiceUnavailable(format!(
                "Ollama generate error {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response.json().await.map_err(|e| {
            AiblockError::Generation(format!("Failed to parse Ollama response: {}", e))
        })?;
        Ok(result.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_not_streaming() {
        let request = GenerateRequest {
            model: "llama3",
            system: "rules",
            prompt: "question",
            stream: false,
            options: GenerateOptions { temperature: 0.1 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["system"], "rules");
        assert_eq!(json["prompt"], "question");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_service_unavailable() {
        let client = OllamaCompletionClient::new(
            "http://127.0.0.1:1".to_string(),
            "llama3".to_string(),
            0.1,
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client.complete("system", "user").await.unwrap_err();
        assert!(matches!(err, AiblockError::ServiceUnavailable(_)));
    }
}
