pub mod ollama;
pub mod openai;
pub mod provider;
pub mod storage;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAIEmbedder;
pub use provider::EmbeddingProvider;

use crate::config::{Config, ProviderKind};
use crate::error::{AiblockError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Build the OpenAI embedder from config
pub fn openai_embedder(config: &Config) -> Result<OpenAIEmbedder> {
    let api_key = config.openai_api_key().ok_or_else(|| {
        AiblockError::Config(format!("{} is not set", config.openai.api_key_env))
    })?;
    OpenAIEmbedder::new(
        api_key,
        config.openai.base_url.clone(),
        config.openai.embedding_model.clone(),
        config.embeddings.batch_size,
        Duration::from_secs(config.openai.timeout_secs),
    )
}

/// Build the Ollama embedder from config
pub fn ollama_embedder(config: &Config) -> Result<OllamaEmbedder> {
    OllamaEmbedder::new(
        config.ollama.base_url.clone(),
        config.ollama.embedding_model.clone(),
        Duration::from_secs(config.ollama.timeout_secs),
    )
}

/// Build the configured embedding provider and check that it answers.
///
/// A local provider that fails its probe is replaced by OpenAI only when
/// `embeddings.fallback_to_openai` is set; otherwise the probe error is returned.
pub async fn select_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embeddings.provider {
        ProviderKind::OpenAI => {
            let embedder = openai_embedder(config)?;
            probe(&embedder).await?;
            Ok(Arc::new(embedder))
        }
        ProviderKind::Ollama => {
            let embedder = ollama_embedder(config)?;
            match probe(&embedder).await {
                Ok(()) => Ok(Arc::new(embedder)),
                Err(e) if config.embeddings.fallback_to_openai => {
                    log::warn!(
                        "Ollama embeddings unavailable ({}), falling back to OpenAI {}",
                        e,
                        config.openai.embedding_model
                    );
                    let fallback = openai_embedder(config)?;
                    probe(&fallback).await?;
                    Ok(Arc::new(fallback))
                }
                Err(e) => Err(e),
            }
        }
    }
}

async fn probe(provider: &dyn EmbeddingProvider) -> Result<()> {
    let vector = provider.embed("ping").await?;
    if vector.is_empty() {
        return Err(AiblockError::ServiceUnavailable(format!(
            "{} returned an empty embedding",
            provider.model_name()
        )));
    }
    log::info!(
        "Embedding provider ready: {} ({} dims)",
        provider.model_name(),
        vector.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> Config {
        let mut config = Config::default();
        config.embeddings.provider = ProviderKind::Ollama;
        config.completion.provider = ProviderKind::Ollama;
        config.ollama.base_url = "http://127.0.0.1:1".to_string();
        config.ollama.timeout_secs = 2;
        config
    }

    #[tokio::test]
    async fn test_unreachable_ollama_without_fallback_fails() {
        let config = unreachable_config();
        let err = select_provider(&config).await.err().unwrap();
        assert!(matches!(err, AiblockError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fallback_without_openai_key_fails() {
        let mut config = unreachable_config();
        config.embeddings.fallback_to_openai = true;
        // Points at a variable nobody sets, so the fallback cannot be built
        config.openai.api_key_env = "AIBLOCK_TEST_UNSET_OPENAI_KEY".to_string();

        let err = select_provider(&config).await.err().unwrap();
        assert!(matches!(err, AiblockError::Config(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_fallback_to_unreachable_openai_fails() {
        let mut config = unreachable_config();
        config.embeddings.fallback_to_openai = true;
        config.openai.base_url = "http://127.0.0.1:1/v1".to_string();
        config.openai.timeout_secs = 2;
        config.openai.api_key_env = "AIBLOCK_TEST_UNREACHABLE_OPENAI_KEY".to_string();
        std::env::set_var("AIBLOCK_TEST_UNREACHABLE_OPENAI_KEY", "sk-test");

        let err = select_provider(&config).await.err().unwrap();
        assert!(matches!(err, AiblockError::ServiceUnavailable(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_unreachable_ollama_falls_back_to_openai() {
        use axum::{routing::post, Json, Router};
        use serde_json::{json, Value};

        let router = Router::new().route(
            "/v1/embeddings",
            post(|Json(body): Json<Value>| async move {
                let inputs = body["input"].as_array().map(|a| a.len()).unwrap_or(0);
                let data: Vec<Value> = (0..inputs)
                    .map(|i| json!({"index": i, "embedding": [0.25, 0.5, 0.75]}))
                    .collect();
                Json(json!({"data": data}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut config = unreachable_config();
        config.embeddings.fallback_to_openai = true;
        config.openai.base_url = format!("http://{}/v1", addr);
        config.openai.api_key_env = "AIBLOCK_TEST_FALLBACK_OPENAI_KEY".to_string();
        std::env::set_var("AIBLOCK_TEST_FALLBACK_OPENAI_KEY", "sk-test");

        let provider = select_provider(&config).await.unwrap();
        assert_eq!(provider.model_name(), config.openai.embedding_model);
        assert_eq!(provider.embed("transfers").await.unwrap(), vec![0.25, 0.5, 0.75]);
    }
}
