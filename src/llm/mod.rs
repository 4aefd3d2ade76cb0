//! Text completion backends used by the query and response agents.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaCompletionClient;
pub use openai::OpenAIChatClient;

use crate::config::{Config, ProviderKind};
use crate::error::{AiblockError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A model that answers a system + user prompt pair with text.
///
/// Unreachable or failing backends surface as `ServiceUnavailable`; a reply
/// without usable text surfaces as `Generation`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Build the configured completion provider
pub fn build_provider(config: &Config) -> Result<Arc<dyn CompletionProvider>> {
    match config.completion.provider {
        ProviderKind::OpenAI => {
            let api_key = config.openai_api_key().ok_or_else(|| {
                AiblockError::Config(format!("{} is not set", config.openai.api_key_env))
            })?;
            Ok(Arc::new(OpenAIChatClient::new(
                api_key,
                config.openai.base_url.clone(),
                config.openai.model.clone(),
                config.openai.temperature,
                config.openai.max_tokens,
                Duration::from_secs(config.openai.timeout_secs),
            )?))
        }
        ProviderKind::Ollama => Ok(Arc::new(OllamaCompletionClient::new(
            config.ollama.base_url.clone(),
            config.ollama.model.clone(),
            config.ollama.temperature,
            Duration::from_secs(config.ollama.timeout_secs),
        )?)),
    }
}
