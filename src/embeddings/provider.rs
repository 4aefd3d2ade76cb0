use crate::error::{AiblockError, Result};
use async_trait::async_trait;

/// Anything that turns text into embedding vectors.
///
/// Implementations report unreachable or failing backends as
/// [`AiblockError::ServiceUnavailable`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts; output order matches input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AiblockError::ServiceUnavailable(format!(
                    "{} returned no embedding",
                    self.model_name()
                ))
            })
    }

    /// Model identifier, persisted next to each stored vector.
    fn model_name(&self) -> &str;
}
