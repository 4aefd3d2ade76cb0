use crate::agents::render_context;
use crate::error::{AiblockError, Result};
use crate::llm::CompletionProvider;
use crate::store::RetrievedChunk;
use serde_json::Value;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that explains Kusama blockchain data in clear, natural language.
Your task is to interpret GraphQL query results and provide informative answers to user questions.

IMPORTANT GUIDELINES:
1. Convert amounts from smallest units to KSM (1 KSM = 1,000,000,000,000 units)
2. Format timestamps in a readable way
3. Explain technical terms when necessary
4. Provide context about what the data means
5. Be concise but informative
6. If there's no data, explain what that means
7. Use proper formatting for addresses (show first and last few characters)
8. Include relevant insights about the data

Schema Context:
";

/// Explains a raw GraphQL result in natural language
pub struct ResponseAgent {
    llm: Arc<dyn CompletionProvider>,
}

impl ResponseAgent {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    pub fn system_prompt(chunks: &[RetrievedChunk]) -> String {
        format!("{}{}", SYSTEM_PROMPT, render_context(chunks, false))
    }

    pub fn user_prompt(question: &str, raw: &Value) -> String {
        let data = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
        format!(
            "User Question: {question}\n\n\
             GraphQL Response Data: {data}\n\n\
             Please provide a clear, informative response that:\n\
             1. Directly answers the user's question\n\
             2. Explains what the data shows\n\
             3. Provides relevant context and insights\n\
             4. Formats technical data in a user-friendly way\n\n\
             If there are errors in the data or no results, explain what that means and suggest alternatives.",
            question = question,
            data = data
        )
    }

    pub async fn explain(&self, question: &str, raw: &Value, chunks: &[RetrievedChunk]) -> Result<String> {
        let reply = self
            .llm
            .complete(&Self::system_prompt(chunks), &Self::user_prompt(question, raw))
            .await?;

        let answer = reply.trim();
        if answer.is_empty() {
            return Err(AiblockError::Generation(format!(
                "{} returned an empty answer",
                self.llm.model_name()
            )));
        }

        log::info!("Generated natural language response for: {}", question);
        Ok(answer.to_string())
    }
}
