use crate::agents::render_context;
use crate::error::{AiblockError, Result};
use crate::llm::CompletionProvider;
use crate::store::RetrievedChunk;
use regex::Regex;
use std::sync::{Arc, OnceLock};

const SYSTEM_PROMPT: &str = "You are a GraphQL query expert specializing in Kusama blockchain data.
Your task is to generate a precise GraphQL query based on the user's question and the provided schema information.

IMPORTANT RULES:
1. Always return valid GraphQL syntax
2. Use the exact field names and types from the schema
3. Include relevant filters, ordering, and pagination as needed
4. For amounts, remember they are in smallest units (1 KSM = 1,000,000,000,000 units)
5. Use proper timestamp format for date filtering (ISO 8601)
6. Always include necessary fields in the response
7. Return ONLY the GraphQL query without any explanation or markdown formatting

Schema Context:
";

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        // Label line is optional and dropped whatever the language tag
        Regex::new(r"(?s)```(?:[^\n`]*\n)?(.*?)```").expect("Invalid regex pattern")
    })
}

/// Pull the query text out of a model reply.
///
/// Returns the body of the first fenced code block when there is one,
/// otherwise the trimmed reply with any dangling opening fence line removed.
pub fn extract_query(reply: &str) -> String {
    if let Some(caps) = code_fence().captures(reply) {
        return caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
    }

    let trimmed = reply.trim();
    match trimmed.strip_prefix("```") {
        // Unterminated fence: drop the tag line
        Some(rest) => rest
            .split_once('\n')
            .map(|(_, body)| body.trim().to_string())
            .unwrap_or_default(),
        None => trimmed.to_string(),
    }
}

/// Translates a question plus schema context into a GraphQL query
pub struct QueryAgent {
    llm: Arc<dyn CompletionProvider>,
    endpoint: String,
}

impl QueryAgent {
    pub fn new(llm: Arc<dyn CompletionProvider>, endpoint: impl Into<String>) -> Self {
        Self {
            llm,
            endpoint: endpoint.into(),
        }
    }

    pub fn system_prompt(chunks: &[RetrievedChunk]) -> String {
        format!("{}{}", SYSTEM_PROMPT, render_context(chunks, true))
    }

    pub fn user_prompt(&self, question: &str) -> String {
        format!(
            "Generate a GraphQL query for this request: {question}\n\n\
             The GraphQL endpoint is: {endpoint}\n\n\
             Based on the provided schema context, create a query that:\n\
             1. Addresses the user's specific question\n\
             2. Uses appropriate filters and sorting\n\
             3. Includes relevant fields in the response\n\
             4. Handles pagination if needed\n\n\
             Return only the GraphQL query without any additional text.",
            question = question,
            endpoint = self.endpoint
        )
    }

    /// Generate a GraphQL query for `question`. No syntax validation is done.
    pub async fn synthesize(&self, question: &str, chunks: &[RetrievedChunk]) -> Result<String> {
        let reply = self
            .llm
            .complete(&Self::system_prompt(chunks), &self.user_prompt(question))
            .await?;

        let query = extract_query(&reply);
        if query.is_empty() {
            return Err(AiblockError::Generation(format!(
                "{} returned no GraphQL query",
                self.llm.model_name()
            )));
        }

        log::info!("Generated GraphQL query for: {}", question);
        log::debug!("GraphQL query:\n{}", query);
        Ok(query)
    }
}
