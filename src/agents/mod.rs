//! Language-model agents: one turns a question into GraphQL, the other
//! turns the GraphQL result back into prose.

pub mod query;
pub mod response;

pub use query::QueryAgent;
pub use response::ResponseAgent;

use crate::store::RetrievedChunk;

/// Render retrieved fragments as a prompt context block.
///
/// Each fragment contributes its id, content and keywords, plus its examples
/// when `with_examples` is set; fragments are separated by `---` lines.
pub(crate) fn render_context(chunks: &[RetrievedChunk], with_examples: bool) -> String {
    chunks
        .iter()
        .map(|chunk| {
            let mut part = format!("ID: {}\nContent: {}\n", chunk.id, chunk.content);
            if with_examples && !chunk.metadata.examples.is_empty() {
                part.push_str(&format!("Examples: {}\n", chunk.metadata.examples.join("; ")));
            }
            if !chunk.metadata.keywords.is_empty() {
                part.push_str(&format!("Keywords: {}\n", chunk.metadata.keywords.join(", ")));
            }
            part
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}
