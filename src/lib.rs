pub mod agents;
pub mod cache;
pub mod config;
pub mod corpus;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod graphql;
pub mod http;
pub mod llm;
pub mod pipeline;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use corpus::{SchemaCorpus, SchemaFragment};
pub use error::{AiblockError, PipelineError, Result, Stage};
pub use pipeline::Pipeline;
