use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default GraphQL endpoint of the hosted Kusama indexer
pub const DEFAULT_GRAPHQL_ENDPOINT: &str =
    "https://af34c095-7b85-4186-acc9-2691039b60f7.squids.live/kusama-indexer@v1/api/graphql";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub openai: OpenAIConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub graphql: GraphqlConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Which backend serves embeddings or completions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Ollama,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "ollama" => Ok(ProviderKind::Ollama),
            other => anyhow::bail!("Unknown provider '{}': expected 'openai' or 'ollama'", other),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAI => f.write_str("openai"),
            ProviderKind::Ollama => f.write_str("ollama"),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            // Empty means any origin (local development)
            allowed_origins: vec![],
        }
    }
}

/// OpenAI-compatible API configuration (embeddings and chat completions)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            temperature: 0.1,
            max_tokens: 1500,
            timeout_secs: 60,
        }
    }
}

/// Local Ollama server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            model: "llama3".to_string(),
            temperature: 0.1,
            timeout_secs: 120,
        }
    }
}

/// Embeddings configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub provider: ProviderKind,
    /// Switch to OpenAI at startup when the local provider cannot be reached
    pub fallback_to_openai: bool,
    pub batch_size: usize,
    pub cache_capacity: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAI,
            fallback_to_openai: false,
            batch_size: 100,
            cache_capacity: 1000,
        }
    }
}

/// Completion configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub provider: ProviderKind,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAI,
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./aiblock.db"),
            collection: "kusama_schema".to_string(),
        }
    }
}

/// GraphQL endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphqlConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for GraphqlConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GRAPHQL_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_max_chunks: usize,
    pub max_chunk_content_length: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_max_chunks: 5,
            max_chunk_content_length: 200,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            completion: CompletionConfig::default(),
            store: StoreConfig::default(),
            graphql: GraphqlConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

/// Read a non-empty environment variable
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in AIBLOCK_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (optional, defaults otherwise)
    ///
    /// Environment variables then override file values.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let mut config = match env_var("AIBLOCK_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => {
                let default_path = Path::new("config.toml");
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply environment variable overrides on top of file values
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_var("LOG_LEVEL") {
            self.log_level = v.to_lowercase();
        }
        if let Some(v) = env_var("AIBLOCK_PORT") {
            self.server.port = v
                .parse()
                .with_context(|| format!("AIBLOCK_PORT must be a port number, got '{}'", v))?;
        }
        if let Some(v) = env_var("AIBLOCK_DB_PATH") {
            self.store.db_path = PathBuf::from(v);
        }
        if let Some(v) = env_var("OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = env_var("OPENAI_MODEL") {
            self.openai.model = v;
        }
        if let Some(v) = env_var("OPENAI_EMBEDDING_MODEL") {
            self.openai.embedding_model = v;
        }
        if let Some(v) = env_var("EMBEDDING_PROVIDER") {
            self.embeddings.provider = v.parse()?;
        }
        if let Some(v) = env_var("COMPLETION_PROVIDER") {
            self.completion.provider = v.parse()?;
        }
        if let Some(v) = env_var("GRAPHQL_ENDPOINT") {
            self.graphql.endpoint = v;
        }
        if let Some(v) = env_var("GRAPHQL_TIMEOUT") {
            self.graphql.timeout_secs = v
                .parse()
                .with_context(|| format!("GRAPHQL_TIMEOUT must be a number of seconds, got '{}'", v))?;
        }
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.needs_openai_key() && self.openai_api_key().is_none() {
            anyhow::bail!(
                "Environment variable {} not set. Set it in your .env file or as an environment variable with your OpenAI API key.",
                self.openai.api_key_env
            );
        }

        if self.graphql.endpoint.trim().is_empty() {
            anyhow::bail!("GRAPHQL_ENDPOINT must be set");
        }
        let endpoint = url::Url::parse(&self.graphql.endpoint)
            .with_context(|| format!("GRAPHQL_ENDPOINT is not a valid URL: {}", self.graphql.endpoint))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            anyhow::bail!("GRAPHQL_ENDPOINT must use http or https, got {}", endpoint.scheme());
        }

        if self.graphql.timeout_secs == 0 {
            anyhow::bail!("graphql.timeout_secs must be greater than 0");
        }
        if self.openai.timeout_secs == 0 || self.ollama.timeout_secs == 0 {
            anyhow::bail!("provider timeout_secs must be greater than 0");
        }
        if self.embeddings.batch_size == 0 {
            anyhow::bail!("embeddings.batch_size must be greater than 0");
        }
        if self.search.default_max_chunks == 0 {
            anyhow::bail!("search.default_max_chunks must be greater than 0");
        }
        if !(0.0..=2.0).contains(&self.openai.temperature) {
            anyhow::bail!("openai.temperature must be between 0.0 and 2.0");
        }
        if !(0.0..=2.0).contains(&self.ollama.temperature) {
            anyhow::bail!("ollama.temperature must be between 0.0 and 2.0");
        }

        Ok(())
    }

    /// True when any configured path may call the OpenAI API
    pub fn needs_openai_key(&self) -> bool {
        self.embeddings.provider == ProviderKind::OpenAI
            || self.completion.provider == ProviderKind::OpenAI
            || self.embeddings.fallback_to_openai
    }

    /// OpenAI API key from the configured environment variable
    pub fn openai_api_key(&self) -> Option<String> {
        env_var(&self.openai.api_key_env)
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.store.db_path
    }

    /// Name of the embedding model the configured provider uses
    pub fn embedding_model(&self) -> &str {
        match self.embeddings.provider {
            ProviderKind::OpenAI => &self.openai.embedding_model,
            ProviderKind::Ollama => &self.ollama.embedding_model,
        }
    }

    /// Name of the completion model the configured provider uses
    pub fn completion_model(&self) -> &str {
        match self.completion.provider {
            ProviderKind::OpenAI => &self.openai.model,
            ProviderKind::Ollama => &self.ollama.model,
        }
    }
}
