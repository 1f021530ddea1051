//! Application settings
//!
//! Priority: env vars > config/{env}.yaml > config/default.yaml > defaults.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Path to the bots directory (config, prompt, and data per bot)
    #[serde(default = "default_bots_dir")]
    pub bots_dir: String,

    /// Embedding API configuration
    #[serde(default)]
    pub embeddings: EmbeddingApiConfig,

    /// Generative model API configuration
    #[serde(default)]
    pub llm: LlmApiConfig,

    /// Storage configuration (embedding + log tables)
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_bots_dir() -> String {
    "bots".to_string()
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty defaults to localhost
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origins: Vec::new(),
            cors_enabled: true,
        }
    }
}

/// Embedding API configuration (OpenAI embeddings endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingApiConfig {
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Read from OPENAI_API_KEY when empty
    #[serde(default)]
    pub api_key: String,
}

fn default_embedding_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

impl Default for EmbeddingApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            api_key: String::new(),
        }
    }
}

impl EmbeddingApiConfig {
    /// Resolve the API key, falling back to the environment
    pub fn resolve_api_key(&self) -> String {
        if self.api_key.is_empty() {
            std::env::var("OPENAI_API_KEY").unwrap_or_default()
        } else {
            self.api_key.clone()
        }
    }
}

/// Generative model API configuration (Anthropic Messages endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmApiConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Read from ANTHROPIC_API_KEY when empty
    #[serde(default)]
    pub api_key: String,
}

fn default_llm_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_llm_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> usize {
    1000
}

impl Default for LlmApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            api_key: String::new(),
        }
    }
}

impl LlmApiConfig {
    /// Resolve the API key, falling back to the environment
    pub fn resolve_api_key(&self) -> String {
        if self.api_key.is_empty() {
            std::env::var("ANTHROPIC_API_KEY").unwrap_or_default()
        } else {
            self.api_key.clone()
        }
    }
}

/// Which chunk store implementation to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Shared DynamoDB tables
    #[default]
    Dynamodb,
    /// In-process store for local development and tests
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Embedding table shared by all bots, partitioned by bot_id
    #[serde(default = "default_table")]
    pub table: String,
    /// Chat interaction log table
    #[serde(default = "default_logs_table")]
    pub logs_table: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Override endpoint for LocalStack; empty uses the real AWS endpoint
    #[serde(default)]
    pub endpoint_url: String,
}

fn default_table() -> String {
    "ChatbotRAG".to_string()
}

fn default_logs_table() -> String {
    "ChatbotLogs".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            table: default_table(),
            logs_table: default_logs_table(),
            region: default_region(),
            endpoint_url: String::new(),
        }
    }
}

/// Load settings from config files and environment
///
/// Layers, later overriding earlier:
/// 1. `config/default.yaml` (optional)
/// 2. `config/{env}.yaml` (optional)
/// 3. Environment variables with prefix `BOT_FACTORY_`
///    (e.g. `BOT_FACTORY_SERVER__PORT=9000`)
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    if Path::new("config/default.yaml").exists() {
        builder = builder.add_source(File::with_name("config/default"));
    }

    if let Some(env_name) = env {
        let env_path = format!("config/{}", env_name);
        if Path::new(&format!("{}.yaml", env_path)).exists() {
            builder = builder.add_source(File::with_name(&env_path));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("BOT_FACTORY")
            .separator("__")
            .try_parsing(true),
    );

    let settings = builder.build()?.try_deserialize()?;
    Ok(settings)
}
