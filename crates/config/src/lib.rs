//! Configuration management for the bot factory
//!
//! Two layers of configuration:
//! - Application settings (`Settings`): server port, storage tables,
//!   API endpoints. Loaded from YAML files with environment variable
//!   overrides (BOT_FACTORY_ prefix).
//! - Per-bot configuration: each bot directory under `bots/` carries a
//!   `config.yml` (identity, enablement, retrieval defaults,
//!   suggestions) and a `prompt.yml` (system prompt template).

pub mod bot;
pub mod registry;
pub mod settings;

pub use bot::{load_bot_config, load_prompt_template, BotConfig, RagDefaults};
pub use registry::BotRegistry;
pub use settings::{
    load_settings, EmbeddingApiConfig, LlmApiConfig, ServerConfig, Settings, StorageBackend,
    StorageConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for bot_factory_core::Error {
    fn from(err: ConfigError) -> Self {
        bot_factory_core::Error::Config(err.to_string())
    }
}
