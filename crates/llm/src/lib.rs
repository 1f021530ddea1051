//! Generative model integration
//!
//! A `ChatBackend` abstracts the external text-completion service:
//! blocking and streaming completion over a system prompt plus a
//! message sequence. The production implementation targets the
//! Anthropic Messages API.

pub mod backend;
pub mod claude;

pub use backend::ChatBackend;
pub use claude::{ClaudeBackend, ClaudeConfig};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl From<LlmError> for bot_factory_core::Error {
    fn from(err: LlmError) -> Self {
        bot_factory_core::Error::Llm(err.to_string())
    }
}
