//! Error types

use thiserror::Error;

/// Top-level error for the bot factory
///
/// Sub-crates define their own error enums and convert into this type
/// at the crate boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("RAG error: {0}")]
    Rag(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Unknown bot: {0}")]
    UnknownBot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias using the top-level error
pub type Result<T> = std::result::Result<T, Error>;
