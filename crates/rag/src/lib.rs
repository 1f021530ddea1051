//! Retrieval-augmented generation core
//!
//! The pipeline, offline to online:
//! - `chunker` turns per-bot knowledge YAML into text chunks
//! - `generate` embeds every chunk and bulk-replaces a bot's partition
//! - `store` persists chunks with embeddings, partitioned by bot_id
//! - `cache` keeps each bot's partition in memory for the process lifetime
//! - `retriever` scores a query against the cached corpus by cosine
//!   similarity, filters by threshold, and returns the top-K matches
//! - `context` renders retrieved chunks into one prompt-ready block

pub mod cache;
pub mod chunker;
pub mod context;
pub mod dynamo;
pub mod embeddings;
pub mod generate;
pub mod retriever;
pub mod store;

pub use cache::EmbeddingCache;
pub use chunker::{load_bot_chunks, PendingChunk};
pub use context::{format_context, NO_CONTEXT_SENTINEL};
pub use dynamo::{connect_dynamodb, DynamoChunkStore};
pub use embeddings::{Embedder, EmbeddingConfig, OpenAiEmbedder};
pub use generate::{generate_bot_embeddings, GenerationSummary};
pub use retriever::{cosine_similarity, Retriever};
pub use store::{ChunkStore, MemoryStore};

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<RagError> for bot_factory_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Config(msg) => bot_factory_core::Error::Config(msg),
            other => bot_factory_core::Error::Rag(other.to_string()),
        }
    }
}
