//! Text embeddings
//!
//! Embeddings come from an external API (OpenAI `text-embedding-3-small`
//! by default). One call embeds one text; the generation pipeline loops
//! over chunks and a query embeds exactly once per retrieval.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::RagError;

/// Embedding service seam
///
/// The retrieval path and the offline generation pipeline both go
/// through this trait, so tests can substitute a deterministic embedder.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Convert one text into a fixed-length vector
    async fn embed(&self, text: &str) -> Result<Vec<f64>, RagError>;
}

/// Embedding API configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// API base endpoint
    pub endpoint: String,
    /// Embedding model id
    pub model: String,
    /// API key
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// OpenAI embeddings client
#[derive(Debug)]
pub struct OpenAiEmbedder {
    client: Client,
    config: EmbeddingConfig,
}

impl OpenAiEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self, RagError> {
        if config.api_key.is_empty() {
            return Err(RagError::Config(
                "OPENAI_API_KEY not set. Set it via environment or config.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, RagError> {
        let request = EmbeddingRequest {
            model: self.config.model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.config.endpoint))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("Invalid response: {}", e)))?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagError::Embedding("Response contained no embedding".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f64>,
}
