//! Retrievable chunk types
//!
//! A `Chunk` is the atomic unit of retrievable knowledge: a rendered
//! text block plus its embedding vector, partitioned by `bot_id`.

use serde::{Deserialize, Serialize};

/// A stored knowledge chunk with its embedding
///
/// The stored `id` composes the bot partition with the source entry id
/// (`"{bot_id}_{entry_id}"`), so ids are unique within the shared table.
/// `text` is never empty: the chunker drops entries that render blank
/// before they reach the embedding pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    /// Partition key separating one bot's knowledge base from the rest
    pub bot_id: String,
    /// Category label for grouping and display
    pub category: String,
    /// Optional short title
    #[serde(default)]
    pub heading: String,
    /// Full rendered content, non-empty
    pub text: String,
    /// Embedding vector from the external embedding model
    pub embedding: Vec<f64>,
}

/// One scored retrieval hit, produced per query
///
/// Ephemeral: lives only for the duration of one retrieval call and the
/// prompt it feeds. Never persisted.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub id: String,
    pub category: String,
    pub heading: String,
    pub text: String,
    /// Cosine similarity to the query, in [-1, 1]
    pub similarity: f64,
}

/// The retrieval data echoed back to callers alongside a response
///
/// Intentionally omits the chunk text so the full knowledge base is not
/// leaked to the client beyond what grounded the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub category: String,
    pub similarity: f64,
}

impl From<&RetrievalResult> for Source {
    fn from(result: &RetrievalResult) -> Self {
        Self {
            category: result.category.clone(),
            similarity: result.similarity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_result_drops_text() {
        let result = RetrievalResult {
            id: "demo_skills".to_string(),
            category: "Skills".to_string(),
            heading: "Languages".to_string(),
            text: "Rust, Python".to_string(),
            similarity: 0.72,
        };

        let source = Source::from(&result);
        assert_eq!(source.category, "Skills");
        assert_eq!(source.similarity, 0.72);

        let json = serde_json::to_string(&source).unwrap();
        assert!(!json.contains("Rust, Python"));
    }
}
