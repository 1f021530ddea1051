//! Similarity retriever
//!
//! Embeds the query once, scores it against the bot's cached corpus by
//! cosine similarity, keeps everything at or above the threshold, and
//! returns the top-K matches ranked by score.

use std::cmp::Ordering;
use std::sync::Arc;

use bot_factory_core::RetrievalResult;

use crate::cache::EmbeddingCache;
use crate::embeddings::Embedder;
use crate::store::ChunkStore;
use crate::RagError;

/// Cosine similarity between two vectors
///
/// Both vectors must have the same dimensionality; a mismatch means the
/// query and stored embeddings came from different models, which is a
/// configuration error. A zero-norm vector scores 0.0 rather than
/// dividing by zero.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64, RagError> {
    if a.len() != b.len() {
        return Err(RagError::Config(format!(
            "Embedding dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a * norm_b))
}

/// Semantic retriever over one shared store and cache
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ChunkStore>,
    cache: Arc<EmbeddingCache>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ChunkStore>,
        cache: Arc<EmbeddingCache>,
    ) -> Self {
        Self {
            embedder,
            store,
            cache,
        }
    }

    /// Retrieve the most relevant chunks for a query, scoped to a bot
    ///
    /// Returns at most `top_k` results with similarity >= the threshold,
    /// sorted by similarity descending. Ties keep their storage order
    /// (stable sort). An empty result is not an error; the caller
    /// degrades to a "no relevant information" context.
    pub async fn retrieve(
        &self,
        bot_id: &str,
        query: &str,
        top_k: usize,
        similarity_threshold: f64,
    ) -> Result<Vec<RetrievalResult>, RagError> {
        tracing::debug!(bot_id = %bot_id, query = %query, "Retrieval start");

        let query_embedding = self.embedder.embed(query).await?;
        let chunks = self.cache.get_or_load(bot_id, self.store.as_ref()).await?;

        let mut results = Vec::new();
        for chunk in chunks.iter() {
            let similarity = cosine_similarity(&query_embedding, &chunk.embedding)?;

            if similarity >= similarity_threshold {
                results.push(RetrievalResult {
                    id: chunk.id.clone(),
                    category: chunk.category.clone(),
                    heading: chunk.heading.clone(),
                    text: chunk.text.clone(),
                    similarity,
                });
            }
        }

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(top_k);

        tracing::info!(
            bot_id = %bot_id,
            searched = chunks.len(),
            matched = results.len(),
            threshold = similarity_threshold,
            top_score = results.first().map(|r| r.similarity),
            "Retrieval complete"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use bot_factory_core::Chunk;

    use super::*;
    use crate::store::MemoryStore;

    /// Returns a fixed vector for any text, keyed by a marker word
    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f64>, RagError> {
            Ok(vec![1.0, 0.0])
        }
    }

    /// Chunk whose similarity to the [1, 0] query is exactly `target`
    fn chunk_with_similarity(bot_id: &str, id: &str, target: f64) -> Chunk {
        // cos(theta) against [1, 0] is just the x component of a unit vector
        let y = (1.0 - target * target).sqrt();
        Chunk {
            id: format!("{}_{}", bot_id, id),
            bot_id: bot_id.to_string(),
            category: "General".to_string(),
            heading: String::new(),
            text: format!("text for {}", id),
            embedding: vec![target, y],
        }
    }

    async fn retriever_with(chunks: Vec<Chunk>) -> Retriever {
        let store = MemoryStore::new();
        store.replace_all("demo", &chunks).await.unwrap();
        Retriever::new(
            Arc::new(FixedEmbedder),
            Arc::new(store),
            Arc::new(EmbeddingCache::new()),
        )
    }

    #[test]
    fn test_cosine_similarity_bounds_and_symmetry() {
        let a = vec![0.6, 0.8];
        let b = vec![-0.8, 0.6];
        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();

        assert_eq!(ab, ba);
        assert!((-1.0..=1.0).contains(&ab));
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-12);

        let neg = cosine_similarity(&a, &[-0.6, -0.8]).unwrap();
        assert!((neg + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_norm_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_dimension_mismatch_is_config_error() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[tokio::test]
    async fn test_end_to_end_ranking_and_truncation() {
        let retriever = retriever_with(vec![
            chunk_with_similarity("demo", "low", 0.3),
            chunk_with_similarity("demo", "high", 0.8),
            chunk_with_similarity("demo", "mid", 0.5),
        ])
        .await;

        let results = retriever.retrieve("demo", "anything", 2, 0.4).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "demo_high");
        assert_eq!(results[1].id, "demo_mid");
        assert!((results[0].similarity - 0.8).abs() < 1e-9);
        assert!((results[1].similarity - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_threshold_monotonicity() {
        let retriever = retriever_with(vec![
            chunk_with_similarity("demo", "a", 0.9),
            chunk_with_similarity("demo", "b", 0.6),
            chunk_with_similarity("demo", "c", 0.35),
            chunk_with_similarity("demo", "d", 0.1),
        ])
        .await;

        let loose = retriever.retrieve("demo", "q", 10, 0.2).await.unwrap();
        let tight = retriever.retrieve("demo", "q", 10, 0.5).await.unwrap();

        let loose_ids: Vec<&str> = loose.iter().map(|r| r.id.as_str()).collect();
        for result in &tight {
            assert!(loose_ids.contains(&result.id.as_str()));
        }
        assert!(tight.len() <= loose.len());
    }

    #[tokio::test]
    async fn test_top_k_truncates_without_reordering() {
        let retriever = retriever_with(vec![
            chunk_with_similarity("demo", "a", 0.9),
            chunk_with_similarity("demo", "b", 0.7),
            chunk_with_similarity("demo", "c", 0.5),
        ])
        .await;

        let all = retriever.retrieve("demo", "q", 10, 0.0).await.unwrap();
        let top2 = retriever.retrieve("demo", "q", 2, 0.0).await.unwrap();

        assert_eq!(all.len(), 3);
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].id, all[0].id);
        assert_eq!(top2[1].id, all[1].id);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        // A chunk identical to the query scores exactly 1.0
        let retriever = retriever_with(vec![chunk_with_similarity("demo", "edge", 1.0)]).await;

        let results = retriever.retrieve("demo", "q", 5, 1.0).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_above_threshold_is_empty_not_error() {
        let retriever = retriever_with(vec![chunk_with_similarity("demo", "weak", 0.1)]).await;

        let results = retriever.retrieve("demo", "q", 5, 0.9).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_corpus_is_empty_not_error() {
        let retriever = retriever_with(Vec::new()).await;

        let results = retriever.retrieve("demo", "q", 5, 0.2).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_equal_scores_keep_storage_order() {
        let retriever = retriever_with(vec![
            chunk_with_similarity("demo", "first", 0.5),
            chunk_with_similarity("demo", "second", 0.5),
        ])
        .await;

        let results = retriever.retrieve("demo", "q", 5, 0.0).await.unwrap();
        assert_eq!(results[0].id, "demo_first");
        assert_eq!(results[1].id, "demo_second");
    }
}
