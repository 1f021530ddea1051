//! Per-bot embedding cache
//!
//! Keeps each bot's full chunk set in memory after the first load so
//! retrieval never re-reads storage on the hot path.
//!
//! Operational caveat: entries have no TTL and are never invalidated.
//! A regeneration run that rewrites a bot's partition is not visible to
//! an already-warm process; restart or redeploy to pick up new
//! embeddings. This trades staleness after a data refresh for low
//! per-request latency.

use std::sync::Arc;

use dashmap::DashMap;

use bot_factory_core::Chunk;

use crate::store::ChunkStore;
use crate::RagError;

/// Process-lifetime cache of chunk partitions, keyed by `bot_id`
///
/// Injected as a dependency rather than held as a global, so tests get
/// a fresh, isolated instance. Concurrent first-loads for the same bot
/// may race and load twice; loads are idempotent reads, so
/// last-write-wins is fine and no lock is taken around the load.
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    partitions: DashMap<String, Arc<Vec<Chunk>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached chunks for a bot, loading from the store on
    /// first access
    pub async fn get_or_load(
        &self,
        bot_id: &str,
        store: &dyn ChunkStore,
    ) -> Result<Arc<Vec<Chunk>>, RagError> {
        if let Some(cached) = self.partitions.get(bot_id) {
            tracing::debug!(bot_id = %bot_id, chunks = cached.len(), "Using cached embeddings");
            return Ok(Arc::clone(&cached));
        }

        tracing::info!(bot_id = %bot_id, "Loading embeddings from store");
        let chunks = Arc::new(store.load_all(bot_id).await?);
        self.partitions
            .insert(bot_id.to_string(), Arc::clone(&chunks));

        tracing::info!(bot_id = %bot_id, chunks = chunks.len(), "Cached embeddings");
        Ok(chunks)
    }

    /// True if a bot's partition is already cached
    pub fn is_warm(&self, bot_id: &str) -> bool {
        self.partitions.contains_key(bot_id)
    }

    /// Number of cached chunks for a bot, if warm
    pub fn cached_len(&self, bot_id: &str) -> Option<usize> {
        self.partitions.get(bot_id).map(|c| c.len())
    }
}
