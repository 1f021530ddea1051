//! Embedding generation pipeline
//!
//! Offline path: chunk a bot's knowledge, embed every chunk, then
//! kill-and-fill the bot's partition. An embedding failure for any
//! single chunk aborts the whole run before the store is touched, so a
//! partial embedding set is never written.

use std::collections::BTreeMap;
use std::path::Path;

use bot_factory_core::Chunk;

use crate::chunker::load_bot_chunks;
use crate::embeddings::Embedder;
use crate::store::ChunkStore;
use crate::RagError;

/// Outcome of one generation run
#[derive(Debug)]
pub struct GenerationSummary {
    pub bot_id: String,
    pub total: usize,
    /// Chunk counts per category, sorted by category name
    pub per_category: BTreeMap<String, usize>,
}

/// Run the full pipeline for one bot: chunk, embed, replace
pub async fn generate_bot_embeddings(
    bots_dir: &Path,
    bot_id: &str,
    embedder: &dyn Embedder,
    store: &dyn ChunkStore,
) -> Result<GenerationSummary, RagError> {
    let pending = load_bot_chunks(bots_dir, bot_id)?;

    if pending.is_empty() {
        return Err(RagError::Config(format!(
            "No knowledge data found for bot '{}'; check bots/{}/data/",
            bot_id, bot_id
        )));
    }

    tracing::info!(bot_id = %bot_id, chunks = pending.len(), "Generating embeddings");

    let mut chunks = Vec::with_capacity(pending.len());
    for (idx, chunk) in pending.iter().enumerate() {
        tracing::info!(
            bot_id = %bot_id,
            progress = idx + 1,
            total = pending.len(),
            category = %chunk.category,
            entry_id = %chunk.id,
            "Embedding chunk"
        );

        // Abort on the first failure; nothing has been written yet
        let embedding = embedder.embed(&chunk.text).await.map_err(|e| {
            RagError::Embedding(format!("embedding '{}' failed: {}", chunk.id, e))
        })?;

        chunks.push(Chunk {
            id: format!("{}_{}", chunk.bot_id, chunk.id),
            bot_id: chunk.bot_id.clone(),
            category: chunk.category.clone(),
            heading: chunk.heading.clone(),
            text: chunk.text.clone(),
            embedding,
        });
    }

    store.replace_all(bot_id, &chunks).await?;

    let mut per_category = BTreeMap::new();
    for chunk in &chunks {
        *per_category.entry(chunk.category.clone()).or_insert(0) += 1;
    }

    tracing::info!(
        bot_id = %bot_id,
        total = chunks.len(),
        categories = per_category.len(),
        "Embedding generation complete"
    );

    Ok(GenerationSummary {
        bot_id: bot_id.to_string(),
        total: chunks.len(),
        per_category,
    })
}
