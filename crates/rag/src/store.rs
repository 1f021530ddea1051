//! Chunk persistence
//!
//! All operations are scoped by `bot_id`: partitions never
//! cross-contaminate even though the backing table is shared.

use async_trait::async_trait;
use dashmap::DashMap;

use bot_factory_core::Chunk;

use crate::RagError;

/// Partition-scoped chunk store
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// True if any row exists for this bot
    async fn exists(&self, bot_id: &str) -> Result<bool, RagError>;

    /// Kill-and-fill: delete every row for `bot_id`, then insert the
    /// new set. Rows of other partitions are never touched. Delete and
    /// insert run in batches without a transaction; a failure mid-way
    /// can leave the partition partially written, which a re-run of the
    /// generation pipeline repairs.
    async fn replace_all(&self, bot_id: &str, chunks: &[Chunk]) -> Result<(), RagError>;

    /// Full read of one partition
    async fn load_all(&self, bot_id: &str) -> Result<Vec<Chunk>, RagError>;
}

/// In-process store for local development and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: DashMap<String, Vec<Chunk>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn exists(&self, bot_id: &str) -> Result<bool, RagError> {
        Ok(self
            .partitions
            .get(bot_id)
            .map(|rows| !rows.is_empty())
            .unwrap_or(false))
    }

    async fn replace_all(&self, bot_id: &str, chunks: &[Chunk]) -> Result<(), RagError> {
        self.partitions.insert(bot_id.to_string(), chunks.to_vec());
        Ok(())
    }

    async fn load_all(&self, bot_id: &str) -> Result<Vec<Chunk>, RagError> {
        Ok(self
            .partitions
            .get(bot_id)
            .map(|rows| rows.clone())
            .unwrap_or_default())
    }
}
