//! DynamoDB chunk store
//!
//! One shared table holds every bot's chunks; `bot_id` is a plain
//! attribute, not an index, so partition-scoped operations scan the
//! full table and filter client-side. That matches the table's actual
//! scale (hundreds of rows); add a GSI on `bot_id` before it grows past
//! what a scan tolerates.

use std::collections::HashMap;
use std::time::Duration;

use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use async_trait::async_trait;

use bot_factory_core::Chunk;

use crate::store::ChunkStore;
use crate::RagError;

/// DynamoDB batch_write_item limit
const WRITE_BATCH_SIZE: usize = 25;

/// Connect a DynamoDB client
///
/// An empty `endpoint_url` targets real AWS; a non-empty one points at
/// LocalStack for local development.
pub async fn connect_dynamodb(region: &str, endpoint_url: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if !endpoint_url.is_empty() {
        loader = loader.endpoint_url(endpoint_url);
    }

    let shared_config = loader.load().await;
    Client::new(&shared_config)
}

/// Chunk store backed by a shared DynamoDB table
pub struct DynamoChunkStore {
    client: Client,
    table: String,
}

impl DynamoChunkStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Scan the whole table and keep this bot's rows
    async fn scan_partition(
        &self,
        bot_id: &str,
    ) -> Result<Vec<HashMap<String, AttributeValue>>, RagError> {
        let mut rows = Vec::new();
        let mut last_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let response = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(last_key)
                .send()
                .await
                .map_err(|e| RagError::Store(format!("scan {}: {}", self.table, e)))?;

            rows.extend(
                response
                    .items
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|item| attr_s(item, "bot_id") == Some(bot_id)),
            );

            last_key = response.last_evaluated_key;
            if last_key.is_none() {
                break;
            }
        }

        Ok(rows)
    }

    /// Send write requests in batches of 25, resubmitting unprocessed ones
    async fn write_batched(&self, requests: Vec<WriteRequest>) -> Result<(), RagError> {
        for batch in requests.chunks(WRITE_BATCH_SIZE) {
            let mut pending = batch.to_vec();

            while !pending.is_empty() {
                let response = self
                    .client
                    .batch_write_item()
                    .request_items(&self.table, pending)
                    .send()
                    .await
                    .map_err(|e| RagError::Store(format!("batch write {}: {}", self.table, e)))?;

                pending = response
                    .unprocessed_items
                    .unwrap_or_default()
                    .remove(&self.table)
                    .unwrap_or_default();

                if !pending.is_empty() {
                    tracing::warn!(
                        table = %self.table,
                        unprocessed = pending.len(),
                        "Resubmitting unprocessed batch writes"
                    );
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ChunkStore for DynamoChunkStore {
    async fn exists(&self, bot_id: &str) -> Result<bool, RagError> {
        let mut last_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let response = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(last_key)
                .send()
                .await
                .map_err(|e| RagError::Store(format!("scan {}: {}", self.table, e)))?;

            let found = response
                .items
                .as_deref()
                .unwrap_or_default()
                .iter()
                .any(|item| attr_s(item, "bot_id") == Some(bot_id));
            if found {
                return Ok(true);
            }

            last_key = response.last_evaluated_key;
            if last_key.is_none() {
                return Ok(false);
            }
        }
    }

    async fn replace_all(&self, bot_id: &str, chunks: &[Chunk]) -> Result<(), RagError> {
        // Kill: delete this bot's current rows
        let existing = self.scan_partition(bot_id).await?;

        if existing.is_empty() {
            tracing::info!(bot_id = %bot_id, "No existing embeddings to clear");
        } else {
            let deletes: Vec<WriteRequest> = existing
                .iter()
                .filter_map(|item| attr_s(item, "id").map(str::to_string))
                .map(|id| {
                    DeleteRequest::builder()
                        .key("id", AttributeValue::S(id))
                        .build()
                        .map(|del| WriteRequest::builder().delete_request(del).build())
                        .map_err(|e| RagError::Store(e.to_string()))
                })
                .collect::<Result<_, _>>()?;

            let deleted = deletes.len();
            self.write_batched(deletes).await?;
            tracing::info!(bot_id = %bot_id, deleted, "Cleared existing embeddings");
        }

        // Fill: insert the new set
        let puts: Vec<WriteRequest> = chunks
            .iter()
            .map(|chunk| {
                PutRequest::builder()
                    .set_item(Some(chunk_to_item(chunk)))
                    .build()
                    .map(|put| WriteRequest::builder().put_request(put).build())
                    .map_err(|e| RagError::Store(e.to_string()))
            })
            .collect::<Result<_, _>>()?;

        self.write_batched(puts).await?;
        tracing::info!(bot_id = %bot_id, stored = chunks.len(), "Stored embeddings");
        Ok(())
    }

    async fn load_all(&self, bot_id: &str) -> Result<Vec<Chunk>, RagError> {
        let rows = self.scan_partition(bot_id).await?;

        let mut chunks = Vec::with_capacity(rows.len());
        for row in &rows {
            match item_to_chunk(row) {
                Some(chunk) => chunks.push(chunk),
                None => {
                    tracing::warn!(
                        bot_id = %bot_id,
                        id = attr_s(row, "id").unwrap_or("?"),
                        "Skipping malformed row"
                    );
                }
            }
        }

        Ok(chunks)
    }
}

fn attr_s<'a>(item: &'a HashMap<String, AttributeValue>, key: &str) -> Option<&'a str> {
    item.get(key).and_then(|v| v.as_s().ok()).map(String::as_str)
}

/// Marshal a chunk into a DynamoDB item; the embedding becomes a list
/// of number attributes
fn chunk_to_item(chunk: &Chunk) -> HashMap<String, AttributeValue> {
    let embedding = chunk
        .embedding
        .iter()
        .map(|x| AttributeValue::N(x.to_string()))
        .collect();

    HashMap::from([
        ("id".to_string(), AttributeValue::S(chunk.id.clone())),
        ("bot_id".to_string(), AttributeValue::S(chunk.bot_id.clone())),
        (
            "category".to_string(),
            AttributeValue::S(chunk.category.clone()),
        ),
        (
            "heading".to_string(),
            AttributeValue::S(chunk.heading.clone()),
        ),
        ("text".to_string(), AttributeValue::S(chunk.text.clone())),
        ("embedding".to_string(), AttributeValue::L(embedding)),
    ])
}

fn item_to_chunk(item: &HashMap<String, AttributeValue>) -> Option<Chunk> {
    let embedding = item
        .get("embedding")?
        .as_l()
        .ok()?
        .iter()
        .map(|v| v.as_n().ok().and_then(|n| n.parse::<f64>().ok()))
        .collect::<Option<Vec<f64>>>()?;

    Some(Chunk {
        id: attr_s(item, "id")?.to_string(),
        bot_id: attr_s(item, "bot_id")?.to_string(),
        category: attr_s(item, "category")?.to_string(),
        heading: attr_s(item, "heading").unwrap_or_default().to_string(),
        text: attr_s(item, "text")?.to_string(),
        embedding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        Chunk {
            id: "guitar_gear".to_string(),
            bot_id: "guitar".to_string(),
            category: "Gear".to_string(),
            heading: "Guitars".to_string(),
            text: "Fender Stratocaster".to_string(),
            embedding: vec![0.25, -1.5, 3.0],
        }
    }

    #[test]
    fn test_item_roundtrip() {
        let chunk = sample_chunk();
        let item = chunk_to_item(&chunk);
        let back = item_to_chunk(&item).unwrap();

        assert_eq!(back.id, chunk.id);
        assert_eq!(back.bot_id, chunk.bot_id);
        assert_eq!(back.category, chunk.category);
        assert_eq!(back.heading, chunk.heading);
        assert_eq!(back.text, chunk.text);
        assert_eq!(back.embedding, chunk.embedding);
    }

    #[test]
    fn test_malformed_item_is_rejected() {
        let mut item = chunk_to_item(&sample_chunk());
        item.insert(
            "embedding".to_string(),
            AttributeValue::S("not a list".to_string()),
        );
        assert!(item_to_chunk(&item).is_none());

        let mut item = chunk_to_item(&sample_chunk());
        item.remove("text");
        assert!(item_to_chunk(&item).is_none());
    }

    #[test]
    fn test_missing_heading_defaults_to_empty() {
        let mut item = chunk_to_item(&sample_chunk());
        item.remove("heading");
        let back = item_to_chunk(&item).unwrap();
        assert_eq!(back.heading, "");
    }
}
