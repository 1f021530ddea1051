//! Chat interaction logging
//!
//! Best-effort: a failed log write warns and never surfaces to the
//! user. Callers fire-and-forget.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;

use bot_factory_core::Source;

/// One logged chat interaction
#[derive(Debug, Clone)]
pub struct ChatLogEntry {
    pub bot_id: String,
    pub question: String,
    pub response: String,
    pub sources: Vec<Source>,
}

/// Chat log sink
#[async_trait]
pub trait ChatLog: Send + Sync {
    async fn record(&self, entry: ChatLogEntry) -> Result<(), String>;
}

/// DynamoDB-backed chat log
pub struct DynamoChatLog {
    client: Client,
    table: String,
}

impl DynamoChatLog {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl ChatLog for DynamoChatLog {
    async fn record(&self, entry: ChatLogEntry) -> Result<(), String> {
        let now = chrono::Utc::now();
        let id = format!(
            "{}_{}",
            now.format("%Y%m%d%H%M%S"),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );

        let sources: Vec<AttributeValue> = entry
            .sources
            .iter()
            .map(|s| {
                AttributeValue::M(HashMap::from([
                    (
                        "category".to_string(),
                        AttributeValue::S(s.category.clone()),
                    ),
                    (
                        "similarity".to_string(),
                        AttributeValue::N(s.similarity.to_string()),
                    ),
                ]))
            })
            .collect();

        self.client
            .put_item()
            .table_name(&self.table)
            .item("id", AttributeValue::S(id))
            .item("bot_id", AttributeValue::S(entry.bot_id))
            .item("timestamp", AttributeValue::S(now.to_rfc3339()))
            .item("question", AttributeValue::S(entry.question))
            .item("response", AttributeValue::S(entry.response))
            .item(
                "source_count",
                AttributeValue::N(entry.sources.len().to_string()),
            )
            .item("sources", AttributeValue::L(sources))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        Ok(())
    }
}

/// Discards log entries; used with the in-memory storage backend
#[derive(Debug, Default)]
pub struct NoopChatLog;

#[async_trait]
impl ChatLog for NoopChatLog {
    async fn record(&self, _entry: ChatLogEntry) -> Result<(), String> {
        Ok(())
    }
}
