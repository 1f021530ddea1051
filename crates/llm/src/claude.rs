//! Claude backend
//!
//! Implements the Anthropic Messages API, non-streaming and SSE
//! streaming. Only text content is used; the system prompt is passed in
//! the request's `system` field.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use bot_factory_core::{Message, Role};

use crate::backend::ChatBackend;
use crate::LlmError;

/// Configuration for the Claude backend
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    /// API key (from ANTHROPIC_API_KEY or direct)
    pub api_key: String,
    /// Model id
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Request timeout
    pub timeout: Duration,
    /// API endpoint (for testing or proxy)
    pub endpoint: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1000,
            timeout: Duration::from_secs(60),
            endpoint: "https://api.anthropic.com".to_string(),
        }
    }
}

/// Claude Messages API backend
#[derive(Debug)]
pub struct ClaudeBackend {
    config: ClaudeConfig,
    client: Client,
}

impl ClaudeBackend {
    pub fn new(config: ClaudeConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration(
                "ANTHROPIC_API_KEY not set. Set it via environment or config.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn build_request(&self, system: &str, messages: &[Message], stream: bool) -> ClaudeRequest {
        ClaudeRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: system.to_string(),
            messages: convert_messages(messages),
            stream: Some(stream),
        }
    }

    async fn send(
        &self,
        request: &ClaudeRequest,
    ) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.endpoint))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for ClaudeBackend {
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<String, LlmError> {
        let request = self.build_request(system, messages, false);
        let response = self.send(&request).await?;

        let api_response: ClaudeApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text: String = api_response
            .content
            .iter()
            .map(|block| block.text.as_str())
            .collect();

        if text.is_empty() {
            return Err(LlmError::InvalidResponse(
                "Response contained no text content".to_string(),
            ));
        }

        Ok(text)
    }

    async fn complete_stream(
        &self,
        system: &str,
        messages: &[Message],
        tx: mpsc::Sender<String>,
    ) -> Result<String, LlmError> {
        let request = self.build_request(system, messages, true);
        let response = self.send(&request).await?;

        use futures::StreamExt;
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut full_text = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::Network(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(line_end) = buffer.find('\n') {
                let line = buffer[..line_end].trim().to_string();
                buffer = buffer[line_end + 1..].to_string();

                if line.is_empty() {
                    continue;
                }

                let Some(json_str) = line.strip_prefix("data: ") else {
                    continue;
                };

                if let Ok(event) = serde_json::from_str::<ClaudeStreamEvent>(json_str) {
                    match event {
                        ClaudeStreamEvent::ContentBlockDelta { delta, .. } => {
                            if let ClaudeDelta::TextDelta { text } = delta {
                                full_text.push_str(&text);
                                if tx.send(text).await.is_err() {
                                    // Receiver dropped; consumer cancelled
                                    tracing::debug!("Stream consumer gone, abandoning stream");
                                    return Ok(full_text);
                                }
                            }
                        }
                        ClaudeStreamEvent::Error { error } => {
                            return Err(LlmError::Api(error.message));
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(full_text)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn convert_messages(messages: &[Message]) -> Vec<ClaudeMessage> {
    messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| ClaudeMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        })
        .collect()
}

// =============================================================================
// Claude API types
// =============================================================================

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: usize,
    system: String,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeApiResponse {
    content: Vec<ClaudeTextBlock>,
}

#[derive(Debug, Deserialize)]
struct ClaudeTextBlock {
    #[serde(default)]
    text: String,
}

// Streaming event types
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeStreamEvent {
    MessageStart,
    ContentBlockStart,
    ContentBlockDelta { index: usize, delta: ClaudeDelta },
    ContentBlockStop,
    MessageDelta,
    MessageStop,
    Ping,
    Error { error: ClaudeError },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        #[allow(dead_code)] // Field required for serde deserialization
        partial_json: String,
    },
}

#[derive(Debug, Deserialize)]
struct ClaudeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = ClaudeConfig {
            api_key: String::new(),
            ..Default::default()
        };
        let err = ClaudeBackend::new(config).unwrap_err();
        assert!(matches!(err, LlmError::Configuration(_)));
    }

    #[test]
    fn test_request_serialization() {
        let request = ClaudeRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1000,
            system: "You are helpful".to_string(),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
            stream: Some(false),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("claude-sonnet-4-20250514"));
        assert!(json.contains("You are helpful"));
        assert!(json.contains("Hello"));
    }

    #[test]
    fn test_system_messages_filtered_from_conversation() {
        let messages = vec![
            Message {
                role: Role::System,
                content: "system prompt".to_string(),
            },
            Message::user("question"),
            Message::assistant("answer"),
        ];

        let converted = convert_messages(&messages);
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].role, "user");
        assert_eq!(converted[1].role, "assistant");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "content": [{"type": "text", "text": "Hello!"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;

        let response: ClaudeApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.content.len(), 1);
        assert_eq!(response.content[0].text, "Hello!");
    }

    #[test]
    fn test_stream_event_parsing() {
        let json = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#;
        let event: ClaudeStreamEvent = serde_json::from_str(json).unwrap();
        match event {
            ClaudeStreamEvent::ContentBlockDelta { index, delta } => {
                assert_eq!(index, 0);
                match delta {
                    ClaudeDelta::TextDelta { text } => assert_eq!(text, "Hi"),
                    other => panic!("unexpected delta: {:?}", other),
                }
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let json = r#"{"type":"message_stop"}"#;
        let event: ClaudeStreamEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ClaudeStreamEvent::MessageStop));
    }

    #[test]
    fn test_error_event_parsing() {
        let json = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let event: ClaudeStreamEvent = serde_json::from_str(json).unwrap();
        match event {
            ClaudeStreamEvent::Error { error } => assert_eq!(error.message, "Overloaded"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
