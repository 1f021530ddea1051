//! Chat backend trait

use async_trait::async_trait;
use tokio::sync::mpsc;

use bot_factory_core::Message;

use crate::LlmError;

/// Generative model seam
///
/// The system prompt travels separately from the conversation messages,
/// matching the Anthropic Messages API shape. Failures surface to the
/// caller unretried; retry policy belongs to the HTTP layer if anywhere.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generate a complete response
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<String, LlmError>;

    /// Generate a response, sending text fragments through `tx` as they
    /// arrive
    ///
    /// Returns the accumulated full text once the stream terminates.
    /// A dropped receiver abandons the stream; that is cancellation,
    /// not an error.
    async fn complete_stream(
        &self,
        system: &str,
        messages: &[Message],
        tx: mpsc::Sender<String>,
    ) -> Result<String, LlmError>;

    /// Model identifier for logging
    fn model_name(&self) -> &str;
}
