//! Application state
//!
//! Shared across all handlers. The caches live here (injected into the
//! components, not globals) so every handler sees the same warm state.

use std::sync::Arc;

use bot_factory_agent::Chatbot;
use bot_factory_config::{BotRegistry, Settings};
use bot_factory_rag::{ChunkStore, EmbeddingCache};

use crate::logging::ChatLog;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    /// Enabled bots discovered at startup
    pub registry: Arc<BotRegistry>,
    pub chatbot: Arc<Chatbot>,
    /// Shared with the retriever inside `chatbot`; exposed for warmup
    pub cache: Arc<EmbeddingCache>,
    pub store: Arc<dyn ChunkStore>,
    pub chat_log: Arc<dyn ChatLog>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        registry: BotRegistry,
        chatbot: Arc<Chatbot>,
        cache: Arc<EmbeddingCache>,
        store: Arc<dyn ChunkStore>,
        chat_log: Arc<dyn ChatLog>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            registry: Arc::new(registry),
            chatbot,
            cache,
            store,
            chat_log,
        }
    }
}
