//! HTTP endpoints
//!
//! Per-bot chat routes plus health. Internal failures return a generic
//! detail string; the real error goes to the log, never the client.

use std::convert::Infallible;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bot_factory_core::Message;

use crate::logging::ChatLogEntry;
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.settings.server.cors_origins,
        state.settings.server.cors_enabled,
    );

    Router::new()
        .route("/:bot_id/chat", post(chat))
        .route("/:bot_id/chat/stream", post(chat_stream))
        .route("/:bot_id/config", get(bot_config))
        .route("/:bot_id/suggestions", get(suggestions))
        .route("/:bot_id/warmup", get(warmup))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build the CORS layer from configured origins
///
/// Disabled or empty configuration falls back to permissive (dev only).
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled || origins.is_empty() {
        tracing::warn!("CORS permissive - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin = %origin, "Invalid CORS origin");
                None
            })
        })
        .collect();

    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Chat request
#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    conversation_history: Vec<Message>,
}

/// Chat response
#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    sources: Vec<bot_factory_core::Source>,
}

/// Error body with a generic detail string
#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

fn error_response(status: StatusCode, detail: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            detail: detail.to_string(),
        }),
    )
}

/// Validate the request against the registry; returns the bot's
/// retrieval defaults
fn validate_chat(
    state: &AppState,
    bot_id: &str,
    message: &str,
) -> Result<bot_factory_config::RagDefaults, (StatusCode, Json<ErrorResponse>)> {
    let Some(config) = state.registry.get(bot_id) else {
        return Err(error_response(StatusCode::NOT_FOUND, "Unknown bot"));
    };

    if message.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Message cannot be empty",
        ));
    }

    Ok(config.bot.rag)
}

/// Send a message to a bot and get a response
async fn chat(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let rag = validate_chat(&state, &bot_id, &request.message)?;

    let outcome = state
        .chatbot
        .generate(
            &bot_id,
            &request.message,
            &request.conversation_history,
            rag.top_k,
            rag.similarity_threshold,
        )
        .await
        .map_err(|e| {
            tracing::error!(bot_id = %bot_id, error = %e, "Chat failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing your message",
            )
        })?;

    // Best-effort interaction log; never blocks the response
    let log = ChatLogEntry {
        bot_id: bot_id.clone(),
        question: request.message,
        response: outcome.response.clone(),
        sources: outcome.sources.clone(),
    };
    let chat_log = state.chat_log.clone();
    tokio::spawn(async move {
        if let Err(e) = chat_log.record(log).await {
            tracing::warn!(bot_id = %bot_id, error = %e, "Failed to log chat interaction");
        }
    });

    Ok(Json(ChatResponse {
        response: outcome.response,
        sources: outcome.sources,
    }))
}

/// Streaming chat over SSE
///
/// The first event is named `sources` and carries the JSON source list;
/// unnamed data events follow with text fragments as the model emits
/// them. The stream closing signals completion.
async fn chat_stream(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ErrorResponse>)> {
    let rag = validate_chat(&state, &bot_id, &request.message)?;

    let (sources, rx) = state
        .chatbot
        .generate_stream(
            &bot_id,
            &request.message,
            &request.conversation_history,
            rag.top_k,
            rag.similarity_threshold,
        )
        .await
        .map_err(|e| {
            tracing::error!(bot_id = %bot_id, error = %e, "Streaming chat failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error processing your message",
            )
        })?;

    let sources_event = Event::default()
        .event("sources")
        .data(serde_json::to_string(&sources).unwrap_or_else(|_| "[]".to_string()));

    let stream = futures::stream::once(async move { Ok::<Event, Infallible>(sources_event) })
        .chain(ReceiverStream::new(rx).map(|fragment| Ok(Event::default().data(fragment))));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Bot configuration for the frontend
#[derive(Debug, Serialize)]
struct BotConfigResponse {
    enabled: bool,
    name: String,
    personality: String,
}

/// Return bot configuration for the frontend
///
/// Unknown bots answer `enabled: false` rather than an error so the
/// frontend can probe safely.
async fn bot_config(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> Json<BotConfigResponse> {
    match state.registry.get(&bot_id) {
        Some(config) => Json(BotConfigResponse {
            enabled: config.bot.enabled,
            name: config.bot.name.clone(),
            personality: config.bot.personality.clone(),
        }),
        None => Json(BotConfigResponse {
            enabled: false,
            name: bot_id,
            personality: "friendly".to_string(),
        }),
    }
}

/// Return suggested starter questions
async fn suggestions(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> Json<serde_json::Value> {
    let suggestions = state
        .registry
        .get(&bot_id)
        .map(|config| config.suggestions.clone())
        .unwrap_or_default();

    Json(serde_json::json!({ "suggestions": suggestions }))
}

/// Preload the embedding cache so the first question is fast
async fn warmup(
    State(state): State<AppState>,
    Path(bot_id): Path<String>,
) -> Json<serde_json::Value> {
    if state.registry.get(&bot_id).is_none() {
        return Json(serde_json::json!({ "status": "error" }));
    }

    match state.cache.get_or_load(&bot_id, state.store.as_ref()).await {
        Ok(chunks) => Json(serde_json::json!({
            "status": "warm",
            "embeddings": chunks.len(),
        })),
        Err(e) => {
            tracing::error!(bot_id = %bot_id, error = %e, "Warmup failed");
            Json(serde_json::json!({ "status": "error" }))
        }
    }
}

/// Health check
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "bots": state.registry.len(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bot_factory_agent::Chatbot;
    use bot_factory_config::{BotRegistry, Settings};
    use bot_factory_llm::{ChatBackend, LlmError};
    use bot_factory_rag::{ChunkStore, Embedder, EmbeddingCache, MemoryStore, RagError, Retriever};

    use super::*;
    use crate::logging::NoopChatLog;

    struct StubEmbedder;

    #[async_trait::async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f64>, RagError> {
            Ok(vec![1.0])
        }
    }

    struct StubBackend;

    #[async_trait::async_trait]
    impl ChatBackend for StubBackend {
        async fn complete(&self, _system: &str, _messages: &[Message]) -> Result<String, LlmError> {
            Ok("ok".to_string())
        }

        async fn complete_stream(
            &self,
            _system: &str,
            _messages: &[Message],
            _tx: tokio::sync::mpsc::Sender<String>,
        ) -> Result<String, LlmError> {
            Ok("ok".to_string())
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn test_state() -> AppState {
        let store: Arc<dyn ChunkStore> = Arc::new(MemoryStore::new());
        let cache = Arc::new(EmbeddingCache::new());
        let retriever = Arc::new(Retriever::new(
            Arc::new(StubEmbedder),
            Arc::clone(&store),
            Arc::clone(&cache),
        ));
        let chatbot = Arc::new(Chatbot::new(retriever, Arc::new(StubBackend), "bots"));

        AppState::new(
            Settings::default(),
            BotRegistry::discover("/nonexistent"),
            chatbot,
            cache,
            store,
            Arc::new(NoopChatLog),
        )
    }

    #[test]
    fn test_router_creation() {
        let _ = create_router(test_state());
    }

    #[test]
    fn test_unknown_bot_is_404() {
        let state = test_state();
        let err = validate_chat(&state, "ghost", "hello").unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_empty_message_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let bot_dir = dir.path().join("guitar");
        std::fs::create_dir_all(&bot_dir).unwrap();
        std::fs::write(
            bot_dir.join("config.yml"),
            "bot:\n  id: guitar\n  enabled: true\n",
        )
        .unwrap();

        let mut state = test_state();
        state.registry = Arc::new(BotRegistry::discover(dir.path()));

        let err = validate_chat(&state, "guitar", "   ").unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let rag = validate_chat(&state, "guitar", "real question").unwrap();
        assert_eq!(rag.top_k, 5);
    }
}
