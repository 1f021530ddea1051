//! HTTP server for the bot factory
//!
//! Thin axum surface over the chat core. Every bot gets:
//! - `POST /{bot_id}/chat` — send a message, get a response
//! - `POST /{bot_id}/chat/stream` — same, streamed over SSE
//! - `GET  /{bot_id}/config` — frontend config (enabled, name, ...)
//! - `GET  /{bot_id}/suggestions` — suggested starter questions
//! - `GET  /{bot_id}/warmup` — preload the embedding cache
//!
//! plus a global `GET /health`.

pub mod http;
pub mod logging;
pub mod state;

pub use http::create_router;
pub use logging::{ChatLog, DynamoChatLog, NoopChatLog};
pub use state::AppState;
