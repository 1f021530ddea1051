//! Core types for the bot factory
//!
//! This crate provides foundational types used across all other crates:
//! - Chunk and retrieval result types
//! - Chat message types
//! - Error types

pub mod chunk;
pub mod error;
pub mod message;

pub use chunk::{Chunk, RetrievalResult, Source};
pub use error::{Error, Result};
pub use message::{Message, Role};
