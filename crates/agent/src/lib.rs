//! Chat orchestration
//!
//! The `Chatbot` ties the retrieval pipeline to the generative model:
//! retrieve, format context, assemble messages, delegate, normalize
//! sources.

pub mod chatbot;

pub use chatbot::{ChatOutcome, Chatbot};
