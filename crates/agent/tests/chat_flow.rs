//! Integration tests for the chat flow
//!
//! Drives the chatbot end-to-end against an in-memory store, a
//! deterministic embedder, and a scripted chat backend that records the
//! prompts it receives.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use bot_factory_agent::Chatbot;
use bot_factory_core::{Chunk, Message};
use bot_factory_llm::{ChatBackend, LlmError};
use bot_factory_rag::{ChunkStore, Embedder, EmbeddingCache, MemoryStore, RagError, Retriever};

/// Maps marker words to fixed vectors so similarities are predictable
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, RagError> {
        // The query embeds to [1, 0]; chunk vectors are seeded directly
        let _ = text;
        Ok(vec![1.0, 0.0])
    }
}

/// Scripted backend that records what it was asked
struct ScriptedBackend {
    reply: String,
    calls: Mutex<Vec<(String, Vec<Message>)>>,
}

impl ScriptedBackend {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn last_user_content(&self) -> String {
        let calls = self.calls.lock();
        let (_, messages) = calls.last().expect("backend never called");
        messages.last().expect("no messages").content.clone()
    }

    fn last_system(&self) -> String {
        self.calls.lock().last().expect("backend never called").0.clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<String, LlmError> {
        self.calls
            .lock()
            .push((system.to_string(), messages.to_vec()));
        Ok(self.reply.clone())
    }

    async fn complete_stream(
        &self,
        system: &str,
        messages: &[Message],
        tx: mpsc::Sender<String>,
    ) -> Result<String, LlmError> {
        self.calls
            .lock()
            .push((system.to_string(), messages.to_vec()));
        for fragment in self.reply.split_inclusive(' ') {
            if tx.send(fragment.to_string()).await.is_err() {
                break;
            }
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Chunk whose cosine similarity to the [1, 0] query is `target`
fn chunk(bot_id: &str, id: &str, category: &str, text: &str, target: f64) -> Chunk {
    Chunk {
        id: format!("{}_{}", bot_id, id),
        bot_id: bot_id.to_string(),
        category: category.to_string(),
        heading: String::new(),
        text: text.to_string(),
        embedding: vec![target, (1.0 - target * target).sqrt()],
    }
}

fn write_prompt(bots_dir: &Path, bot_id: &str) {
    let dir = bots_dir.join(bot_id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("prompt.yml"),
        "prompt: |\n  You answer questions about a musician. Today is {current_date}.\n",
    )
    .unwrap();
}

struct Harness {
    chatbot: Chatbot,
    backend: Arc<ScriptedBackend>,
    store: Arc<MemoryStore>,
    _bots_dir: tempfile::TempDir,
}

async fn harness(bot_id: &str, chunks: Vec<Chunk>, reply: &str) -> Harness {
    let bots_dir = tempfile::tempdir().unwrap();
    write_prompt(bots_dir.path(), bot_id);

    let store = Arc::new(MemoryStore::new());
    store.replace_all(bot_id, &chunks).await.unwrap();

    let retriever = Arc::new(Retriever::new(
        Arc::new(KeywordEmbedder),
        Arc::clone(&store) as Arc<dyn ChunkStore>,
        Arc::new(EmbeddingCache::new()),
    ));

    let backend = Arc::new(ScriptedBackend::new(reply));
    let chatbot = Chatbot::new(
        retriever,
        Arc::clone(&backend) as Arc<dyn ChatBackend>,
        bots_dir.path(),
    );

    Harness {
        chatbot,
        backend,
        store,
        _bots_dir: bots_dir,
    }
}

#[tokio::test]
async fn test_generate_returns_ranked_sources() {
    let h = harness(
        "guitar",
        vec![
            chunk("guitar", "low", "History", "Started in 2005", 0.3),
            chunk("guitar", "high", "Gear", "Fender Stratocaster", 0.8),
            chunk("guitar", "mid", "Lessons", "Weekly practice", 0.5),
        ],
        "I play a Stratocaster.",
    )
    .await;

    let outcome = h
        .chatbot
        .generate("guitar", "What guitar do you play?", &[], 2, 0.4)
        .await
        .unwrap();

    assert_eq!(outcome.response, "I play a Stratocaster.");
    assert_eq!(outcome.sources.len(), 2);
    assert_eq!(outcome.sources[0].category, "Gear");
    assert_eq!(outcome.sources[1].category, "Lessons");
    assert!(outcome.sources[0].similarity > outcome.sources[1].similarity);
}

#[tokio::test]
async fn test_prompt_carries_context_and_question() {
    let h = harness(
        "guitar",
        vec![chunk("guitar", "gear", "Gear", "Fender Stratocaster", 0.9)],
        "ok",
    )
    .await;

    h.chatbot
        .generate("guitar", "What gear?", &[], 5, 0.2)
        .await
        .unwrap();

    let content = h.backend.last_user_content();
    assert!(content.contains("[GEAR]\nFender Stratocaster"));
    assert!(content.contains("## User Question:\nWhat gear?"));
    assert!(content.contains("PLAIN TEXT ONLY"));

    // Date placeholder substituted, not echoed
    let system = h.backend.last_system();
    assert!(!system.contains("{current_date}"));
    assert!(system.contains("You answer questions about a musician."));
}

#[tokio::test]
async fn test_empty_corpus_reaches_prompt_as_sentinel() {
    let h = harness("guitar", Vec::new(), "I don't know.").await;

    let outcome = h
        .chatbot
        .generate("guitar", "Anything?", &[], 5, 0.2)
        .await
        .unwrap();

    assert!(outcome.sources.is_empty());
    let content = h.backend.last_user_content();
    assert!(content.contains("No relevant information found."));
}

#[tokio::test]
async fn test_history_passes_through_ahead_of_user_turn() {
    let h = harness(
        "guitar",
        vec![chunk("guitar", "gear", "Gear", "Strat", 0.9)],
        "ok",
    )
    .await;

    let history = vec![
        Message::user("First question"),
        Message::assistant("First answer"),
    ];

    h.chatbot
        .generate("guitar", "Follow-up", &history, 5, 0.2)
        .await
        .unwrap();

    let calls = h.backend.calls.lock();
    let (_, messages) = calls.last().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].content, "First question");
    assert_eq!(messages[1].content, "First answer");
    assert!(messages[2].content.contains("Follow-up"));
}

#[tokio::test]
async fn test_streaming_yields_fragments_and_sources() {
    let h = harness(
        "guitar",
        vec![chunk("guitar", "gear", "Gear", "Strat", 0.9)],
        "one two three",
    )
    .await;

    let (sources, mut rx) = h
        .chatbot
        .generate_stream("guitar", "What gear?", &[], 5, 0.2)
        .await
        .unwrap();

    assert_eq!(sources.len(), 1);

    let mut accumulated = String::new();
    while let Some(fragment) = rx.recv().await {
        accumulated.push_str(&fragment);
    }
    assert_eq!(accumulated, "one two three");
}

#[tokio::test]
async fn test_missing_prompt_file_is_config_error() {
    let bots_dir = tempfile::tempdir().unwrap();
    // No prompt.yml written for this bot
    let store = Arc::new(MemoryStore::new());
    let retriever = Arc::new(Retriever::new(
        Arc::new(KeywordEmbedder),
        Arc::clone(&store) as Arc<dyn ChunkStore>,
        Arc::new(EmbeddingCache::new()),
    ));
    let backend = Arc::new(ScriptedBackend::new("unused"));
    let chatbot = Chatbot::new(retriever, backend, bots_dir.path());

    let err = chatbot.generate("ghost", "Hello?", &[], 5, 0.2).await.unwrap_err();
    assert!(matches!(err, bot_factory_core::Error::Config(_)));
}

#[tokio::test]
async fn test_regeneration_is_invisible_until_restart() {
    let h = harness(
        "guitar",
        vec![chunk("guitar", "gear", "Gear", "Strat", 0.9)],
        "ok",
    )
    .await;

    // Warm the cache
    let first = h
        .chatbot
        .generate("guitar", "What gear?", &[], 5, 0.2)
        .await
        .unwrap();
    assert_eq!(first.sources.len(), 1);

    // Kill-and-fill adds a second chunk behind the warm cache
    h.store
        .replace_all(
            "guitar",
            &[
                chunk("guitar", "gear", "Gear", "Strat", 0.9),
                chunk("guitar", "amps", "Amps", "Tube amp", 0.9),
            ],
        )
        .await
        .unwrap();

    let second = h
        .chatbot
        .generate("guitar", "What gear?", &[], 5, 0.2)
        .await
        .unwrap();
    // Still the old snapshot
    assert_eq!(second.sources.len(), 1);
}
