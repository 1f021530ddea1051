//! Chatbot orchestrator
//!
//! Per request: retrieve relevant chunks for the bot, format them into
//! a context block, append the user's question with a fixed style
//! instruction, and delegate to the chat backend under the bot's system
//! prompt. Sources returned to the caller carry only category and
//! similarity.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use bot_factory_config::load_prompt_template;
use bot_factory_core::{Message, Result, Source};
use bot_factory_llm::ChatBackend;
use bot_factory_rag::{format_context, Retriever};

/// Capacity of the fragment channel handed to streaming consumers
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// A generated response plus its normalized sources
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub sources: Vec<Source>,
}

/// RAG chat orchestrator
///
/// System prompts are cached per bot for the process lifetime, like the
/// embedding cache: edit a prompt, restart to pick it up.
pub struct Chatbot {
    retriever: Arc<Retriever>,
    backend: Arc<dyn ChatBackend>,
    bots_dir: PathBuf,
    prompts: DashMap<String, String>,
}

impl Chatbot {
    pub fn new(
        retriever: Arc<Retriever>,
        backend: Arc<dyn ChatBackend>,
        bots_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            retriever,
            backend,
            bots_dir: bots_dir.into(),
            prompts: DashMap::new(),
        }
    }

    /// Generate a response for one user message
    ///
    /// `conversation_history` passes through verbatim ahead of the new
    /// user turn. `top_k` and `similarity_threshold` come from the
    /// bot's configuration, per invocation.
    pub async fn generate(
        &self,
        bot_id: &str,
        user_message: &str,
        conversation_history: &[Message],
        top_k: usize,
        similarity_threshold: f64,
    ) -> Result<ChatOutcome> {
        let (system_prompt, messages, sources) = self
            .prepare(
                bot_id,
                user_message,
                conversation_history,
                top_k,
                similarity_threshold,
            )
            .await?;

        let response = self.backend.complete(&system_prompt, &messages).await?;

        tracing::info!(
            bot_id = %bot_id,
            sources = sources.len(),
            model = %self.backend.model_name(),
            "Generated response"
        );

        Ok(ChatOutcome { response, sources })
    }

    /// Streaming variant: identical setup, fragments delivered through
    /// the returned receiver as they arrive
    ///
    /// The channel closing signals end of stream. Dropping the receiver
    /// abandons the generation.
    pub async fn generate_stream(
        &self,
        bot_id: &str,
        user_message: &str,
        conversation_history: &[Message],
        top_k: usize,
        similarity_threshold: f64,
    ) -> Result<(Vec<Source>, mpsc::Receiver<String>)> {
        let (system_prompt, messages, sources) = self
            .prepare(
                bot_id,
                user_message,
                conversation_history,
                top_k,
                similarity_threshold,
            )
            .await?;

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let backend = Arc::clone(&self.backend);
        let bot_id = bot_id.to_string();

        tokio::spawn(async move {
            if let Err(e) = backend.complete_stream(&system_prompt, &messages, tx).await {
                tracing::error!(bot_id = %bot_id, error = %e, "Streaming generation failed");
            }
        });

        Ok((sources, rx))
    }

    /// Shared setup: retrieval, context formatting, message assembly
    async fn prepare(
        &self,
        bot_id: &str,
        user_message: &str,
        conversation_history: &[Message],
        top_k: usize,
        similarity_threshold: f64,
    ) -> Result<(String, Vec<Message>, Vec<Source>)> {
        let results = self
            .retriever
            .retrieve(bot_id, user_message, top_k, similarity_threshold)
            .await?;

        let context = format_context(&results);
        let sources: Vec<Source> = results.iter().map(Source::from).collect();

        let mut messages = Vec::with_capacity(conversation_history.len() + 1);
        messages.extend_from_slice(conversation_history);
        messages.push(Message::user(build_user_content(&context, user_message)));

        let system_prompt = self.system_prompt(bot_id)?;

        Ok((system_prompt, messages, sources))
    }

    /// Load and cache the bot's system prompt, with today's date
    /// substituted into the `{current_date}` placeholder
    fn system_prompt(&self, bot_id: &str) -> Result<String> {
        if let Some(cached) = self.prompts.get(bot_id) {
            return Ok(cached.clone());
        }

        let template = load_prompt_template(&self.bots_dir, bot_id)?;
        let current_date = chrono::Local::now().format("%B %d, %Y").to_string();
        let prompt = template.replace("{current_date}", &current_date);

        self.prompts.insert(bot_id.to_string(), prompt.clone());
        tracing::info!(bot_id = %bot_id, "Loaded system prompt");
        Ok(prompt)
    }
}

/// Build the user turn: context block, literal question, style suffix
fn build_user_content(context: &str, user_message: &str) -> String {
    format!(
        "## Relevant Context:\n{}\n\n## User Question:\n{}\n\n\
         Remember: Keep your response short and conversational. \
         Write in PLAIN TEXT ONLY - do not use ** or any markdown. \
         If you can't answer from the context, say so politely.",
        context, user_message
    )
}
