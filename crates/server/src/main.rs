//! Bot factory server entry point

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use bot_factory_agent::Chatbot;
use bot_factory_config::{load_settings, BotRegistry, Settings, StorageBackend};
use bot_factory_llm::{ChatBackend, ClaudeBackend, ClaudeConfig};
use bot_factory_rag::{
    connect_dynamodb, ChunkStore, DynamoChunkStore, EmbeddingCache, EmbeddingConfig,
    MemoryStore, OpenAiEmbedder, Retriever,
};
use bot_factory_server::{create_router, AppState, ChatLog, DynamoChatLog, NoopChatLog};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("BOT_FACTORY_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    tracing::info!("Starting bot factory server v{}", env!("CARGO_PKG_VERSION"));

    let registry = BotRegistry::discover(&settings.bots_dir);
    tracing::info!(
        bots = registry.len(),
        bots_dir = %settings.bots_dir,
        "Discovered bots"
    );
    if registry.is_empty() {
        tracing::warn!("No enabled bots found; only /health will respond usefully");
    }

    // Storage + chat log share one client when DynamoDB is configured
    let (store, chat_log): (Arc<dyn ChunkStore>, Arc<dyn ChatLog>) =
        match settings.storage.backend {
            StorageBackend::Dynamodb => {
                let client =
                    connect_dynamodb(&settings.storage.region, &settings.storage.endpoint_url)
                        .await;
                tracing::info!(
                    table = %settings.storage.table,
                    logs_table = %settings.storage.logs_table,
                    "Using DynamoDB storage"
                );
                (
                    Arc::new(DynamoChunkStore::new(
                        client.clone(),
                        settings.storage.table.clone(),
                    )),
                    Arc::new(DynamoChatLog::new(
                        client,
                        settings.storage.logs_table.clone(),
                    )),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; embeddings must be generated in-process");
                (Arc::new(MemoryStore::new()), Arc::new(NoopChatLog))
            }
        };

    let embedder = Arc::new(OpenAiEmbedder::new(EmbeddingConfig {
        endpoint: settings.embeddings.endpoint.clone(),
        model: settings.embeddings.model.clone(),
        api_key: settings.embeddings.resolve_api_key(),
        ..Default::default()
    })?);

    let backend: Arc<dyn ChatBackend> = Arc::new(ClaudeBackend::new(ClaudeConfig {
        api_key: settings.llm.resolve_api_key(),
        model: settings.llm.model.clone(),
        max_tokens: settings.llm.max_tokens,
        endpoint: settings.llm.endpoint.clone(),
        ..Default::default()
    })?);

    let cache = Arc::new(EmbeddingCache::new());
    let retriever = Arc::new(Retriever::new(
        embedder,
        Arc::clone(&store),
        Arc::clone(&cache),
    ));
    let chatbot = Arc::new(Chatbot::new(
        retriever,
        backend,
        PathBuf::from(&settings.bots_dir),
    ));

    let port = settings.server.port;
    let state = AppState::new(settings, registry, chatbot, cache, store, chat_log);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
