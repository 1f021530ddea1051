//! Embedding generation CLI
//!
//! Reads a bot's knowledge data, generates embeddings, and kill-and-fills
//! the bot's partition in the shared embedding table. Other bots'
//! embeddings are untouched.
//!
//! Regenerating costs embedding API credits, so an existing partition is
//! only overwritten with `--force`.
//!
//! Usage:
//!     bot-factory generate guitar
//!     bot-factory generate guitar --force

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use bot_factory_config::{load_settings, Settings, StorageBackend};
use bot_factory_rag::{
    connect_dynamodb, generate_bot_embeddings, ChunkStore, DynamoChunkStore, EmbeddingConfig,
    MemoryStore, OpenAiEmbedder,
};

#[derive(Parser, Debug)]
#[command(name = "bot-factory", version, about = "Bot factory embedding tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate embeddings for a bot's knowledge base
    Generate {
        /// The bot folder name under bots/ (e.g. 'guitar')
        bot_id: String,

        /// Regenerate even if embeddings already exist
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let env = std::env::var("BOT_FACTORY_ENV").ok();
    let settings = load_settings(env.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        Settings::default()
    });

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { bot_id, force } => generate(&settings, &bot_id, force).await,
    }
}

async fn generate(settings: &Settings, bot_id: &str, force: bool) -> anyhow::Result<()> {
    let store: Box<dyn ChunkStore> = match settings.storage.backend {
        StorageBackend::Dynamodb => {
            let client =
                connect_dynamodb(&settings.storage.region, &settings.storage.endpoint_url).await;
            Box::new(DynamoChunkStore::new(
                client,
                settings.storage.table.clone(),
            ))
        }
        StorageBackend::Memory => {
            // Useful only for dry runs; nothing persists past this process
            tracing::warn!("Memory backend selected; generated embeddings will not persist");
            Box::new(MemoryStore::new())
        }
    };

    if store.exists(bot_id).await? && !force {
        anyhow::bail!(
            "Embeddings already exist for '{}'. Re-run with --force to regenerate.",
            bot_id
        );
    }

    let embedder = OpenAiEmbedder::new(EmbeddingConfig {
        endpoint: settings.embeddings.endpoint.clone(),
        model: settings.embeddings.model.clone(),
        api_key: settings.embeddings.resolve_api_key(),
        ..Default::default()
    })?;

    let bots_dir = PathBuf::from(&settings.bots_dir);
    let summary = generate_bot_embeddings(&bots_dir, bot_id, &embedder, store.as_ref()).await?;

    println!("Embedding generation complete");
    println!("  Bot: {}", summary.bot_id);
    println!("  Total embeddings: {}", summary.total);
    for (category, count) in &summary.per_category {
        println!("    {}: {}", category, count);
    }
    println!(
        "  Stored in: {} (bot_id='{}')",
        settings.storage.table, summary.bot_id
    );

    Ok(())
}
