use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use recoup_agent::{BasePrompt, SessionInitializer, UuidIds};
use recoup_core::config::RecoupConfig;
use recoup_memory::{KnowledgeRenderer, MemoryManager};
use tracing::info;

mod app;
mod http;

/// HTTP front for chat session start and stored memories.
#[derive(Debug, Parser)]
#[command(name = "recoup-gateway", version)]
struct Args {
    /// Path to recoup.toml (falls back to RECOUP_CONFIG, then ~/.recoup/recoup.toml).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recoup_gateway=info,recoup_agent=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    // load config: --config > RECOUP_CONFIG env > ~/.recoup/recoup.toml
    let config_path = args.config.or_else(|| std::env::var("RECOUP_CONFIG").ok());
    let config = RecoupConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        RecoupConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    recoup_memory::db::init_db(&db)?;
    info!("database migrations complete");

    let memory = Arc::new(MemoryManager::new(db));
    let knowledge = Arc::new(KnowledgeRenderer::new(memory.clone(), &config.knowledge)?);
    let base = BasePrompt::load(config.prompt.base_prompt_path.as_deref());

    let sessions = SessionInitializer::with_collaborators(
        base,
        memory.clone(),
        memory.clone(),
        knowledge,
        Arc::new(UuidIds),
    );

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, memory, sessions));
    let router = app::build_router(state);

    info!("Recoup gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
