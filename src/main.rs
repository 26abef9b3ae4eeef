//! lmchat - chat front-end for a locally hosted language model
//!
//! One conversation, persisted in SQLite, answered one turn at a time by an
//! `OpenAI`-compatible server such as LM Studio.

mod api;
mod config;
mod context;
mod db;
mod llm;
mod render;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::Config;
use context::{metric_for, Budget, DEFAULT_CONTEXT_TOKENS};
use db::Database;
use llm::{InferenceClient, LmStudioClient, LoggingClient};
use runtime::{TurnCoordinator, WindowSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const INTERRUPTED_NOTICE: &str = "The server restarted before this reply finished.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lmchat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env();

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    if config.clear_on_start {
        let deleted = db.clear()?;
        tracing::info!(deleted, "Cleared history");
    }
    let interrupted = db.fail_interrupted(INTERRUPTED_NOTICE)?;
    if interrupted > 0 {
        tracing::warn!(count = interrupted, "Marked interrupted turns as failed");
    }

    // Inference backend
    let lmstudio = LmStudioClient::new(&config.inference)?;
    let context_tokens = match config.context_tokens {
        Some(tokens) => tokens,
        None => lmstudio.context_length().await.unwrap_or_else(|| {
            tracing::warn!(
                default = DEFAULT_CONTEXT_TOKENS,
                "Model context length unknown, using default"
            );
            DEFAULT_CONTEXT_TOKENS
        }),
    };
    let client: Arc<dyn InferenceClient> = Arc::new(LoggingClient::new(Arc::new(lmstudio)));

    let metric = metric_for(config.tokenizer);
    tracing::info!(
        url = %config.inference.base_url,
        model = %config.inference.model,
        context_tokens,
        history_turns = config.history_turns,
        tokenizer = metric.name(),
        "Inference backend configured"
    );

    let settings = WindowSettings {
        history_turns: config.history_turns,
        token_budget: Budget::for_context_length(context_tokens, &config.system_prompt, metric),
        system_prompt: config.system_prompt.clone(),
    };
    let coordinator = TurnCoordinator::restore(db, client, settings).await?;

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(AppState::new(coordinator))
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("lmchat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
