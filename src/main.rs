//! Gazzi Chat - a browser chat front end for a local Ollama model
//!
//! Serves a single chat page. Each browser tab gets its own in-memory
//! transcript; every question goes through a fixed prompt to the model.

mod api;
mod config;
mod engine;
mod llm;
mod session;

use api::{create_router, AppState};
use clap::Parser;
use config::Config;
use engine::ChatEngine;
use llm::{LlmService, LoggingService, OllamaService};
use session::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Browser chat for a local Ollama model. Configured through environment
/// variables (`GAZZI_PORT`, `OLLAMA_HOST`, `GAZZI_MODEL`, ...).
#[derive(Debug, Parser)]
#[command(name = "gazzi-chat", version, about)]
struct Cli {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gazzi_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env();

    tracing::info!(
        base_url = %config.ollama.base_url,
        model = %config.ollama.model,
        temperature = config.ollama.temperature,
        "Ollama backend configured"
    );

    let ollama: Arc<dyn LlmService> = Arc::new(OllamaService::new(&config.ollama)?);
    let backend: Arc<dyn LlmService> = Arc::new(LoggingService::new(ollama));
    let engine = Arc::new(ChatEngine::new(backend));

    let sessions = Arc::new(SessionRegistry::new(config.session_idle_timeout));
    let sweep_interval = config
        .session_idle_timeout
        .clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    let _sweeper = sessions.start_sweeper(sweep_interval);

    // Create application state
    let state = AppState::new(engine, sessions);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = config.listen_addr();
    tracing::info!("Gazzi Chat listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
