mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triage_core::{
    load_config, validate_config, GenerationRunner, LlmClient, MemoryTicketStore, OpenAiClient,
    SubscriberRegistry, TicketService, TicketStore,
};

use api::create_router;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("TRIAGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    // Create ticket store
    let ticket_store: Arc<dyn TicketStore> = Arc::new(MemoryTicketStore::new());
    info!("Ticket store initialized (in-memory)");

    // Create subscriber registry
    let registry = Arc::new(SubscriberRegistry::new(config.stream.subscriber_buffer));

    // Create generation runner if an LLM provider is configured
    let runner = match &config.llm {
        Some(llm_config) => {
            info!(
                "Initializing {} client (model: {})",
                llm_config.provider, llm_config.model
            );
            let client: Arc<dyn LlmClient> = Arc::new(OpenAiClient::from_config(llm_config));
            Some(Arc::new(GenerationRunner::new(
                client,
                llm_config.temperature,
            )))
        }
        None => {
            info!("No LLM provider configured; tickets will fail generation");
            None
        }
    };

    // Create ticket service
    let service = Arc::new(TicketService::new(ticket_store, registry, runner));

    // Create app state and router
    let app_state = Arc::new(AppState::new(config.clone(), service));
    let app = create_router(app_state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
