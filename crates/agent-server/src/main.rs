//! research-agent HTTP Server
//!
//! Axum server in front of the agent session loop: pick a strategy, a model
//! and a set of research capabilities per request, share one conversation
//! memory across turns.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::Credentials;
use agent_runtime::DefaultModelFactory;

use crate::config::ServerConfig;
use crate::handlers::{
    chat_handler, clear_history, get_history, health_check, list_capabilities, list_models,
};
use crate::state::AppState;

/// Router with every route and middleware layer
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/capabilities", get(list_capabilities))
        .route("/api/models", get(list_models))
        // Agent API
        .route("/api/chat", post(chat_handler))
        .route("/api/history", get(get_history).delete(clear_history))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();
    let credentials = Credentials::from_env();
    tracing::info!(keys = ?credentials.keys().collect::<Vec<_>>(), "credentials loaded");

    let models = Arc::new(DefaultModelFactory::from_env()?);
    let state = AppState::new(models, credentials, config.clone())?;

    tracing::info!("Registered {} capabilities:", state.registry.len());
    for status in state.registry.status() {
        match status.reason {
            None => tracing::info!("  ✓ {}", status.name),
            Some(reason) => tracing::warn!("  ✗ {} ({reason})", status.name),
        }
    }

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 research-agent server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!(
        strategy = %config.default_strategy,
        model = %config.default_model,
        timeout = ?config.invoke_timeout,
        "defaults"
    );
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health           - Health check");
    tracing::info!("  GET    /api/capabilities - Capability availability");
    tracing::info!("  GET    /api/models       - List models");
    tracing::info!("  POST   /api/chat         - Run one turn");
    tracing::info!("  GET    /api/history      - Conversation turns");
    tracing::info!("  DELETE /api/history      - Clear conversation");

    axum::serve(listener, app(state)).await?;

    Ok(())
}
