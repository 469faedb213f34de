//! Pitwall Server
//!
//! Streams race telemetry over SSE and serves metrics and strategy calls

use anyhow::{Context, Result};
use pitwall_server::{api, config::ServerConfig, state, strategy::LlmStrategyClient};
use pitwall_sources::DirectoryStore;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Pitwall Server");

    let config = ServerConfig::load()?;
    if config.llm.api_key.is_none() {
        warn!("OPENAI_API_KEY not set, strategy calls will use the rule-based fallback");
    }

    let provider = Arc::new(
        LlmStrategyClient::new(config.llm.clone()).context("Failed to build LLM client")?,
    );
    let store = DirectoryStore::new(config.data_dir.clone());

    let bind_addr = config.bind_addr.clone();
    let state = state::AppState::new(config, store, provider);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
