//! HTTP API for Sombra operations.
//!
//! Exposes the operation lifecycle, daily missions, peer review and the
//! maintenance job triggers over JSON, plus an SSE stream of domain events.

mod auth;
mod config;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use database::Database;
use dispatch::{LoggingNotifier, Notifier, PushRelayConfig, PushRelayNotifier};
use engine::{Engine, LocalPhotoStorage};
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting Sombra API");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    tokio::fs::create_dir_all(&config.photo_dir).await?;
    let storage = LocalPhotoStorage::new(&config.photo_dir, &config.photo_base_url);

    let notifier: Arc<dyn Notifier> = match &config.push_relay_url {
        Some(url) => {
            let mut relay = PushRelayConfig::new(url);
            if let Some(token) = &config.push_relay_token {
                relay = relay.with_token(token);
            }
            info!(url = %url, "Delivering notifications through push relay");
            Arc::new(PushRelayNotifier::new(relay)?)
        }
        None => {
            info!("PUSH_RELAY_URL not set, notifications will only be logged");
            Arc::new(LoggingNotifier)
        }
    };

    let database = db.clone();
    let engine = Engine::new(db, Arc::new(storage), notifier).with_policy(config.policy.clone());
    let seeded = engine.seed_default_catalog().await?;
    info!(seeded, "Mission catalog ready");

    // Build application state
    let state = AppState::new(engine, config.job_token.clone());

    // Build router
    let app = routes::router()
        .nest_service("/photos", ServeDir::new(&config.photo_dir))
        .with_state(state);

    // Start server
    info!(addr = %config.addr, "Sombra API listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    database.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for shutdown signal: {}", e);
    }
}
