//! # celeste-server
//!
//! Local back end for the Celeste chat front-end.
//!
//! This binary provides:
//! - **Completion relay** (`POST /api/query`) that forwards chat-completion
//!   requests to the upstream LLM API and streams the answer back untouched
//! - **Chat store API** (`/api/chats`) over the local SQLite transcript store
//! - **Health check** (`GET /health`)

mod api;
mod config;
mod error;
mod relay;

use std::sync::{Arc, Mutex};

use anyhow::Context;
use celeste_shared::constants::APP_NAME;
use celeste_store::Database;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::{KeyPolicy, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,celeste_server=debug")),
        )
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    if config.api_key.is_none() {
        match config.key_policy {
            KeyPolicy::ClientFirst => {
                info!("No API_KEY set; requests must carry their own apiKey")
            }
            KeyPolicy::ServerOnly => {
                warn!("No API_KEY set with server-only key policy; every query will fail")
            }
        }
    }

    // -----------------------------------------------------------------------
    // 3. Open the chat store and the upstream HTTP client
    // -----------------------------------------------------------------------
    let database = match &config.database_path {
        Some(path) => Database::open_at(path),
        None => Database::open(),
    }
    .context("failed to open chat database")?;
    let db = Arc::new(Mutex::new(database));

    let client = reqwest::Client::builder()
        .user_agent(concat!("celeste/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let app_state = AppState::new(&config, client, db.clone());

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    // -----------------------------------------------------------------------
    // 5. Close the database
    // -----------------------------------------------------------------------
    match Arc::try_unwrap(db) {
        Ok(mutex) => match mutex.into_inner() {
            Ok(database) => database.close().context("failed to close chat database")?,
            Err(_) => warn!("Database lock poisoned at shutdown; closing on drop"),
        },
        Err(_) => warn!("Database still in use at shutdown; closing on drop"),
    }

    Ok(())
}
