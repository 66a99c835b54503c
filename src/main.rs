// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! unitconv-api server
//!
//! Google sign-in, JWT sessions and per-user meters-to-feet conversion history.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unitconv_api::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, MemoryDb, Store},
    services::GoogleClient,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, debug = config.debug, "Starting unitconv API");

    let db: Arc<dyn Store> = match &config.storage {
        StorageBackend::Firestore { project_id } => Arc::new(
            FirestoreDb::new(project_id)
                .await
                .context("Failed to connect to Firestore")?,
        ),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    if config.google_client_id.is_empty() {
        tracing::warn!("GOOGLE_OAUTH_CLIENT_ID is not set; Google login is disabled");
    }
    let google = Arc::new(GoogleClient::new(&config)?);

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, google));

    // Build router
    let app = unitconv_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("unitconv_api=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
