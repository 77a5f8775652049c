// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scan-Tracker API Server
//!
//! Serves the scanner UI: sign-in, product lookups by serial number, and the
//! scan history dashboard.

use scan_tracker::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryDb},
    services::{
        HostedAuthClient, IdentityProvider, MemoryIdentity, ProductDirectory, ScanLedger,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        ledger_policy = ?config.ledger_policy,
        "Starting Scan-Tracker API"
    );

    let (directory, ledger): (Arc<dyn ProductDirectory>, Arc<dyn ScanLedger>) =
        match config.store_backend {
            StoreBackend::Firestore => {
                let db = Arc::new(FirestoreDb::new(&config.gcp_project_id).await?);
                (db.clone(), db)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                let db = Arc::new(MemoryDb::new());
                (db.clone(), db)
            }
        };

    let identity: Arc<dyn IdentityProvider> = match &config.auth_url {
        Some(url) => {
            tracing::info!(auth_url = %url, "Using hosted identity provider");
            Arc::new(HostedAuthClient::new(url, &config.auth_api_key)?)
        }
        None => {
            tracing::warn!("AUTH_URL not set; using in-memory identity provider");
            Arc::new(MemoryIdentity::new())
        }
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), directory, ledger, identity));

    // Build router
    let app = scan_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scan_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
