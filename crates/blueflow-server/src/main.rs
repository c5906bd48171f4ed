//! # blueflow-server
//!
//! HTTP server for the blueflow device discovery session.
//!
//! This binary provides:
//! - REST API for scanning, selecting and connecting to devices
//! - Connection history and paired device management
//! - OpenAPI documentation via Swagger UI
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development, with demo history and paired devices
//! BLUEFLOW__SEED__DEMO=true cargo run --package blueflow-server
//!
//! # Explicit configuration file
//! ./blueflow-server /etc/blueflow/config.toml
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;

use anyhow::Context;
use blueflow_core::{default_config_path, Config};
use blueflow_server::api::create_router;
use blueflow_server::logging;
use blueflow_server::state::AppState;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(default_config_path, PathBuf::from);
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    logging::init(&config.logging)?;
    info!(
        config = %config_path.display(),
        version = env!("CARGO_PKG_VERSION"),
        "Starting blueflow-server"
    );

    let addr = config.server.socket_addr()?;
    let state = AppState::new(config).context("Failed to start session")?;
    let app = create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
