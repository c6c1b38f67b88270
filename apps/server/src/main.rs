//! Tonearm Server - standalone media hierarchy bridge.
//!
//! Runs the HTTP/WebSocket service as a background daemon: declaring
//! clients push their media tree over the WebSocket bridge, browse clients
//! read it over HTTP and report selections back.

mod config;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::signal;
use tonearm_core::{start_server, AppState};

use crate::config::ServerConfig;

/// Tonearm Server - media hierarchy bridge for browse clients.
#[derive(Parser, Debug)]
#[command(name = "tonearm-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "TONEARM_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "TONEARM_BIND_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Tonearm Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }

    let core_config = config.to_core_config();
    core_config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {e}"))?;

    log::info!(
        "Configuration: bind_port={}, artwork_timeout={}s",
        core_config.preferred_port,
        core_config.artwork_fetch_timeout_secs
    );

    let app_state = AppState::wire(core_config);

    let server_state = app_state.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_state).await {
            log::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");
    app_state.ws_manager.close_all();
    server_handle.abort();
    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
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
