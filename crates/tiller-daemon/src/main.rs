//! tillerd — serves the collaboration state engine's HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tiller_bridge::http_api::{api_router, ApiState};
use tiller_core::config::Config;
use tracing::{info, warn};

mod logging;

#[derive(Debug, Parser)]
#[command(name = "tillerd", about = "Collaboration state engine daemon")]
struct Args {
    /// Path to the config file (defaults to ~/.config/tiller/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Emit JSON-formatted logs.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.json_logs {
        logging::init_logging_json("info");
    } else {
        logging::init_logging("info");
    }

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, path = %config_path.display(), "failed to load config, using defaults");
        Config::default()
    });
    if let Some(port) = args.port {
        config.daemon.port = port;
    }

    let addr = format!("{}:{}", config.daemon.bind, config.daemon.port);
    let state = Arc::new(ApiState::new(&config));
    let router = api_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, version = env!("CARGO_PKG_VERSION"), "tillerd listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("tillerd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    info!("shutdown signal received");
}
