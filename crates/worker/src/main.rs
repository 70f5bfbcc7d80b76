//! fixie-sw entry point.
//!
//! Boots the offline cache worker and exposes it as an MCP server on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use fixie_client::{FetchClient, FetchConfig};
use fixie_core::{AppConfig, CacheDb};

mod error;
mod handler;
mod lifecycle;
mod tools;
mod worker;

use worker::{WorkerHandle, WorkerSettings, build_router};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let generation = config.generation();
    tracing::info!(
        prefix = %generation.prefix,
        version = %generation.version,
        db = %config.db_path.display(),
        "Starting fixie-sw on stdio transport"
    );

    let cache = Arc::new(CacheDb::open(&config.db_path).await.context("opening cache database")?);
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let router = build_router(&config, cache, network)?;
    let worker = WorkerHandle::spawn(router, WorkerSettings::from_config(&config)?);

    if config.install_on_start {
        let worker = worker.clone();
        tokio::spawn(async move {
            match worker.install().await {
                Ok(status) => tracing::info!(state = ?status.state, "startup install finished"),
                Err(e) => tracing::error!(error = %e, "startup install failed"),
            }
        });
    }

    let handler = handler::FixieServer::new(worker.clone(), config.base_url()?);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    // Pages still attached after shutdown go straight to the network.
    if let Err(e) = worker.supersede().await {
        tracing::debug!(error = %e, "worker already stopped");
    }

    Ok(())
}
