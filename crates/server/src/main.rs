//! mcp-offcache server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use offcache_client::{FetchClient, FetchConfig, Worker};
use offcache_core::{AppConfig, StoreRegistry};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod notifier;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(app_id = %config.app_id, generation = config.generation, origin = %config.origin, "Starting mcp-offcache server on stdio transport");

    let registry = StoreRegistry::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = Arc::new(Worker::new(config, registry, network, Arc::new(notifier::LogNotifier))?);

    // An unreachable origin is not fatal; requests pass through until a deploy succeeds.
    match worker.start().await {
        Ok(generation) => tracing::info!(%generation, "cache generation active"),
        Err(e) => tracing::warn!("initial deploy failed, serving passthrough: {e}"),
    }

    let handler = handler::OffcacheServer::new(worker);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
