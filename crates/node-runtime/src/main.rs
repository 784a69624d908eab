//! # Trustmesh Node
//!
//! Entry point of a web-of-trust blockchain node.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`TM_CONFIG` file, then `TM_*` overrides)
//! 2. Validate it; abort on the first missing requirement
//! 3. Derive the key pair (explicit pair, else password + salt)
//! 4. Wire services, inbox and propagation pipeline
//! 5. Announce the node's peer document, test peers, refresh the merkle index
//! 6. Synchronize blocks once
//! 7. Start block generation if `participate` is set
//!
//! Ctrl+C stops every task; the generation loop finishes its current cycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::{MemoryServiceFactory, NodeConfig, NodeRuntime};
use tm_01_peer_sync::HttpConnector;
use tm_02_block_propagation::HttpTransport;

/// Load configuration from the file named by `TM_CONFIG` (defaults
/// otherwise), then apply environment overrides.
fn load_config() -> Result<NodeConfig> {
    let mut config = match std::env::var("TM_CONFIG") {
        Ok(path) => {
            info!("Loading configuration from {path}");
            NodeConfig::from_file(&path).with_context(|| format!("Failed to load {path}"))?
        }
        Err(_) => NodeConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config()?;

    let connector = HttpConnector::new(config.sync.client.request_timeout())
        .context("Failed to build the sync HTTP client")?;
    let transport = HttpTransport::new(config.propagation.peer_timeout())
        .context("Failed to build the propagation HTTP client")?;

    let runtime = NodeRuntime::new(
        config,
        Arc::new(MemoryServiceFactory::new(Arc::new(connector))),
        Arc::new(transport),
    );
    runtime.start().await.context("Node startup failed")?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
