//! # Relayer
//!
//! Entry point of the state-root relayer.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialise logging
//! 3. Start workers, router, sink and listeners
//! 4. Run until Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use relay_runtime::logging::init_logging;
use relay_runtime::{RelayerConfig, RelayerRuntime};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RelayerConfig::from_env().context("Failed to load relayer configuration")?;

    init_logging(&config.log_level, config.log_json)?;
    info!("===========================================");
    info!("  State Root Relayer v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let mut runtime = RelayerRuntime::new(config)?;
    runtime.start()?;

    info!("Relayer is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
