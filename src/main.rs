//! Pool router
//!
//! An HTTP/1.1 reverse proxy that spreads traffic round-robin over
//! health-checked pools of backend ports.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────────┐
//!                              │                   POOL ROUTER                     │
//!                              │                                                   │
//!     Client Request           │  ┌─────────┐    ┌─────────┐    ┌──────────────┐  │
//!     ─────────────────────────┼─▶│   net   │───▶│  http   │───▶│   routing    │  │
//!                              │  │listener │    │ server  │    │ prefix table │  │
//!                              │  └─────────┘    └─────────┘    └──────┬───────┘  │
//!                              │                                       │           │
//!                              │                                       ▼           │
//!                              │                               ┌──────────────┐   │
//!                              │                               │load_balancer │   │
//!                              │                               │ pool + rr    │   │
//!                              │                               └──────┬───────┘   │
//!                              │                                       │           │
//!                              │                                       ▼           │
//!     Client Response          │  ┌─────────┐    ┌─────────┐    ┌──────────────┐  │
//!     ◀────────────────────────┼──│ writer  │◀───│  proxy  │◀───│   upstream   │◀─┼──── Backend
//!                              │  └─────────┘    └─────────┘    └──────────────┘  │     Port
//!                              │                                                   │
//!                              │  ┌─────────┐ ┌────────┐ ┌───────────┐ ┌─────────┐ │
//!                              │  │ config  │ │ health │ │observa-   │ │lifecycle│ │
//!                              │  │         │ │monitor │ │bility     │ │         │ │
//!                              │  └─────────┘ └────────┘ └───────────┘ └─────────┘ │
//!                              └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use pool_router::config::{self, RouterConfig};
use pool_router::lifecycle::{self, signals, Shutdown};
use pool_router::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "pool-router")]
#[command(about = "Round-robin HTTP router over health-checked backend port pools", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listener port spec, overriding `listener.ports` (e.g. "8080,auto").
    #[arg(short, long)]
    port: Option<String>,

    /// Log level or filter directive, overriding `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => RouterConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.ports = port;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    config::validate_config(&config).map_err(config::ConfigError::Validation)?;

    logging::init_logging(
        &config.observability.log_level,
        config.observability.log_format,
    )?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "pool-router starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let router = lifecycle::start(&config, &shutdown).await?;
    tracing::info!(address = %router.local_addr(), "Ready");

    signals::shutdown_on_signal(shutdown.clone()).await;
    router.wait().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
