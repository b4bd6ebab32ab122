//! Graph render proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http (axum, request id, body limit)
//!                │
//!                ▼
//!           pipeline ── deadline (resilience) ───────────────────────┐
//!                │                                                   │
//!                ├─▶ request validator ─▶ domain resolver            │
//!                ├─▶ upstream fetcher ─▶ content API (continue loop) │
//!                └─▶ renderer (external command) ◀───────────────────┘
//!                │
//!   Client ◀── image / error kind + Cache-Control
//!
//!   Cross-cutting: config (TOML), observability (tracing, Prometheus),
//!                  lifecycle (signals, graceful shutdown)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use graph_proxy::config::{load_config, parse_config, ConfigError};
use graph_proxy::lifecycle::signals;
use graph_proxy::observability::{logging, metrics};
use graph_proxy::{HttpServer, Pipeline, Shutdown};

#[derive(Parser)]
#[command(name = "graph-proxy", version, about = "Renders wiki graph specs to images")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "GRAPH_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => load_config(path),
        // Defaults alone have no domains, so this refuses to start.
        None => parse_config(""),
    };

    let observability = loaded
        .as_ref()
        .map(|c| c.observability.clone())
        .unwrap_or_default();
    logging::init(&observability)?;

    let mut config = match loaded {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) => {
            for error in &errors {
                tracing::error!(error = %error, "Invalid configuration");
            }
            return Err(ConfigError::Validation(errors).into());
        }
        Err(e) => {
            tracing::error!(error = %e, config = ?args.config, "Failed to load configuration");
            return Err(e.into());
        }
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        domains = ?config.upstream.domains,
        aliases = config.upstream.domain_map.len(),
        timeout_ms = config.pipeline.timeout_ms,
        formats = ?config.pipeline.formats,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let pipeline = Arc::new(Pipeline::from_config(&config)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config, pipeline);
    let server_shutdown = shutdown.subscribe();

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::trigger_on_signal(&signal_shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
