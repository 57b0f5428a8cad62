//! Round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  LOAD BALANCER                   │
//!   Client Request    │  ┌──────────┐   ┌──────────────┐   ┌──────────┐  │
//!   ──────────────────┼─▶│  http    │──▶│load_balancer │──▶│ forward  │──┼──▶ Backend
//!                     │  │  server  │   │ select_next  │   │ +timeout │  │
//!   Client Response   │  └──────────┘   └──────▲───────┘   └──────────┘  │
//!   ◀─────────────────┼── relayed head + streamed body          │        │
//!                     │                        │ apply outcome            │
//!                     │                 ┌──────┴───────┐                  │
//!                     │                 │    health    │── GET /health ───┼──▶ Backend
//!                     │                 │ loop/backend │                  │
//!                     │                 └──────────────┘                  │
//!                     └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use lb_proxy::config::{load_config, validate_config, BackendsConfig, BalancerConfig, ConfigError};
use lb_proxy::lifecycle::{signals, Shutdown};
use lb_proxy::observability::{logging, metrics};
use lb_proxy::BalancerServer;

#[derive(Parser, Debug)]
#[command(name = "lb-proxy")]
#[command(about = "Round-robin HTTP load balancer with active health checks", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load balancer port.
    #[arg(long)]
    port: Option<u16>,

    /// Request and health check timeout in seconds.
    #[arg(long = "timeout-sec")]
    timeout_sec: Option<u64>,

    /// Reach backends over HTTPS.
    #[arg(long)]
    https: bool,

    /// Add the serving backend to every response.
    #[arg(long)]
    trace: bool,

    /// Backend address (host:port); repeat for several. Replaces configured backends.
    #[arg(long = "backend")]
    backends: Vec<String>,
}

impl Cli {
    fn into_config(self) -> Result<BalancerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => BalancerConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(secs) = self.timeout_sec {
            config.timeouts.request_secs = secs;
        }
        if self.https {
            config.upstream.https = true;
        }
        if self.trace {
            config.upstream.trace = true;
        }
        if !self.backends.is_empty() {
            config.backends = BackendsConfig(self.backends);
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability.log_filter);
    tracing::info!("lb-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        port = config.listener.port,
        backends = ?config.backends.0,
        timeout_secs = config.timeouts.request_secs,
        scheme = config.upstream.scheme().as_str(),
        trace = config.upstream.trace,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.bind_address()).await?;
    let server = BalancerServer::new(&config)?;

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
