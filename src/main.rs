//! Gateway process.
//!
//! Terminates public HTTP, builds the per-request context, forwards to the
//! renderer and translates its typed result. Start the renderer process
//! first (`cargo run --bin renderer`), then this binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use ssr_gateway::config::{load_config, GatewayConfig};
use ssr_gateway::gateway::{GatewayServer, MemoryAccountStore};
use ssr_gateway::lifecycle::Shutdown;
use ssr_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "ssr-gateway")]
#[command(about = "Public-facing SSR gateway", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the public bind address from the config.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_tracing(&format!(
        "ssr_gateway={},tower_http=info",
        config.observability.log_level
    ));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        renderer_endpoint = %config.renderer.endpoint,
        experiments = config.experiments.catalog.len(),
        "gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(error) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    error = %error,
                    "failed to parse metrics address"
                );
            }
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    // the in-memory store backs the demo wiring; deployments plug their own
    let accounts = Arc::new(MemoryAccountStore::new());
    let server = GatewayServer::new(config, accounts)?;

    let shutdown = Shutdown::with_ctrl_c();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
