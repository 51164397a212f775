//! WebSocket gatekeeper server.
//!
//! Admits WebSocket upgrades for one configured host and path (plus a
//! loopback host on any path), then runs a push and heartbeat session per
//! connection until either side closes.

use std::path::PathBuf;

use clap::Parser;

use ws_gatekeeper::config::{load_config, ServerConfig};
use ws_gatekeeper::lifecycle;
use ws_gatekeeper::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "ws-gatekeeper", version, about = "WebSocket upgrade gatekeeper and push server")]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override `listener.port`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override `listener.bind_host`.
    #[arg(short, long, value_name = "HOST")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if let Some(bind) = cli.bind {
        config.listener.bind_host = bind;
    }

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        bind_address = %config.listener.bind_address(),
        expected_host = %config.routing.expected_host,
        expected_path = %config.routing.expected_path,
        "ws-gatekeeper starting"
    );

    lifecycle::start(config).await?;
    Ok(())
}
