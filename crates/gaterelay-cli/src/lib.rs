//! Gaterelay command-line interface.
//!
//! Connects to the configured gateway, performs the handshake, and bridges
//! newline-delimited JSON between stdio and the RPC session.

pub mod bridge;

use anyhow::Context;
use clap::Parser;
use gaterelay_client::{GatewaySession, Transport};
use gaterelay_core::config::RelayConfig;
use tracing::info;

/// Gaterelay - stdio to gateway relay
#[derive(Parser)]
#[command(name = "gaterelay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (defaults to config.json next to the executable)
    #[arg(short, long, env = "GATERELAY_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    /// Override the gateway WebSocket URL from the config file
    #[arg(long, env = "GATERELAY_URL")]
    pub gateway_url: Option<String>,
}

/// Run the relay until stdin closes or the connection drops.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let path = match cli.config {
        Some(path) => path,
        None => RelayConfig::default_path()?,
    };

    let mut config = RelayConfig::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;

    if let Some(url) = cli.gateway_url {
        config.gateway_url = url;
        config.validate()?;
    }

    info!("connecting to gateway at {}", config.gateway_url);
    let transport = Transport::connect(&config.gateway_url)
        .await
        .context("failed to connect to gateway")?;

    let session = GatewaySession::new(transport);
    session
        .initialize(&config)
        .await
        .context("gateway handshake failed")?;
    info!("gateway session established (device {})", config.device_id);

    bridge::run(session).await
}
