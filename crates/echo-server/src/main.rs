//! Binary TCP server for the multi-echo protocol.

use anyhow::{Context, Result};
use clap::Parser;
use echo_server::config::{CliArgs, Config};
use echo_server::server::EchoServer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();
    let config = Config::resolve(&cli).context("loading configuration")?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        max_clients = ?config.max_clients,
        queue_capacity = config.queue_capacity,
        "starting echo-server"
    );

    let mut server = EchoServer::new(config);
    server.start().await.context("starting echo-server")?;

    server
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await?;

    Ok(())
}
