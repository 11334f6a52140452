//! latticed — entry point for running a lattice node.

use clap::Parser;
use lattice_messages::NetworkId;
use lattice_node::{init_logging, LoopbackNetwork, Node, NodeConfig};
use lattice_types::Timestamp;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "latticed", about = "Block-lattice consensus node")]
struct Cli {
    /// Network to join: "live", "beta", or "dev".
    #[arg(long, env = "LATTICE_NETWORK")]
    network: Option<String>,

    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable ledger pruning.
    #[arg(long, env = "LATTICE_ENABLE_PRUNING")]
    pruning: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LATTICE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "LATTICE_LOG_FORMAT")]
    log_format: Option<String>,
}

fn parse_network(s: &str) -> NetworkId {
    match s.to_lowercase().as_str() {
        "live" => NetworkId::Live,
        "beta" => NetworkId::Beta,
        _ => NetworkId::Dev,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => NodeConfig::from_toml_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(network) = cli.network.as_deref() {
        config.network = parse_network(network);
    }
    if cli.pruning {
        config.enable_pruning = true;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    init_logging(config.log_format_parsed()?, &config.log_level);
    if let Some(ref path) = cli.config {
        tracing::info!("loaded config from {}", path.display());
    }

    // TODO: replace the loopback sink with the TCP realtime network once the
    // transport lands.
    let network = Arc::new(LoopbackNetwork::new());
    let node = Arc::new(Node::new(config, network, Timestamp::now()));
    node.run().await;

    tracing::info!("latticed exited cleanly");
    Ok(())
}
