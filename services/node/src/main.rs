//! Weft node daemon: durable storage, proof-of-work mining, and a
//! line-oriented JSON RPC surface for driving both.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

mod config;
mod logging;
mod rpc;
mod state;
mod stats;

use config::NodeConfig;
use state::NodeState;

#[derive(Debug, Parser)]
#[command(name = "weft-node", version, about = "Weft network node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the node until interrupted
    Start {
        /// Path to the TOML configuration file
        #[arg(long, default_value = "weft.toml")]
        config: PathBuf,
    },
    /// Write a default configuration file and exit
    InitConfig {
        /// Where to write the file
        #[arg(long, default_value = "weft.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Start { config } => run(config).await,
        Command::InitConfig { path } => init_config(path),
    }
}

async fn run(config_path: PathBuf) -> anyhow::Result<()> {
    let config = NodeConfig::from_file(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    logging::init(&config.log);

    info!(
        name = %config.name,
        data_dir = %config.data_dir.display(),
        "starting node"
    );
    let state = Arc::new(NodeState::open(config.clone())?);

    state::spawn_solution_recorder(Arc::clone(&state));
    state::spawn_memory_reporter(Arc::clone(&state));

    let listener = TcpListener::bind(&config.rpc_addr)
        .await
        .with_context(|| format!("binding rpc listener on {}", config.rpc_addr))?;
    info!("rpc listening on {}", config.rpc_addr);

    tokio::select! {
        result = rpc::serve(listener, Arc::clone(&state)) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            state.shutdown();
            Ok(())
        }
    }
}

fn init_config(path: PathBuf) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("refusing to overwrite existing {}", path.display());
    }
    let config = NodeConfig::write_default(&path)?;
    println!(
        "wrote default config to {} (rpc at {})",
        path.display(),
        config.rpc_addr
    );
    Ok(())
}
