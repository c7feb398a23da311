//! # QChat Node
//!
//! Runs a single peer from a JSON config file keyed by node name (§6.3):
//! `qchat-node <config.json> <name> [--allow-invalid-signatures]`.
//!
//! The quantum backend (§6.4) is a capability this binary is handed by its
//! host; wiring one up for a real link is out of scope here, so this entry
//! point runs every node against a process-local simulator, which is fine
//! for exercising the protocol engine end to end but does not span
//! separate processes or machines.

use anyhow::{Context, Result};
use qchat_node::{NodeConfig, NodeCore};
use qchat_quantum::sim::{LocalQuantumHub, LocalQuantumLink};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_usage_and_exit() -> ! {
    eprintln!("usage: qchat-node <config.json> <name> [--allow-invalid-signatures]");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| print_usage_and_exit());
    let name = args.next().unwrap_or_else(|| print_usage_and_exit());
    let allow_invalid_signatures = args.any(|a| a == "--allow-invalid-signatures");

    let config = NodeConfig::load(&config_path, &name)
        .with_context(|| format!("loading config for {name:?} from {config_path:?}"))?;
    info!(node = %name, is_registry = config.is_registry(), "starting qchat node");

    let hub = LocalQuantumHub::new();
    let link = Arc::new(LocalQuantumLink::new(name.clone(), hub));

    let node = Arc::new(NodeCore::new(config, link, allow_invalid_signatures)?);
    let run_handle = tokio::spawn(node.clone().run());

    info!("node is running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    run_handle.abort();

    Ok(())
}
