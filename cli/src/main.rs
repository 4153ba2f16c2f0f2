//! CLI entrypoint for hive-mind
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::Result;
use clap::{Parser, Subcommand};
use hivemind_infrastructure::ConfigLoader;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod demo;

#[derive(Parser)]
#[command(name = "hive-mind", version, about = "Quorum consensus and distributed memory for agent swarms")]
struct Cli {
    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a config file (overrides discovered configs)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip config file discovery, use built-in defaults
    #[arg(long, global = true)]
    no_config: bool,

    /// Suppress the demo narration, print only results
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a self-contained consensus and memory walkthrough
    Demo,
    /// Show which configuration files would be loaded
    ConfigSources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Command::ConfigSources => {
            ConfigLoader::print_config_sources();
            Ok(())
        }
        Command::Demo => {
            let config = if cli.no_config {
                ConfigLoader::load_defaults()
            } else {
                ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
            };

            info!(node_id = %config.node.id, "starting hive-mind demo");
            demo::run(config, cli.quiet).await
        }
    }
}
