// CLI - Command Line Interface for Nodus Node
// Principle: Simple, clear, composable commands

pub mod runner;

use crate::network::Endpoint;
use crate::node::config::DEFAULT_MESSAGE_MAGIC;
use crate::node::NodeConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Nodus Node - peer networking, wire codec, cached storage and mempool admission
#[derive(Parser, Debug)]
#[command(name = "nodus-node")]
#[command(author = "Nodus Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Nodus blockchain node")]
#[command(long_about = r#"
Nodus joins a blockchain network over TCP, keeps its peers healthy,
admits transactions against on-chain GAS balances and persists blocks.

Start with defaults:
  nodus-node run

Join through a seed:
  nodus-node run --seed tcp://10.0.0.5:20333

Write a configuration file to edit:
  nodus-node config --output nodus.toml
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", env = "NODUS_LOG")]
    pub log_level: String,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the node
    Run(RunCmd),

    /// Print the default configuration as TOML
    Config(ConfigCmd),

    /// Decode a hex-encoded wire message and print a summary
    DecodeMessage(DecodeMessageCmd),
}

/// Run the node
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Configuration file (TOML)
    #[arg(short, long, env = "NODUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory, overrides the configuration file
    #[arg(short = 'd', long, env = "NODUS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// P2P listen port, overrides the configuration file
    #[arg(long, env = "NODUS_P2P_PORT")]
    pub port: Option<u16>,

    /// Seed endpoints, added to the configured ones (can be specified multiple times)
    #[arg(long = "seed", value_name = "ENDPOINT")]
    pub seeds: Vec<Endpoint>,
}

/// Print the default configuration
#[derive(Parser, Debug)]
pub struct ConfigCmd {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Decode a wire message
#[derive(Parser, Debug)]
pub struct DecodeMessageCmd {
    /// Message bytes as hex, with or without 0x
    pub hex: String,

    /// Network magic expected in the envelope
    #[arg(long, default_value_t = DEFAULT_MESSAGE_MAGIC)]
    pub magic: u32,
}

impl RunCmd {
    /// Configuration file (or defaults) with command line overrides applied, validated
    pub fn load_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };

        if let Some(port) = self.port {
            config = config.with_listen_port(port);
        }
        if let Some(data_dir) = &self.data_dir {
            config = config.with_data_dir(data_dir.clone());
        }
        config = config.with_seeds(self.seeds.clone());

        config.validate()?;
        Ok(config)
    }
}
