// Nodus Node - Entry point
// Principle: Parse, configure, run

use clap::Parser;
use nodus_core::cli::runner::{decode_message, run_node};
use nodus_core::cli::{Cli, Commands};
use nodus_core::node::NodeConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    match cli.command {
        Commands::Run(cmd) => {
            print_banner();

            let config = cmd.load_config().map_err(|e| {
                error!("Configuration error: {}", e);
                anyhow::anyhow!("Configuration error: {}", e)
            })?;

            if let Err(e) = run_node(config).await {
                error!("Node error: {}", e);
                return Err(anyhow::anyhow!("Node error: {}", e));
            }
            info!("Goodbye!");
        }

        Commands::Config(cmd) => {
            let config = NodeConfig::default();
            match cmd.output {
                Some(path) => {
                    config.save(&path)?;
                    info!("Configuration written to {}", path.display());
                }
                None => print!("{}", config.to_toml()?),
            }
        }

        Commands::DecodeMessage(cmd) => {
            println!("{}", decode_message(&cmd.hex, cmd.magic)?);
        }
    }

    Ok(())
}

/// Print the Nodus banner
fn print_banner() {
    println!(
        r#"
    ╔═══════════════════════════════════════════════════╗
    ║                                                   ║
    ║   ███╗   ██╗ ██████╗ ██████╗ ██╗   ██╗███████╗    ║
    ║   ████╗  ██║██╔═══██╗██╔══██╗██║   ██║██╔════╝    ║
    ║   ██╔██╗ ██║██║   ██║██║  ██║██║   ██║███████╗    ║
    ║   ██║╚██╗██║██║   ██║██║  ██║██║   ██║╚════██║    ║
    ║   ██║ ╚████║╚██████╔╝██████╔╝╚██████╔╝███████║    ║
    ║   ╚═╝  ╚═══╝ ╚═════╝ ╚═════╝  ╚═════╝ ╚══════╝    ║
    ║                                                   ║
    ║          Peers • Wire • Storage • Mempool         ║
    ║                                                   ║
    ╚═══════════════════════════════════════════════════╝
    "#
    );
    println!("    Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}
