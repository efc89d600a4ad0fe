//! doma-relay - Doma marketplace listings to Telegram
//!
#![doc = "Main entry point for the doma-relay application."]

use anyhow::Result;

use doma_relay::cli::{Cli, Commands};
use doma_relay::commands;
use doma_relay::config::Config;
use doma_relay::logging::{bootstrap_subscriber, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration; its warnings go to a temporary stderr subscriber
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = tracing::subscriber::with_default(bootstrap_subscriber(), || {
        Config::load(config_path, &cli)
    })?;

    // Validate configuration
    config.validate()?;

    init_logging(&config.logging)?;

    // Execute command
    match cli.command {
        Commands::Serve => {
            tracing::info!("Starting relay");
            commands::serve::run_serve(config).await
        }
        Commands::Poll { ack } => {
            tracing::info!(ack, "Polling upstream once");
            commands::poll::run_poll(config, ack).await
        }
        Commands::Extract { file } => {
            tracing::debug!("Inspecting payload from: {}", file.display());
            commands::extract::run_extract(&config, &file)
        }
    }
}
