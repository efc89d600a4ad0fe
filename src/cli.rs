//! Command-line interface definition for doma-relay
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to run the relay and to inspect upstream payloads.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// doma-relay - Doma marketplace listings to Telegram
///
/// Polls the Doma marketplace API, filters listing events and relays them
/// to Telegram subscribers, with an HTTP control plane for the website.
#[derive(Parser, Debug, Clone)]
#[command(name = "doma-relay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for doma-relay
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the bot, broadcaster and control plane until interrupted
    Serve,

    /// Fetch one upstream page and print what would be relayed
    Poll {
        /// Acknowledge the page's lastId after printing
        #[arg(long)]
        ack: bool,
    },

    /// Run extraction and formatting over a saved payload
    Extract {
        /// Path to a JSON payload file
        #[arg(short, long)]
        file: PathBuf,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_serve() {
        let cli = Cli::try_parse_from(["doma-relay", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve));
        assert_eq!(cli.config.as_deref(), Some("config/config.yaml"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_poll_with_ack() {
        let cli = Cli::try_parse_from(["doma-relay", "poll", "--ack"]).unwrap();
        assert!(matches!(cli.command, Commands::Poll { ack: true }));

        let cli = Cli::try_parse_from(["doma-relay", "poll"]).unwrap();
        assert!(matches!(cli.command, Commands::Poll { ack: false }));
    }

    #[test]
    fn test_cli_parse_extract() {
        let cli = Cli::try_parse_from(["doma-relay", "extract", "--file", "payload.json"]).unwrap();
        match cli.command {
            Commands::Extract { file } => assert_eq!(file, PathBuf::from("payload.json")),
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_cli_extract_requires_file() {
        assert!(Cli::try_parse_from(["doma-relay", "extract"]).is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli =
            Cli::try_parse_from(["doma-relay", "-v", "--config", "custom.yaml", "serve"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("custom.yaml"));
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["doma-relay"]).is_err());
    }
}
