//! PixSync CLI
//!
//! Command-line tools for the PixSync remote client.
//!
//! # Commands
//!
//! - `simulate` - Run the client against an in-process simulated controller
//! - `commands` - List the command vocabulary and its request schedule
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// PixSync command-line tools.
#[derive(Parser)]
#[command(name = "pixsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the client against a simulated controller
    Simulate {
        /// Let the controller compress payloads
        #[arg(short, long)]
        compression: bool,

        /// Let the controller ignore every request
        #[arg(short, long)]
        silent: bool,

        /// Poll ticks to run after the handshake
        #[arg(short, long, default_value = "20")]
        ticks: u64,

        /// Wait between handshake rounds, in milliseconds
        #[arg(long, default_value = "2000")]
        handshake_interval: u64,

        /// Wait between poll ticks, in milliseconds
        #[arg(long, default_value = "400")]
        poll_interval: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the command vocabulary
    Commands {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Simulate {
            compression,
            silent,
            ticks,
            handshake_interval,
            poll_interval,
            format,
        } => {
            commands::simulate::run(&commands::simulate::SimulateOptions {
                compression,
                silent,
                ticks,
                handshake_interval: Duration::from_millis(handshake_interval),
                poll_interval: Duration::from_millis(poll_interval),
                format,
            })?;
        }
        Commands::Commands { format } => {
            commands::vocabulary::run(&format)?;
        }
        Commands::Version => {
            println!("PixSync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "Controller defaults: {}:{} (local port {})",
                pixsync_client::DEFAULT_HOST,
                pixsync_client::DEFAULT_REMOTE_PORT,
                pixsync_client::DEFAULT_LOCAL_PORT
            );
        }
    }

    Ok(())
}
