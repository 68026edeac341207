//! Slabworks CLI - Database migrations and queue management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run sync database migrations
//! slab-cli migrate
//!
//! # Drain one batch of the sync queue
//! slab-cli drain
//!
//! # Show recent dead-letter entries for manual recovery
//! slab-cli dead-letters --limit 20
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `drain` - Process one sync queue batch and exit
//! - `dead-letters` - List permanently-failed queue items

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "slab-cli")]
#[command(author, version, about = "Slabworks CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run sync database migrations
    Migrate,
    /// Process one sync queue batch and exit
    Drain,
    /// List recent dead-letter entries
    DeadLetters {
        /// Maximum entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Drain => commands::drain::run().await?,
        Commands::DeadLetters { limit } => commands::dead_letters::run(limit).await?,
    }
    Ok(())
}
