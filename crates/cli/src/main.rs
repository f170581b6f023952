//! Harbor CLI - Session migrations and backend checks.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! harbor-cli migrate
//!
//! # Verify the Store API is reachable with the configured key
//! harbor-cli check
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create or update the `tower_sessions` table
//! - `check` - List the backend's regions using the publishable key

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "harbor-cli")]
#[command(author, version, about = "Harbor storefront operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run session store migrations
    Migrate,
    /// Check connectivity to the commerce backend
    Check,
}

#[tokio::main]
async fn main() {
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
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::Check => commands::check::backend().await?,
    }
    Ok(())
}
