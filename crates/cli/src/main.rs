//! Delicious CLI - Database migrations and sample data.
//!
//! # Usage
//!
//! ```bash
//! # Apply schema migrations and create the session table
//! delicious-cli migrate
//!
//! # Load users, stores and reviews from YAML
//! delicious-cli seed crates/cli/data/sample.yaml
//!
//! # Delete every user, store, review and heart
//! delicious-cli wipe --yes
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "delicious-cli")]
#[command(author, version, about = "Delicious CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load sample data from a YAML file
    Seed {
        /// Path to the YAML file
        file: String,
    },
    /// Delete all application data
    Wipe {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => {
            let summary = commands::seed::from_file(&file).await?;
            tracing::info!(
                users = summary.users,
                stores = summary.stores,
                reviews = summary.reviews,
                "Seeding complete"
            );
        }
        Commands::Wipe { yes } => {
            if !yes {
                return Err("refusing to wipe without --yes".into());
            }
            commands::seed::wipe().await?;
        }
    }
    Ok(())
}
