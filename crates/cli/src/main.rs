//! Shopi Section CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! shopi-cli migrate
//!
//! # Inspect installed shops
//! shopi-cli sessions list
//! shopi-cli sessions delete example.myshopify.com
//!
//! # Inspect the section catalog
//! shopi-cli sections list
//! shopi-cli sections show 3d-carousel-pro
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `sessions` - List or delete offline shop sessions
//! - `sections` - Print the bundled section catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shopi-cli")]
#[command(author, version, about = "Shopi Section CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage offline shop sessions
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Inspect the bundled section catalog
    Sections {
        #[command(subcommand)]
        action: SectionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List installed shops
    List,
    /// Delete a shop's session, forcing it through OAuth again
    Delete {
        /// Shop domain (`example.myshopify.com`)
        shop: String,
    },
}

#[derive(Subcommand)]
enum SectionAction {
    /// List catalog sections
    List,
    /// Print a section's Liquid source as it would be installed
    Show {
        /// Section identifier
        id: String,
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
        Commands::Sessions { action } => match action {
            SessionAction::List => commands::sessions::list().await?,
            SessionAction::Delete { shop } => commands::sessions::delete(&shop).await?,
        },
        Commands::Sections { action } => match action {
            SectionAction::List => commands::sections::list(),
            SectionAction::Show { id } => commands::sections::show(&id)?,
        },
    }
    Ok(())
}
