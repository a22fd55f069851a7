//! Charret CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! charret-cli migrate
//!
//! # Seed the menu
//! charret-cli seed menu
//!
//! # Create a back-office user
//! charret-cli admin create -e admin@example.com -n "Admin Name"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed menu` - Seed the menu tables
//! - `admin create` - Create back-office users

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "charret-cli")]
#[command(author, version, about = "Charret CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed database tables
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage back-office users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Seed the menu categories and items
    Menu,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new back-office user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Password; read from CHARRET_ADMIN_PASSWORD if not given
        #[arg(short, long)]
        password: Option<String>,
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
        Commands::Seed { target } => match target {
            SeedTarget::Menu => commands::seed::menu().await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, password.as_deref()).await?;
            }
        },
    }
    Ok(())
}
