//! Bramble CLI - database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! bramble migrate
//!
//! # Create the fixture accounts and a sample catalog
//! bramble seed
//!
//! # Create a user
//! bramble user create -e admin@example.com -p hunter2hunter2 -f Ada -l Admin -r admin
//! ```
//!
//! All commands read `BRAMBLE_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use bramble_core::Role;
use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "bramble")]
#[command(author, version, about = "Bramble CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Create fixture users and a sample catalog (idempotent)
    Seed,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,

        /// Role (`customer` or `admin`)
        #[arg(short, long, default_value = "customer")]
        role: Role,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                password,
                first_name,
                last_name,
                role,
            } => {
                commands::user::create(email, password, first_name, last_name, role).await?;
            }
        },
    }
    Ok(())
}
