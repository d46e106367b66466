//! Quick Laundry CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! ql-cli migrate
//!
//! # Load the standard price list
//! ql-cli seed pricing --file data/pricing.yaml
//!
//! # Delete expired codes, sessions and reset tokens
//! ql-cli cleanup
//!
//! # Manage a customer account
//! ql-cli user deactivate --email someone@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed pricing` - Upsert the price list from YAML
//! - `cleanup` - Purge expired auth records
//! - `user activate|deactivate|delete` - Account maintenance

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "ql-cli")]
#[command(author, version, about = "Quick Laundry CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Delete expired OTP codes, sessions, reset tokens and old login attempts
    Cleanup,
    /// Manage customer accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert price list categories and items
    Pricing {
        /// Path to the price list YAML file
        #[arg(short, long, default_value = "data/pricing.yaml")]
        file: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Allow the account to log in again
    Activate {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Block logins and close open sessions
    Deactivate {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Permanently delete the account and its orders
    Delete {
        /// Account email address
        #[arg(short, long)]
        email: String,
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

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Pricing { file } => commands::seed::pricing(&file).await?,
        },
        Commands::Cleanup => commands::cleanup::run().await?,
        Commands::User { action } => match action {
            UserAction::Activate { email } => commands::user::set_active(&email, true).await?,
            UserAction::Deactivate { email } => commands::user::set_active(&email, false).await?,
            UserAction::Delete { email } => commands::user::delete(&email).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_seed_defaults_to_bundled_file() {
        let cli = Cli::try_parse_from(["ql-cli", "seed", "pricing"]).unwrap();
        match cli.command {
            Commands::Seed {
                target: SeedTarget::Pricing { file },
            } => assert_eq!(file, "data/pricing.yaml"),
            _ => panic!("expected seed pricing"),
        }
    }
}
