//! Subcommand implementations.

pub mod cleanup;
pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use quick_laundry_server::db::{RepositoryError, create_pool};

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// A repository call failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A file could not be read.
    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The price list file is not valid YAML for a price list.
    #[error("Invalid price list: {0}")]
    PriceListFormat(#[from] serde_yaml::Error),

    /// The price list parsed but is inconsistent.
    #[error("Price list has {0} problem(s)")]
    PriceListInvalid(usize),

    /// The email argument is not a valid address.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] quick_laundry_core::EmailError),

    /// No account has the given email.
    #[error("No user with email {0}")]
    UserNotFound(String),
}

/// Connect using `LAUNDRY_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("LAUNDRY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("LAUNDRY_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(create_pool(&database_url).await?)
}
