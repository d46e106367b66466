//! Database operations for the laundry `PostgreSQL` schema.
//!
//! # Schema: `laundry`
//!
//! ## Tables
//!
//! - `user` - Customer accounts and profiles
//! - `otp_verification` - Registration OTP codes
//! - `login_attempt` - Login audit trail used for lockouts
//! - `password_reset_token` - Issued reset links
//! - `user_session` - Live bearer tokens (revocable)
//! - `service_category` / `pricing_item` - Price list
//! - `service_order` / `service_order_item` - Iron and wash orders
//! - `dry_clean_order` / `dry_clean_contact` - Dry-clean pickups and enquiries
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p quick-laundry-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`query_as` + `bind`) so the crate builds
//! without a live database.

pub mod dry_clean;
pub mod login_attempts;
pub mod orders;
pub mod otp;
pub mod password_resets;
pub mod pricing;
pub mod sessions;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use dry_clean::{DryCleanFilter, DryCleanRepository};
pub use login_attempts::LoginAttemptRepository;
pub use orders::{CancelOutcome, OrderRepository};
pub use otp::OtpRepository;
pub use password_resets::PasswordResetRepository;
pub use pricing::PricingRepository;
pub use sessions::SessionRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to `Conflict` carrying the constraint
/// name, leaving every other error as `Database`.
pub(crate) fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let constraint = db_err.constraint().unwrap_or("unique").to_owned();
        return RepositoryError::Conflict(constraint);
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Check connectivity with a trivial query.
///
/// # Errors
///
/// Returns `sqlx::Error` if the database is unreachable.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
