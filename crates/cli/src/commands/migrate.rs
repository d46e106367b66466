//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! ql-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `LAUNDRY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/server/migrations/` and are embedded in the
//! server library at build time:
//! ```text
//! migrations/
//! ├── 20250601000001_create_laundry_schema.sql
//! ├── 20250601000002_create_accounts.sql
//! └── ...
//! ```

use quick_laundry_server::MIGRATOR;

use super::{CommandError, connect};

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!(
        available = MIGRATOR.iter().count(),
        "Running laundry migrations..."
    );
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
