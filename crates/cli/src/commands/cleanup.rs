//! Delete expired auth records.
//!
//! Safe to run from cron; every delete only touches rows that can no longer
//! be used.

use quick_laundry_server::db::{
    LoginAttemptRepository, OtpRepository, PasswordResetRepository, SessionRepository,
};

use super::{CommandError, connect};

/// Login attempts older than this are dropped.
pub const LOGIN_ATTEMPT_RETENTION_DAYS: i64 = 30;

/// Delete expired OTP codes, sessions and reset tokens, plus old login
/// attempts.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a delete fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    let otps = OtpRepository::new(&pool).delete_expired().await?;
    let sessions = SessionRepository::new(&pool).delete_expired().await?;
    let resets = PasswordResetRepository::new(&pool).delete_expired().await?;
    let attempts = LoginAttemptRepository::new(&pool)
        .delete_older_than(LOGIN_ATTEMPT_RETENTION_DAYS)
        .await?;

    tracing::info!(
        otps,
        sessions,
        resets,
        login_attempts = attempts,
        "Cleanup complete"
    );
    Ok(())
}
