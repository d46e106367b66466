//! Customer account maintenance.
//!
//! # Usage
//!
//! ```bash
//! ql-cli user deactivate --email someone@example.com
//! ql-cli user activate --email someone@example.com
//! ql-cli user delete --email someone@example.com
//! ```

use quick_laundry_core::Email;
use quick_laundry_server::db::{SessionRepository, UserRepository};

use super::{CommandError, connect};

/// Enable or disable logins for an account. Deactivating also closes every
/// open session.
///
/// # Errors
///
/// Returns an error if the email is invalid, no account matches, or the
/// update fails.
pub async fn set_active(email: &str, active: bool) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    if !users.set_active(&email, active).await? {
        return Err(CommandError::UserNotFound(email.to_string()));
    }

    if !active
        && let Some(user) = users.get_by_email(&email).await?
    {
        let closed = SessionRepository::new(&pool)
            .delete_all_for_user(user.id)
            .await?;
        tracing::info!(sessions = closed, "Closed open sessions");
    }

    tracing::info!(email = %email.masked(), active, "Account updated");
    Ok(())
}

/// Delete an account. Orders, sessions and tokens cascade; dry-clean pickups
/// keep their contact details.
///
/// # Errors
///
/// Returns an error if the email is invalid, no account matches, or the
/// delete fails.
pub async fn delete(email: &str) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    if !UserRepository::new(&pool).delete_by_email(&email).await? {
        return Err(CommandError::UserNotFound(email.to_string()));
    }

    tracing::info!(email = %email.masked(), "Account deleted");
    Ok(())
}
