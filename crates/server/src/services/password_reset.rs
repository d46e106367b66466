//! Password reset links.
//!
//! A link carries a signed reset JWT. The token is also stored so it can be
//! used once, superseded by a newer link, and rate limited per email.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use quick_laundry_core::Email;

use crate::config::{AppConfig, SecurityConfig};
use crate::db::{PasswordResetRepository, RepositoryError, SessionRepository, UserRepository};
use crate::models::{PasswordResetToken, User};
use crate::services::auth::hash_password;
use crate::services::jwt::{JwtService, TokenError};

/// Why a reset request or completion was refused.
#[derive(Debug, Error)]
pub enum ResetError {
    #[error("Too many reset requests. Please try again after {hours} hour(s)")]
    TooManyRequests { hours: i64 },

    #[error("This account uses Google Sign-In. Please login with Google")]
    OAuthAccount,

    /// Signature valid but no stored row, e.g. superseded before storage.
    #[error("Invalid reset token")]
    TokenNotFound,

    #[error("Reset token has already been used")]
    AlreadyUsed,

    /// The stored row expired, typically because a newer link superseded it.
    #[error("Reset token has expired")]
    Expired,

    /// The JWT itself expired.
    #[error("Reset link has expired")]
    LinkExpired,

    #[error("Invalid reset link")]
    LinkInvalid,

    #[error("Invalid token type")]
    InvalidType,

    #[error("User not found")]
    UserNotFound,

    #[error("token signing failed: {0}")]
    Signing(TokenError),

    #[error("password hashing error: {0}")]
    PasswordHash(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ResetError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Signing(_) | Self::PasswordHash(_) | Self::Repository(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<TokenError> for ResetError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::LinkExpired,
            TokenError::Invalid => Self::LinkInvalid,
            TokenError::InvalidType => Self::InvalidType,
            TokenError::Encoding(_) => Self::Signing(err),
        }
    }
}

/// A link ready to be emailed.
#[derive(Debug, Clone)]
pub struct ResetLink {
    pub user: User,
    pub url: String,
}

/// Check a stored token row.
///
/// # Errors
///
/// Returns `AlreadyUsed` or `Expired`.
pub fn check_stored(row: &PasswordResetToken, now: DateTime<Utc>) -> Result<(), ResetError> {
    if row.is_used {
        return Err(ResetError::AlreadyUsed);
    }
    if now >= row.expires_at {
        return Err(ResetError::Expired);
    }
    Ok(())
}

/// Reset link URL on the frontend.
#[must_use]
pub fn reset_url(base_url: &str, token: &str) -> String {
    format!("{base_url}/reset-password.html?token={token}")
}

/// Issues and redeems password reset links.
pub struct PasswordResetService<'a> {
    tokens: PasswordResetRepository<'a>,
    users: UserRepository<'a>,
    sessions: SessionRepository<'a>,
    jwt: &'a JwtService,
    app: &'a AppConfig,
    security: &'a SecurityConfig,
}

impl<'a> PasswordResetService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        jwt: &'a JwtService,
        app: &'a AppConfig,
        security: &'a SecurityConfig,
    ) -> Self {
        Self {
            tokens: PasswordResetRepository::new(pool),
            users: UserRepository::new(pool),
            sessions: SessionRepository::new(pool),
            jwt,
            app,
            security,
        }
    }

    /// Lifetime of a link in hours.
    #[must_use]
    pub const fn expiry_hours(&self) -> i64 {
        self.security.password_reset_expiry_hours
    }

    /// Issue a link for this email. Returns `None` when no account exists so
    /// the caller can answer without revealing that.
    ///
    /// # Errors
    ///
    /// Returns `TooManyRequests` when the window is exhausted and
    /// `OAuthAccount` for accounts without a password.
    #[instrument(skip(self), fields(email = %email.masked()))]
    pub async fn request(&self, email: &Email) -> Result<Option<ResetLink>, ResetError> {
        let hours = self.security.password_reset_expiry_hours;
        let recent = self.tokens.count_recent(email, hours).await?;
        if recent >= self.security.password_reset_max_attempts {
            tracing::warn!(recent, "Password reset rate limit hit");
            return Err(ResetError::TooManyRequests { hours });
        }

        let Some(credentials) = self.users.credentials_by_email(email).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(None);
        };
        if credentials.password_hash.is_none() {
            return Err(ResetError::OAuthAccount);
        }

        let issued = self.jwt.issue_reset(email.as_str())?;
        self.tokens
            .replace(email, &issued.token, issued.expires_at)
            .await?;

        Ok(Some(ResetLink {
            user: credentials.user,
            url: reset_url(self.app.base_url(), &issued.token),
        }))
    }

    /// Check a link without redeeming it. Returns the email it was issued for.
    ///
    /// # Errors
    ///
    /// Returns the first failed JWT or stored-token check.
    pub async fn verify(&self, token: &str) -> Result<String, ResetError> {
        let (_, email) = self.validate(token).await?;
        Ok(email)
    }

    /// Redeem a link: set the new password, burn the token and sign the user
    /// out everywhere.
    ///
    /// # Errors
    ///
    /// Returns the first failed check, or `UserNotFound`.
    #[instrument(skip_all)]
    pub async fn reset(&self, token: &str, new_password: &str) -> Result<User, ResetError> {
        let (row, email) = self.validate(token).await?;

        let email = Email::parse(&email).map_err(|_| ResetError::LinkInvalid)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(ResetError::UserNotFound)?;

        let password_hash =
            hash_password(new_password).map_err(|e| ResetError::PasswordHash(e.to_string()))?;

        if !self.tokens.mark_used(row.id).await? {
            return Err(ResetError::AlreadyUsed);
        }
        self.users.update_password(user.id, &password_hash).await?;
        let revoked = self.sessions.delete_all_for_user(user.id).await?;

        tracing::info!(user_id = %user.id, revoked, "Password reset completed");
        Ok(user)
    }

    async fn validate(&self, token: &str) -> Result<(PasswordResetToken, String), ResetError> {
        let claims = self.jwt.verify_reset(token)?;
        let row = self
            .tokens
            .get_by_token(token)
            .await?
            .ok_or(ResetError::TokenNotFound)?;
        check_stored(&row, Utc::now())?;
        Ok((row, claims.email))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn row(now: DateTime<Utc>) -> PasswordResetToken {
        PasswordResetToken {
            id: 3,
            email: "anita@example.com".to_string(),
            token: "tok".to_string(),
            is_used: false,
            expires_at: now + TimeDelta::hours(1),
            created_at: now,
        }
    }

    #[test]
    fn test_live_token_passes() {
        let now = Utc::now();
        assert!(check_stored(&row(now), now).is_ok());
    }

    #[test]
    fn test_used_token_fails() {
        let now = Utc::now();
        let mut r = row(now);
        r.is_used = true;
        assert!(matches!(check_stored(&r, now), Err(ResetError::AlreadyUsed)));
    }

    #[test]
    fn test_expired_token_fails() {
        let now = Utc::now();
        assert!(matches!(
            check_stored(&row(now), now + TimeDelta::hours(2)),
            Err(ResetError::Expired)
        ));
    }

    #[test]
    fn test_token_errors_become_link_errors() {
        assert_eq!(
            ResetError::from(TokenError::Expired).to_string(),
            "Reset link has expired"
        );
        assert_eq!(
            ResetError::from(TokenError::Invalid).to_string(),
            "Invalid reset link"
        );
        assert_eq!(
            ResetError::from(TokenError::InvalidType).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_rate_limit_message() {
        let err = ResetError::TooManyRequests { hours: 1 };
        assert_eq!(
            err.to_string(),
            "Too many reset requests. Please try again after 1 hour(s)"
        );
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_reset_url() {
        assert_eq!(
            reset_url("http://localhost:3000", "abc.def"),
            "http://localhost:3000/reset-password.html?token=abc.def"
        );
    }
}
