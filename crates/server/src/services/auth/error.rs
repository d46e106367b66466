//! Authentication error types.

use axum::http::StatusCode;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::jwt::TokenError;

/// Errors that can occur during authentication operations.
///
/// The `Display` text of client-facing variants is the message returned in
/// the response body.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown account or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    /// Too many failed logins inside the lockout window.
    #[error("Account locked. Try again in {minutes} minutes")]
    AccountLocked { minutes: i64 },

    #[error("Email already registered")]
    EmailTaken,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Phone number already registered")]
    PhoneTaken,

    #[error("Email must be verified with OTP before registration")]
    EmailNotVerified,

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("New password must be different from current password")]
    PasswordUnchanged,

    /// Account was created through Google Sign-In and has no password.
    #[error("This account uses Google Sign-In. Please login with Google")]
    OAuthAccount,

    #[error("User not found")]
    UserNotFound,

    #[error("Session not found")]
    SessionNotFound,

    /// Password hashing error.
    #[error("password hashing error: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl AuthError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::AccountDeactivated => StatusCode::UNAUTHORIZED,
            Self::AccountLocked { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::EmailTaken
            | Self::UsernameTaken
            | Self::PhoneTaken
            | Self::EmailNotVerified
            | Self::IncorrectPassword
            | Self::PasswordUnchanged
            | Self::OAuthAccount => StatusCode::BAD_REQUEST,
            Self::UserNotFound | Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::Token(err) => err.status(),
            Self::PasswordHash(_) | Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a unique-constraint conflict on `laundry.user` to the matching
    /// "already taken" error.
    #[must_use]
    pub fn from_user_conflict(err: RepositoryError) -> Self {
        let taken = match &err {
            RepositoryError::Conflict(constraint) => match constraint.as_str() {
                "user_email_key" => Some(Self::EmailTaken),
                "user_username_key" => Some(Self::UsernameTaken),
                "user_phone_key" => Some(Self::PhoneTaken),
                _ => None,
            },
            _ => None,
        };
        taken.unwrap_or(Self::Repository(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts_map_to_taken_errors() {
        assert!(matches!(
            AuthError::from_user_conflict(RepositoryError::Conflict("user_phone_key".into())),
            AuthError::PhoneTaken
        ));
        assert!(matches!(
            AuthError::from_user_conflict(RepositoryError::Conflict("user_email_key".into())),
            AuthError::EmailTaken
        ));
        assert!(matches!(
            AuthError::from_user_conflict(RepositoryError::NotFound),
            AuthError::Repository(_)
        ));
    }

    #[test]
    fn test_token_errors_keep_their_message() {
        let err = AuthError::from(TokenError::Expired);
        assert_eq!(err.to_string(), "Token has expired");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
