//! Authentication service.
//!
//! Password accounts, login lockouts, token issuance and the session rows
//! that keep access tokens revocable.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use quick_laundry_core::{SessionId, UserId};

use crate::config::SecurityConfig;
use crate::db::login_attempts::FailureWindow;
use crate::db::{LoginAttemptRepository, RepositoryError, SessionRepository, UserRepository};
use crate::models::{NewSession, NewUser, Session, User};
use crate::services::jwt::{IssuedToken, JwtService};

/// How many times a session token is minted before a stored duplicate is
/// reported as an error.
const SESSION_TOKEN_ATTEMPTS: u32 = 2;

/// Where a request came from, recorded on sessions and login attempts.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Tokens handed to a client after login or registration.
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// A freshly minted access token from a refresh token.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    attempts: LoginAttemptRepository<'a>,
    sessions: SessionRepository<'a>,
    jwt: &'a JwtService,
    security: &'a SecurityConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, jwt: &'a JwtService, security: &'a SecurityConfig) -> Self {
        Self {
            users: UserRepository::new(pool),
            attempts: LoginAttemptRepository::new(pool),
            sessions: SessionRepository::new(pool),
            jwt,
            security,
        }
    }

    /// Create an account. The caller has already validated the fields and
    /// checked the OTP.
    ///
    /// # Errors
    ///
    /// Returns `EmailTaken`, `UsernameTaken` or `PhoneTaken` on conflicts.
    #[instrument(skip(self, new_user, password), fields(username = %new_user.username))]
    pub async fn register(&self, new_user: &NewUser, password: &str) -> Result<User, AuthError> {
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(new_user, &password_hash)
            .await
            .map_err(AuthError::from_user_conflict)?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check credentials and open a session.
    ///
    /// `identifier` is an email or a username. Every attempt is recorded;
    /// once `MAX_LOGIN_ATTEMPTS` failures pile up inside the lockout window
    /// further attempts are refused without checking the password.
    ///
    /// # Errors
    ///
    /// Returns `AccountLocked`, `InvalidCredentials` or `AccountDeactivated`.
    #[instrument(skip(self, password, client))]
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<(User, AuthTokens), AuthError> {
        let identifier = normalize_identifier(identifier);

        let window = self
            .attempts
            .recent_failures(&identifier, self.security.login_lockout_minutes)
            .await?;
        if let Some(minutes) = lockout_remaining(
            window,
            self.security.max_login_attempts,
            self.security.login_lockout_minutes,
            Utc::now(),
        ) {
            tracing::warn!(failures = window.failures, "Login refused, account locked");
            return Err(AuthError::AccountLocked { minutes });
        }

        let outcome = self.check_credentials(&identifier, password).await;
        self.attempts
            .record(&identifier, client.ip_address.as_deref(), outcome.is_ok())
            .await?;

        let user = outcome?;
        self.users.touch_last_login(user.id).await?;
        let tokens = self.open_session(&user, client).await?;

        tracing::info!(user_id = %user.id, "Login successful");
        Ok((user, tokens))
    }

    async fn check_credentials(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let credentials = self
            .users
            .credentials_by_login(identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !credentials.user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let hash = credentials
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash).map_err(|_| AuthError::InvalidCredentials)?;

        Ok(credentials.user)
    }

    /// Issue an access/refresh pair and store the session backing the
    /// access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub async fn open_session(
        &self,
        user: &User,
        client: &ClientInfo,
    ) -> Result<AuthTokens, AuthError> {
        let access = self.issue_session(user, client).await?;
        let refresh_token = self.jwt.issue_refresh(user.id, user.email.as_str())?;

        Ok(AuthTokens {
            access_token: access.token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.jwt.access_ttl_seconds(),
        })
    }

    /// Exchange a refresh token for a new access token and session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` for a bad refresh token, `UserNotFound` or
    /// `AccountDeactivated` if the account can no longer sign in.
    #[instrument(skip_all)]
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientInfo,
    ) -> Result<RefreshedToken, AuthError> {
        let claims = self.jwt.verify_refresh(refresh_token)?;
        let user = self
            .users
            .get_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let access = self.issue_session(&user, client).await?;

        Ok(RefreshedToken {
            access_token: access.token,
            token_type: "Bearer",
            expires_in: self.jwt.access_ttl_seconds(),
        })
    }

    /// Sign an access token and store the session backing it.
    ///
    /// A token that collides with a stored one is reissued once before the
    /// conflict is reported.
    async fn issue_session(
        &self,
        user: &User,
        client: &ClientInfo,
    ) -> Result<IssuedToken, AuthError> {
        let mut attempt = 1;
        loop {
            let access = self
                .jwt
                .issue_access(user.id, user.email.as_str(), &user.username)?;
            match self
                .store_session(user.id, &access.token, access.expires_at, client)
                .await
            {
                Ok(_) => return Ok(access),
                Err(AuthError::Repository(RepositoryError::Conflict(constraint)))
                    if attempt < SESSION_TOKEN_ATTEMPTS =>
                {
                    tracing::warn!(%constraint, attempt, "Session token collided, reissuing");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn store_session(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
        client: &ClientInfo,
    ) -> Result<Session, AuthError> {
        let session = self
            .sessions
            .create(
                NewSession {
                    user_id,
                    token,
                    ip_address: client.ip_address.as_deref(),
                    user_agent: client.user_agent.as_deref(),
                    expires_at,
                },
                self.security.max_sessions_per_user,
            )
            .await?;
        Ok(session)
    }

    /// Close the session backing a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the delete fails.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.delete_by_token(token).await?;
        Ok(())
    }

    /// A user's live sessions.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn sessions(&self, user_id: UserId) -> Result<Vec<Session>, AuthError> {
        Ok(self.sessions.list_for_user(user_id).await?)
    }

    /// Revoke one of the user's sessions.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if it does not exist or is not theirs.
    pub async fn revoke_session(&self, user_id: UserId, id: SessionId) -> Result<(), AuthError> {
        if self.sessions.delete_for_user(user_id, id).await? {
            Ok(())
        } else {
            Err(AuthError::SessionNotFound)
        }
    }

    /// Change a password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `IncorrectPassword`, `PasswordUnchanged` or `OAuthAccount`.
    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<User, AuthError> {
        let credentials = self
            .users
            .credentials_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let hash = credentials
            .password_hash
            .as_deref()
            .ok_or(AuthError::OAuthAccount)?;

        verify_password(current_password, hash).map_err(|_| AuthError::IncorrectPassword)?;
        if current_password == new_password {
            return Err(AuthError::PasswordUnchanged);
        }

        self.users
            .update_password(user_id, &hash_password(new_password)?)
            .await?;

        tracing::info!("Password changed");
        Ok(credentials.user)
    }
}

/// Emails are matched case-insensitively; usernames exactly.
fn normalize_identifier(identifier: &str) -> String {
    let identifier = identifier.trim();
    if identifier.contains('@') {
        identifier.to_lowercase()
    } else {
        identifier.to_owned()
    }
}

/// Minutes until a locked identifier may try again, or `None` when it is
/// not locked. The lock lifts once the oldest counted failure leaves the
/// window.
fn lockout_remaining(
    window: FailureWindow,
    max_attempts: i64,
    lockout_minutes: i64,
    now: DateTime<Utc>,
) -> Option<i64> {
    if window.failures < max_attempts {
        return None;
    }
    let elapsed_seconds = window
        .first_failure
        .map_or(0, |first| (now - first).num_seconds().max(0));
    let remaining_seconds = lockout_minutes * 60 - elapsed_seconds;
    Some(((remaining_seconds + 59) / 60).clamp(1, lockout_minutes))
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unreadable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("s3cret!pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret!pass", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong!pass1", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(verify_password("anything!", "not-a-hash").is_err());
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  Anita@Example.COM "), "anita@example.com");
        assert_eq!(normalize_identifier("Anita_D"), "Anita_D");
    }

    #[test]
    fn test_not_locked_below_threshold() {
        let window = FailureWindow {
            failures: 4,
            first_failure: Some(Utc::now()),
        };
        assert_eq!(lockout_remaining(window, 5, 15, Utc::now()), None);
    }

    #[test]
    fn test_locked_reports_remaining_minutes() {
        let now = Utc::now();
        let window = FailureWindow {
            failures: 5,
            first_failure: Some(now - TimeDelta::minutes(4)),
        };
        assert_eq!(lockout_remaining(window, 5, 15, now), Some(11));

        let window = FailureWindow {
            failures: 7,
            first_failure: Some(now),
        };
        assert_eq!(lockout_remaining(window, 5, 15, now), Some(15));
    }

    #[test]
    fn test_fifth_failure_locks_until_a_success() {
        use crate::db::login_attempts::LoginAttempt;

        let now = Utc::now();
        let failed = |minutes_ago| LoginAttempt {
            success: false,
            attempted_at: now - TimeDelta::minutes(minutes_ago),
        };
        let security = SecurityConfig::default();
        let locked = |attempts: &[LoginAttempt]| {
            lockout_remaining(
                FailureWindow::since_last_success(attempts),
                security.max_login_attempts,
                security.login_lockout_minutes,
                now,
            )
        };

        let mut attempts = vec![failed(5), failed(4), failed(3), failed(2)];
        assert_eq!(locked(&attempts), None);

        attempts.push(failed(1));
        assert_eq!(locked(&attempts), Some(10));

        // A success before the fifth failure starts the count over
        attempts.insert(
            4,
            LoginAttempt {
                success: true,
                attempted_at: now - TimeDelta::seconds(90),
            },
        );
        assert_eq!(locked(&attempts), None);
    }

    #[test]
    fn test_locked_never_reports_zero() {
        let now = Utc::now();
        let window = FailureWindow {
            failures: 5,
            first_failure: Some(now - TimeDelta::minutes(15)),
        };
        assert_eq!(lockout_remaining(window, 5, 15, now), Some(1));
    }
}
