//! JWT issuance and verification.
//!
//! Three token kinds share one HS256 key:
//!
//! - access: `{user_id, email, username, iat, exp, jti}`, sent as the bearer token
//! - refresh: `{user_id, email, type: "refresh", iat, exp, jti}`
//! - password reset: `{email, type: "password_reset", iat, exp, jti}`
//!
//! `jti` is a random v4 UUID, so two tokens minted for the same subject in
//! the same second still differ. Session and reset rows key on the token.
//!
//! The claim sets are disjoint enough that decoding one kind as another
//! fails, so a refresh or reset token is never accepted as an access token.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use axum::http::StatusCode;
use quick_laundry_core::UserId;

use crate::config::JwtConfig;

const REFRESH_TYPE: &str = "refresh";
const RESET_TYPE: &str = "password_reset";

/// Errors from token verification or signing.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    /// Token decoded but carries the wrong `type` claim.
    #[error("Invalid token type")]
    InvalidType,

    #[error("token encoding failed: {0}")]
    Encoding(jsonwebtoken::errors::Error),
}

impl TokenError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Expired | Self::Invalid | Self::InvalidType => StatusCode::UNAUTHORIZED,
            Self::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Claims of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: UserId,
    pub email: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

/// Claims of a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: UserId,
    pub email: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

/// Claims of a password reset token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    pub email: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

/// A signed token and the moment it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies tokens with the configured key and lifetimes.
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
    reset_ttl: TimeDelta,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Build the service from config. `reset_hours` is the password reset
    /// link lifetime.
    #[must_use]
    pub fn new(config: &JwtConfig, reset_hours: i64) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl: TimeDelta::hours(config.access_token_hours),
            refresh_ttl: TimeDelta::days(config.refresh_token_days),
            reset_ttl: TimeDelta::hours(reset_hours),
        }
    }

    /// Access token lifetime in seconds, as reported to clients.
    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Sign an access token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue_access(
        &self,
        user_id: UserId,
        email: &str,
        username: &str,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;
        let claims = AccessClaims {
            user_id,
            email: email.to_owned(),
            username: username.to_owned(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };
        Ok(IssuedToken {
            token: self.encode(&claims)?,
            expires_at,
        })
    }

    /// Sign a refresh token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue_refresh(&self, user_id: UserId, email: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            user_id,
            email: email.to_owned(),
            token_type: REFRESH_TYPE.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        self.encode(&claims)
    }

    /// Sign a password reset token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue_reset(&self, email: &str) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.reset_ttl;
        let claims = ResetClaims {
            email: email.to_owned(),
            token_type: RESET_TYPE.to_owned(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };
        Ok(IssuedToken {
            token: self.encode(&claims)?,
            expires_at,
        })
    }

    /// Verify an access token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` or `TokenError::Invalid`.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.decode(token)
    }

    /// Verify a refresh token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired`, `TokenError::Invalid`, or
    /// `TokenError::InvalidType` for a token of another kind.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.decode(token)?;
        if claims.token_type != REFRESH_TYPE {
            return Err(TokenError::InvalidType);
        }
        Ok(claims)
    }

    /// Verify a password reset token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired`, `TokenError::Invalid`, or
    /// `TokenError::InvalidType` for a token of another kind.
    pub fn verify_reset(&self, token: &str) -> Result<ResetClaims, TokenError> {
        let claims: ResetClaims = self.decode(token)?;
        if claims.token_type != RESET_TYPE {
            return Err(TokenError::InvalidType);
        }
        Ok(claims)
    }

    fn encode<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(TokenError::Encoding)
    }

    fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        jsonwebtoken::decode::<T>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
