//! Session-related types.
//!
//! A session row makes a bearer token revocable: protected routes accept an
//! access token only while its session row exists and has not expired.

use chrono::{DateTime, Utc};
use serde::Serialize;

use quick_laundry_core::{SessionId, UserId};

/// A stored login session.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    /// The access token this session backs. Never sent back to clients.
    #[serde(skip)]
    pub token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Data needed to open a session.
#[derive(Debug, Clone, Copy)]
pub struct NewSession<'a> {
    pub user_id: UserId,
    pub token: &'a str,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub expires_at: DateTime<Utc>,
}

/// The authenticated caller, resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub username: String,
    /// Raw bearer token, kept so logout can close this exact session.
    pub token: String,
}
