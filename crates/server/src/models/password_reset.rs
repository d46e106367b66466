//! Password reset token records.

use chrono::{DateTime, Utc};

/// A stored reset link. The token itself is a signed JWT; the row lets a
/// link be used once and be superseded by a newer one.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: i32,
    pub email: String,
    pub token: String,
    pub is_used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
