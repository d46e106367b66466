//! One-time password records.

use chrono::{DateTime, Utc};

/// What an OTP was issued for. Stored as text in `otp_verification.purpose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Registration,
}

impl OtpPurpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
        }
    }
}

/// An issued OTP code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpRecord {
    pub id: i32,
    pub email: String,
    pub otp_code: String,
    pub is_verified: bool,
    /// Wrong guesses made against this code.
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
