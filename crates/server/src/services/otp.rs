//! Registration OTP codes.
//!
//! A code is issued per email, expires after `OTP_EXPIRY_MINUTES`, and can be
//! verified once. Issuing a new code expires the previous live ones. At most
//! `OTP_MAX_ATTEMPTS` codes may be issued per window, and each code tolerates
//! the same number of wrong guesses.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use quick_laundry_core::Email;

use crate::config::SecurityConfig;
use crate::db::{OtpRepository, RepositoryError};
use crate::models::{OtpPurpose, OtpRecord};

/// Why an OTP request or verification was refused.
#[derive(Debug, Error)]
pub enum OtpError {
    #[error("No OTP found for this email")]
    NotFound,

    #[error("OTP has already been used")]
    AlreadyUsed,

    #[error("OTP has expired. Please request a new one")]
    Expired,

    #[error("Too many failed attempts. Please request a new OTP")]
    TooManyAttempts,

    #[error("Invalid OTP code")]
    Mismatch,

    #[error("Too many OTP requests. Please try again after {minutes} minutes")]
    TooManyRequests { minutes: i64 },

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl OtpError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Generate a random 6-digit code. Leading zeros are kept.
#[must_use]
pub fn generate_code() -> String {
    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:06}")
}

/// Check a guess against a stored code.
///
/// Checks run in a fixed order: already used, expired, attempts exhausted,
/// then mismatch. Only a mismatch should count as a failed attempt.
///
/// # Errors
///
/// Returns the first failed check.
pub fn check_code(
    record: &OtpRecord,
    code: &str,
    now: DateTime<Utc>,
    max_attempts: i64,
) -> Result<(), OtpError> {
    if record.is_verified {
        return Err(OtpError::AlreadyUsed);
    }
    if now >= record.expires_at {
        return Err(OtpError::Expired);
    }
    if i64::from(record.attempts) >= max_attempts {
        return Err(OtpError::TooManyAttempts);
    }
    if record.otp_code != code {
        return Err(OtpError::Mismatch);
    }
    Ok(())
}

/// OTP issuance and verification over the `otp_verification` table.
pub struct OtpService<'a> {
    codes: OtpRepository<'a>,
    expiry_minutes: i64,
    max_attempts: i64,
}

impl<'a> OtpService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, security: &SecurityConfig) -> Self {
        Self {
            codes: OtpRepository::new(pool),
            expiry_minutes: security.otp_expiry_minutes,
            max_attempts: security.otp_max_attempts,
        }
    }

    /// Issue a new registration code.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::TooManyRequests` when the window is exhausted.
    #[instrument(skip(self), fields(email = %email.masked()))]
    pub async fn request(&self, email: &Email) -> Result<OtpRecord, OtpError> {
        let recent = self
            .codes
            .count_recent(email, OtpPurpose::Registration, self.expiry_minutes)
            .await?;
        if recent >= self.max_attempts {
            tracing::warn!(recent, "OTP request rate limit hit");
            return Err(OtpError::TooManyRequests {
                minutes: self.expiry_minutes,
            });
        }

        let record = self
            .codes
            .replace(
                email,
                OtpPurpose::Registration,
                &generate_code(),
                self.expiry_minutes,
            )
            .await?;

        Ok(record)
    }

    /// Verify a code against the latest one issued for this email.
    ///
    /// # Errors
    ///
    /// Returns the matching `OtpError` when the code is refused.
    #[instrument(skip(self, code), fields(email = %email.masked()))]
    pub async fn verify(&self, email: &Email, code: &str) -> Result<(), OtpError> {
        let record = self
            .codes
            .latest(email, OtpPurpose::Registration)
            .await?
            .ok_or(OtpError::NotFound)?;

        match check_code(&record, code, Utc::now(), self.max_attempts) {
            Ok(()) => {}
            Err(OtpError::Mismatch) => {
                self.codes.increment_attempts(record.id).await?;
                return Err(OtpError::Mismatch);
            }
            Err(e) => return Err(e),
        }

        if !self.codes.mark_verified(record.id).await? {
            return Err(OtpError::AlreadyUsed);
        }

        tracing::info!("OTP verified");
        Ok(())
    }

    /// Whether this email holds a verified, unexpired code.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::Repository` if the lookup fails.
    pub async fn is_verified(&self, email: &Email) -> Result<bool, OtpError> {
        Ok(self
            .codes
            .has_verified(email, OtpPurpose::Registration)
            .await?)
    }

    /// Drop all codes for an email once it has been registered.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::Repository` if the delete fails.
    pub async fn consume(&self, email: &Email) -> Result<(), OtpError> {
        self.codes
            .delete_for_email(email, OtpPurpose::Registration)
            .await?;
        Ok(())
    }

    /// Minutes a code stays valid.
    #[must_use]
    pub const fn expiry_minutes(&self) -> i64 {
        self.expiry_minutes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn record(now: DateTime<Utc>) -> OtpRecord {
        OtpRecord {
            id: 1,
            email: "anita@example.com".to_string(),
            otp_code: "048213".to_string(),
            is_verified: false,
            attempts: 0,
            expires_at: now + TimeDelta::minutes(10),
            created_at: now,
        }
    }

    #[test]
    fn test_generate_code_format() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_matching_code_passes() {
        let now = Utc::now();
        assert!(check_code(&record(now), "048213", now, 5).is_ok());
    }

    #[test]
    fn test_mismatch() {
        let now = Utc::now();
        assert!(matches!(
            check_code(&record(now), "048214", now, 5),
            Err(OtpError::Mismatch)
        ));
    }

    #[test]
    fn test_expired_code_fails_even_when_correct() {
        let now = Utc::now();
        let later = now + TimeDelta::minutes(11);
        assert!(matches!(
            check_code(&record(now), "048213", later, 5),
            Err(OtpError::Expired)
        ));
    }

    #[test]
    fn test_attempts_exhausted_fails_even_when_correct() {
        let now = Utc::now();
        let mut rec = record(now);
        rec.attempts = 5;
        assert!(matches!(
            check_code(&rec, "048213", now, 5),
            Err(OtpError::TooManyAttempts)
        ));

        rec.attempts = 4;
        assert!(check_code(&rec, "048213", now, 5).is_ok());
    }

    #[test]
    fn test_verified_code_cannot_be_reused() {
        let now = Utc::now();
        let mut rec = record(now);
        rec.is_verified = true;
        assert!(matches!(
            check_code(&rec, "048213", now, 5),
            Err(OtpError::AlreadyUsed)
        ));
    }

    #[test]
    fn test_used_is_checked_before_expiry() {
        let now = Utc::now();
        let mut rec = record(now);
        rec.is_verified = true;
        let later = now + TimeDelta::hours(1);
        assert!(matches!(
            check_code(&rec, "000000", later, 5),
            Err(OtpError::AlreadyUsed)
        ));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            OtpError::TooManyRequests { minutes: 10 }.to_string(),
            "Too many OTP requests. Please try again after 10 minutes"
        );
        assert_eq!(
            OtpError::TooManyRequests { minutes: 10 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(OtpError::Mismatch.status(), StatusCode::BAD_REQUEST);
    }
}
