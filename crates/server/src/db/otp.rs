//! OTP code storage.

use sqlx::PgPool;
use tracing::instrument;

use quick_laundry_core::Email;

use super::RepositoryError;
use crate::models::{OtpPurpose, OtpRecord};

/// Repository for registration OTP codes.
pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Number of codes issued for this email in the last `window_minutes`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_recent(
        &self,
        email: &Email,
        purpose: OtpPurpose,
        window_minutes: i64,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM laundry.otp_verification
            WHERE email = $1 AND purpose = $2
              AND created_at > NOW() - make_interval(mins => $3::int)
            ",
        )
        .bind(email.as_str())
        .bind(purpose.as_str())
        .bind(window_minutes)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Expire every live unverified code for this email and store a new one,
    /// in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either statement fails; the
    /// transaction is rolled back.
    #[instrument(skip(self, code), fields(email = %email.masked()))]
    pub async fn replace(
        &self,
        email: &Email,
        purpose: OtpPurpose,
        code: &str,
        expiry_minutes: i64,
    ) -> Result<OtpRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE laundry.otp_verification SET expires_at = NOW()
            WHERE email = $1 AND purpose = $2
              AND is_verified = FALSE AND expires_at > NOW()
            ",
        )
        .bind(email.as_str())
        .bind(purpose.as_str())
        .execute(&mut *tx)
        .await?;

        let record = sqlx::query_as::<_, OtpRecord>(
            r"
            INSERT INTO laundry.otp_verification (email, otp_code, purpose, expires_at)
            VALUES ($1, $2, $3, NOW() + make_interval(mins => $4::int))
            RETURNING id, email, otp_code, is_verified, attempts, expires_at, created_at
            ",
        )
        .bind(email.as_str())
        .bind(code)
        .bind(purpose.as_str())
        .bind(expiry_minutes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(record)
    }

    /// The most recently issued code for this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(
        &self,
        email: &Email,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, OtpRecord>(
            r"
            SELECT id, email, otp_code, is_verified, attempts, expires_at, created_at
            FROM laundry.otp_verification
            WHERE email = $1 AND purpose = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(email.as_str())
        .bind(purpose.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Count a wrong guess against a code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn increment_attempts(&self, id: i32) -> Result<(), RepositoryError> {
        sqlx::query(r"UPDATE laundry.otp_verification SET attempts = attempts + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Mark a code verified. Returns `false` if it was verified concurrently.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_verified(&self, id: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE laundry.otp_verification
            SET is_verified = TRUE, verified_at = NOW()
            WHERE id = $1 AND is_verified = FALSE
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether a verified, unexpired code exists for this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_verified(
        &self,
        email: &Email,
        purpose: OtpPurpose,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM laundry.otp_verification
                WHERE email = $1 AND purpose = $2
                  AND is_verified = TRUE AND expires_at > NOW()
            )
            ",
        )
        .bind(email.as_str())
        .bind(purpose.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Drop every code for this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_for_email(
        &self,
        email: &Email,
        purpose: OtpPurpose,
    ) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query(r"DELETE FROM laundry.otp_verification WHERE email = $1 AND purpose = $2")
                .bind(email.as_str())
                .bind(purpose.as_str())
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    /// Delete codes past their expiry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(r"DELETE FROM laundry.otp_verification WHERE expires_at < NOW()")
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
