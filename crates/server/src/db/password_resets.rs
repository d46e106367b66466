//! Password reset token storage.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use quick_laundry_core::Email;

use super::{RepositoryError, map_unique_violation};
use crate::models::PasswordResetToken;

/// Repository for password reset links.
pub struct PasswordResetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PasswordResetRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Number of reset links issued for this email in the last `window_hours`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_recent(&self, email: &Email, window_hours: i64) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM laundry.password_reset_token
            WHERE email = $1 AND created_at > NOW() - make_interval(hours => $2::int)
            ",
        )
        .bind(email.as_str())
        .bind(window_hours)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Expire older live links for this email and store a new one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the token is already stored,
    /// or `RepositoryError::Database` if either statement fails.
    #[instrument(skip(self, token), fields(email = %email.masked()))]
    pub async fn replace(
        &self,
        email: &Email,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE laundry.password_reset_token SET expires_at = NOW()
            WHERE email = $1 AND is_used = FALSE AND expires_at > NOW()
            ",
        )
        .bind(email.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO laundry.password_reset_token (email, token, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(email.as_str())
        .bind(token)
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        tx.commit().await?;
        Ok(())
    }

    /// Look up a stored link by its token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetToken>, RepositoryError> {
        let row = sqlx::query_as::<_, PasswordResetToken>(
            r"
            SELECT id, email, token, is_used, expires_at, created_at
            FROM laundry.password_reset_token
            WHERE token = $1
            ",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Mark a link used. Returns `false` if it was already used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_used(&self, id: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE laundry.password_reset_token SET is_used = TRUE, used_at = NOW()
            WHERE id = $1 AND is_used = FALSE
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete links past their expiry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_expired(&self) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query(r"DELETE FROM laundry.password_reset_token WHERE expires_at < NOW()")
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
