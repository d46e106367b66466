//! Login audit trail backing account lockouts.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;

/// One recorded login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct LoginAttempt {
    pub success: bool,
    pub attempted_at: DateTime<Utc>,
}

/// Failed attempts inside a lockout window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureWindow {
    pub failures: i64,
    /// Oldest failure still inside the window.
    pub first_failure: Option<DateTime<Utc>>,
}

impl FailureWindow {
    /// Count the failures after the most recent success. `attempts` may be in
    /// any order.
    #[must_use]
    pub fn since_last_success(attempts: &[LoginAttempt]) -> Self {
        let last_success = attempts
            .iter()
            .filter(|a| a.success)
            .map(|a| a.attempted_at)
            .max();

        attempts
            .iter()
            .filter(|a| !a.success)
            .filter(|a| last_success.is_none_or(|ok| a.attempted_at > ok))
            .fold(Self::default(), |window, attempt| Self {
                failures: window.failures + 1,
                first_failure: Some(
                    window
                        .first_failure
                        .map_or(attempt.attempted_at, |first| first.min(attempt.attempted_at)),
                ),
            })
    }
}

/// Repository for login attempt records.
pub struct LoginAttemptRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LoginAttemptRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record one login attempt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self))]
    pub async fn record(
        &self,
        identifier: &str,
        ip_address: Option<&str>,
        success: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"INSERT INTO laundry.login_attempt (identifier, ip_address, success)
              VALUES ($1, $2, $3)",
        )
        .bind(identifier)
        .bind(ip_address)
        .bind(success)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Count failed attempts for an identifier since the last success,
    /// limited to the last `window_minutes`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_failures(
        &self,
        identifier: &str,
        window_minutes: i64,
    ) -> Result<FailureWindow, RepositoryError> {
        let attempts = sqlx::query_as::<_, LoginAttempt>(
            r"
            SELECT success, attempted_at
            FROM laundry.login_attempt
            WHERE identifier = $1
              AND attempted_at > NOW() - make_interval(mins => $2::int)
            ",
        )
        .bind(identifier)
        .bind(window_minutes)
        .fetch_all(self.pool)
        .await?;

        Ok(FailureWindow::since_last_success(&attempts))
    }

    /// Delete attempts older than `days`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_older_than(&self, days: i64) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"DELETE FROM laundry.login_attempt
              WHERE attempted_at < NOW() - make_interval(days => $1::int)",
        )
        .bind(days)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn attempt(success: bool, minutes_ago: i64, now: DateTime<Utc>) -> LoginAttempt {
        LoginAttempt {
            success,
            attempted_at: now - TimeDelta::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_no_attempts() {
        assert_eq!(FailureWindow::since_last_success(&[]), FailureWindow::default());
    }

    #[test]
    fn test_counts_every_failure_without_success() {
        let now = Utc::now();
        let attempts: Vec<_> = (1..=5).map(|m| attempt(false, m, now)).collect();

        let window = FailureWindow::since_last_success(&attempts);
        assert_eq!(window.failures, 5);
        assert_eq!(window.first_failure, Some(now - TimeDelta::minutes(5)));
    }

    #[test]
    fn test_success_resets_the_count() {
        let now = Utc::now();
        let attempts = [
            attempt(false, 10, now),
            attempt(false, 9, now),
            attempt(false, 8, now),
            attempt(false, 7, now),
            attempt(true, 6, now),
            attempt(false, 2, now),
            attempt(false, 1, now),
        ];

        let window = FailureWindow::since_last_success(&attempts);
        assert_eq!(window.failures, 2);
        assert_eq!(window.first_failure, Some(now - TimeDelta::minutes(2)));
    }

    #[test]
    fn test_latest_attempt_success_clears_window() {
        let now = Utc::now();
        let attempts = [
            attempt(true, 0, now),
            attempt(false, 3, now),
            attempt(false, 4, now),
        ];
        assert_eq!(
            FailureWindow::since_last_success(&attempts),
            FailureWindow::default()
        );
    }
}
