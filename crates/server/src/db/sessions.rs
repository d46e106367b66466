//! Session storage. A session row keeps an access token usable.

use sqlx::PgPool;
use tracing::instrument;

use quick_laundry_core::{SessionId, UserId};

use super::{RepositoryError, map_unique_violation};
use crate::models::{NewSession, Session};

const SESSION_COLUMNS: &str =
    "id, user_id, token, ip_address, user_agent, expires_at, created_at, last_activity";

/// Repository for login sessions.
pub struct SessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a session, then prune the user's oldest sessions beyond
    /// `max_sessions`. Both statements run in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the token is already stored,
    /// or `RepositoryError::Database` if either statement fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn create(
        &self,
        session: NewSession<'_>,
        max_sessions: i64,
    ) -> Result<Session, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Session>(&format!(
            r"
            INSERT INTO laundry.user_session (user_id, token, ip_address, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SESSION_COLUMNS}
            "
        ))
        .bind(session.user_id)
        .bind(session.token)
        .bind(session.ip_address)
        .bind(session.user_agent)
        .bind(session.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        let pruned = sqlx::query(
            r"
            DELETE FROM laundry.user_session
            WHERE user_id = $1 AND id NOT IN (
                SELECT id FROM laundry.user_session
                WHERE user_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
            )
            ",
        )
        .bind(session.user_id)
        .bind(max_sessions)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if pruned.rows_affected() > 0 {
            tracing::debug!(pruned = pruned.rows_affected(), "Pruned old sessions");
        }

        Ok(created)
    }

    /// Find a live session by its token and bump its activity stamp.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_live(&self, token: &str) -> Result<Option<Session>, RepositoryError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            r"
            UPDATE laundry.user_session SET last_activity = NOW()
            WHERE token = $1 AND expires_at > NOW()
            RETURNING {SESSION_COLUMNS}
            "
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(session)
    }

    /// Live sessions for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Session>, RepositoryError> {
        let sessions = sqlx::query_as::<_, Session>(&format!(
            r"
            SELECT {SESSION_COLUMNS} FROM laundry.user_session
            WHERE user_id = $1 AND expires_at > NOW()
            ORDER BY created_at DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(sessions)
    }

    /// Delete the session backing a token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(r"DELETE FROM laundry.user_session WHERE token = $1")
            .bind(token)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete one of the user's sessions. Returns `false` if the session does
    /// not exist or belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_for_user(
        &self,
        user_id: UserId,
        id: SessionId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(r"DELETE FROM laundry.user_session WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every session of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_all_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(r"DELETE FROM laundry.user_session WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete sessions past their expiry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(r"DELETE FROM laundry.user_session WHERE expires_at < NOW()")
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
