//! User repository for database operations.
//!
//! Rows are read into [`UserRow`] and converted into domain types so that a
//! malformed email in the table surfaces as `DataCorruption` instead of
//! leaking into responses.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use quick_laundry_core::{CommunicationPreference, Email, ServiceTier, UserId};

use super::{RepositoryError, map_unique_violation};
use crate::models::user::{NewUser, ProfileChanges, User, UserCredentials};

const USER_COLUMNS: &str = r"
    id, email, username, phone, password_hash, full_name, address, city, pincode,
    service_type, communication_preference, subscribe_newsletter, profile_picture,
    oauth_provider, is_active, email_verified, last_login, created_at, updated_at
";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    username: String,
    phone: Option<String>,
    password_hash: Option<String>,
    full_name: Option<String>,
    address: Option<String>,
    city: Option<String>,
    pincode: Option<String>,
    service_type: ServiceTier,
    communication_preference: CommunicationPreference,
    subscribe_newsletter: bool,
    profile_picture: Option<String>,
    oauth_provider: Option<String>,
    is_active: bool,
    email_verified: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserCredentials {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            user: User {
                id: r.id,
                email,
                username: r.username,
                phone: r.phone,
                full_name: r.full_name,
                address: r.address,
                city: r.city,
                pincode: r.pincode,
                service_type: r.service_type,
                communication_preference: r.communication_preference,
                subscribe_newsletter: r.subscribe_newsletter,
                profile_picture: r.profile_picture,
                oauth_provider: r.oauth_provider,
                is_active: r.is_active,
                email_verified: r.email_verified,
                last_login: r.last_login,
                created_at: r.created_at,
                updated_at: r.updated_at,
            },
            password_hash: r.password_hash,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        UserCredentials::try_from(r).map(|c| c.user)
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM laundry.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    #[instrument(skip(self), fields(email = %email.masked()))]
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.credentials_by_email(email).await?.map(|c| c.user))
    }

    /// Get a user and password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM laundry.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(UserCredentials::try_from).transpose()
    }

    /// Get a user and password hash by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn credentials_by_id(
        &self,
        id: UserId,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM laundry.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(UserCredentials::try_from).transpose()
    }

    /// Look up the account a login identifier refers to.
    ///
    /// The identifier matches either the (lowercased) email or the username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn credentials_by_login(
        &self,
        identifier: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM laundry.user
             WHERE email = LOWER($1) OR username = $1
             ORDER BY (email = LOWER($1)) DESC
             LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(self.pool)
        .await?;

        row.map(UserCredentials::try_from).transpose()
    }

    /// Create a new account with a verified email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` carrying the violated constraint
    /// (`user_email_key`, `user_username_key` or `user_phone_key`).
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, new_user, password_hash), fields(username = %new_user.username))]
    pub async fn create(
        &self,
        new_user: &NewUser,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO laundry.user (
                email, username, phone, password_hash, full_name, address, city, pincode,
                service_type, communication_preference, subscribe_newsletter, email_verified
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(new_user.email.as_str())
        .bind(&new_user.username)
        .bind(&new_user.phone)
        .bind(password_hash)
        .bind(new_user.full_name.as_deref())
        .bind(&new_user.address)
        .bind(&new_user.city)
        .bind(&new_user.pincode)
        .bind(new_user.service_type)
        .bind(new_user.communication_preference)
        .bind(new_user.subscribe_newsletter)
        .fetch_one(self.pool)
        .await
        .map_err(map_unique_violation)?;

        User::try_from(row)
    }

    /// Apply profile changes. Unset fields keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the phone number is taken.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE laundry.user SET
                phone = COALESCE($2, phone),
                full_name = CASE WHEN $3 THEN $4 ELSE full_name END,
                address = COALESCE($5, address),
                city = COALESCE($6, city),
                pincode = COALESCE($7, pincode),
                service_type = COALESCE($8, service_type),
                communication_preference = COALESCE($9, communication_preference),
                subscribe_newsletter = COALESCE($10, subscribe_newsletter)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(changes.phone.as_deref())
        .bind(changes.full_name.is_some())
        .bind(changes.full_name.clone().flatten())
        .bind(changes.address.as_deref())
        .bind(changes.city.as_deref())
        .bind(changes.pincode.as_deref())
        .bind(changes.service_type)
        .bind(changes.communication_preference)
        .bind(changes.subscribe_newsletter)
        .fetch_optional(self.pool)
        .await
        .map_err(map_unique_violation)?;

        row.map(User::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(r"UPDATE laundry.user SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Set or clear the stored avatar path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_profile_picture(
        &self,
        id: UserId,
        path: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE laundry.user SET profile_picture = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(path)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Stamp a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_last_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(r"UPDATE laundry.user SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Enable or disable an account.
    ///
    /// Returns `false` when no account has this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_active(&self, email: &Email, active: bool) -> Result<bool, RepositoryError> {
        let result = sqlx::query(r"UPDATE laundry.user SET is_active = $2 WHERE email = $1")
            .bind(email.as_str())
            .bind(active)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an account. Sessions and iron orders cascade; dry-clean orders
    /// keep their rows with the user detached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_email(&self, email: &Email) -> Result<bool, RepositoryError> {
        let result = sqlx::query(r"DELETE FROM laundry.user WHERE email = $1")
            .bind(email.as_str())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
