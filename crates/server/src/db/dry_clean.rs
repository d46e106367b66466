//! Dry-clean pickups and contact form enquiries.

use sqlx::PgPool;
use tracing::instrument;

use quick_laundry_core::{DryCleanOrderId, DryCleanStatus};

use super::RepositoryError;
use crate::models::{Contact, DryCleanOrder, DryCleanStatistics, NewContact, NewDryCleanOrder};

const ORDER_COLUMNS: &str = r"
    id, user_id, name, email, phone, address, service, items, pickup_date,
    pickup_time, special_instructions, status, created_at, updated_at
";

/// Filters for listing pickups.
#[derive(Debug, Clone, Default)]
pub struct DryCleanFilter {
    pub status: Option<DryCleanStatus>,
    /// Lowercased address compared verbatim; malformed values match nothing.
    pub email: Option<String>,
    pub limit: i64,
}

/// Repository for dry-clean orders and contacts.
pub struct DryCleanRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DryCleanRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a pickup request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, order), fields(email = %order.email.masked()))]
    pub async fn create_order(
        &self,
        order: &NewDryCleanOrder,
    ) -> Result<DryCleanOrder, RepositoryError> {
        let created = sqlx::query_as::<_, DryCleanOrder>(&format!(
            r"
            INSERT INTO laundry.dry_clean_order (
                user_id, name, email, phone, address, service, items,
                pickup_date, pickup_time, special_instructions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(&order.name)
        .bind(order.email.as_str())
        .bind(&order.phone)
        .bind(&order.address)
        .bind(&order.service)
        .bind(&order.items)
        .bind(order.pickup_date)
        .bind(&order.pickup_time)
        .bind(&order.special_instructions)
        .fetch_one(self.pool)
        .await?;

        Ok(created)
    }

    /// Pickups matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_orders(
        &self,
        filter: &DryCleanFilter,
    ) -> Result<Vec<DryCleanOrder>, RepositoryError> {
        let orders = sqlx::query_as::<_, DryCleanOrder>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM laundry.dry_clean_order
            WHERE ($1::laundry.dry_clean_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR email = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "
        ))
        .bind(filter.status)
        .bind(filter.email.as_deref())
        .bind(filter.limit)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// A pickup by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_order(
        &self,
        id: DryCleanOrderId,
    ) -> Result<Option<DryCleanOrder>, RepositoryError> {
        let order = sqlx::query_as::<_, DryCleanOrder>(&format!(
            "SELECT {ORDER_COLUMNS} FROM laundry.dry_clean_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Set a pickup's status and return the updated row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the pickup does not exist.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: DryCleanOrderId,
        status: DryCleanStatus,
    ) -> Result<DryCleanOrder, RepositoryError> {
        sqlx::query_as::<_, DryCleanOrder>(&format!(
            "UPDATE laundry.dry_clean_order SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a pickup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_order(&self, id: DryCleanOrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM laundry.dry_clean_order WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Per-status pickup counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn statistics(&self) -> Result<DryCleanStatistics, RepositoryError> {
        let stats = sqlx::query_as::<_, DryCleanStatistics>(
            r"
            SELECT COUNT(*) AS total_orders,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders,
                   COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed_orders,
                   COUNT(*) FILTER (WHERE status = 'processing') AS processing_orders,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed_orders,
                   COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_orders
            FROM laundry.dry_clean_order
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }

    /// Total number of pickups.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_orders(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM laundry.dry_clean_order")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Store a contact form submission.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, contact), fields(email = %contact.email.masked()))]
    pub async fn create_contact(&self, contact: &NewContact) -> Result<Contact, RepositoryError> {
        let created = sqlx::query_as::<_, Contact>(
            r"
            INSERT INTO laundry.dry_clean_contact (name, email, phone, subject, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, phone, subject, message, status, created_at
            ",
        )
        .bind(&contact.name)
        .bind(contact.email.as_str())
        .bind(contact.phone.as_deref())
        .bind(&contact.subject)
        .bind(&contact.message)
        .fetch_one(self.pool)
        .await?;

        Ok(created)
    }
}
