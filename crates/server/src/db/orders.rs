//! Iron and wash order storage.

use std::collections::HashMap;

use sqlx::PgPool;
use tracing::instrument;

use quick_laundry_core::{OrderId, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::{
    NewOrder, Order, OrderCustomer, OrderDetail, OrderItem, OrderStatistics, OrderWithItems,
};

const ORDER_COLUMNS: &str = r"
    id, user_id, subtotal, tax, total, order_status, payment_status,
    delivery_date, pickup_date, notes, created_at, updated_at
";

const ITEM_COLUMNS: &str =
    "id, order_id, item_id, item_name, quantity, price, service_type, subtotal, created_at";

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// The order exists but work has already started.
    NotCancellable(OrderStatus),
    NotFound,
}

/// Repository for iron and wash orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its lines in one transaction. Lines are numbered
    /// from 1 in the order given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails; nothing is
    /// stored in that case.
    #[instrument(skip(self, new_order), fields(user_id = %new_order.user_id, items = new_order.items.len()))]
    pub async fn create(&self, new_order: &NewOrder) -> Result<OrderWithItems, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            INSERT INTO laundry.service_order (user_id, subtotal, tax, total, delivery_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(new_order.user_id)
        .bind(new_order.totals.subtotal)
        .bind(new_order.totals.tax)
        .bind(new_order.totals.total)
        .bind(new_order.delivery_date)
        .bind(&new_order.notes)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(new_order.items.len());
        for (position, item) in (1_i32..).zip(&new_order.items) {
            let row = sqlx::query_as::<_, OrderItem>(&format!(
                r"
                INSERT INTO laundry.service_order_item
                    (order_id, item_id, item_name, quantity, price, service_type, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {ITEM_COLUMNS}
                "
            ))
            .bind(order.id)
            .bind(position)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.price)
            .bind(&new_order.service_type)
            .bind(item.subtotal)
            .fetch_one(&mut *tx)
            .await?;
            items.push(row);
        }

        tx.commit().await?;

        Ok(OrderWithItems { order, items })
    }

    /// A customer's orders with their lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        limit: i64,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM laundry.service_order
            WHERE user_id = $1 AND ($2::laundry.order_status IS NULL OR order_status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "
        ))
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let rows = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM laundry.service_order_item
             WHERE order_id = ANY($1) ORDER BY order_id, item_id"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in rows {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }

    /// One of the customer's orders with lines and contact details.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(order) = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM laundry.service_order WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let customer = sqlx::query_as::<_, OrderCustomer>(
            "SELECT full_name, email, phone, address FROM laundry.user WHERE id = $1",
        )
        .bind(order.user_id)
        .fetch_one(self.pool)
        .await?;

        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM laundry.service_order_item
             WHERE order_id = $1 ORDER BY item_id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(OrderDetail {
            order,
            customer,
            items,
        }))
    }

    /// Per-status counts and total spend for a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn statistics(&self, user_id: UserId) -> Result<OrderStatistics, RepositoryError> {
        let stats = sqlx::query_as::<_, OrderStatistics>(
            r"
            SELECT COUNT(*) AS total_orders,
                   COUNT(*) FILTER (WHERE order_status = 'pending') AS pending_orders,
                   COUNT(*) FILTER (WHERE order_status = 'confirmed') AS confirmed_orders,
                   COUNT(*) FILTER (WHERE order_status = 'processing') AS processing_orders,
                   COUNT(*) FILTER (WHERE order_status = 'ready') AS ready_orders,
                   COUNT(*) FILTER (WHERE order_status = 'delivered') AS delivered_orders,
                   COUNT(*) FILTER (WHERE order_status = 'cancelled') AS cancelled_orders,
                   COALESCE(SUM(total), 0) AS total_spent
            FROM laundry.service_order
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }

    /// Set the status of one of the customer's orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist or
    /// belongs to someone else.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        user_id: UserId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE laundry.service_order SET order_status = $3 WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Cancel an order that has not started processing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: OrderId, user_id: UserId) -> Result<CancelOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<OrderStatus> = sqlx::query_scalar(
            "SELECT order_status FROM laundry.service_order
             WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match current {
            None => CancelOutcome::NotFound,
            Some(status) if !status.is_cancellable() => CancelOutcome::NotCancellable(status),
            Some(_) => {
                sqlx::query(
                    "UPDATE laundry.service_order SET order_status = 'cancelled' WHERE id = $1",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;
                CancelOutcome::Cancelled
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Delete one of the customer's orders. Lines cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: OrderId, user_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM laundry.service_order WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
