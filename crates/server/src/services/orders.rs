//! Placing and cancelling iron/wash orders.

use axum::http::StatusCode;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use quick_laundry_core::{OrderId, OrderStatus, OrderTotals, UserId, delivery_date};

use crate::db::{CancelOutcome, OrderRepository, RepositoryError};
use crate::models::{NewOrder, NewOrderItem, OrderWithItems};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    NoItems,

    #[error("Invalid total items count")]
    InvalidItemCount,

    #[error("Invalid total amount")]
    InvalidAmount,

    #[error("Order not found")]
    NotFound,

    #[error("Order cannot be cancelled at this stage")]
    NotCancellable(OrderStatus),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl OrderError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

fn default_service_type() -> String {
    "iron".to_string()
}

fn default_item_name() -> String {
    "Iron Service".to_string()
}

/// An order as submitted by the booking page.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDraft {
    #[serde(default)]
    pub items: Vec<DraftItem>,
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default)]
    pub total_items: Option<i64>,
    /// Pre-tax amount computed by the page.
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub urgent_items: i32,
    #[serde(default)]
    pub normal_items: i32,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftItem {
    #[serde(default = "default_item_name")]
    pub service: String,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub price_per_item: Decimal,
    #[serde(default)]
    pub subtotal: Decimal,
}

impl OrderDraft {
    /// Validate and price the draft for `user_id`, placed at `placed_at`
    /// shop time.
    ///
    /// # Errors
    ///
    /// Returns `NoItems`, `InvalidItemCount` or `InvalidAmount`.
    pub fn prepare(self, user_id: UserId, placed_at: NaiveDateTime) -> Result<NewOrder, OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if !self.total_items.is_some_and(|n| n > 0) {
            return Err(OrderError::InvalidItemCount);
        }
        let amount = self
            .total_amount
            .filter(|amount| *amount > Decimal::ZERO)
            .ok_or(OrderError::InvalidAmount)?;

        let notes = self.summary_notes();
        let items = self
            .items
            .into_iter()
            .map(|item| NewOrderItem {
                name: item.service,
                quantity: item.quantity,
                price: item.price_per_item,
                subtotal: item.subtotal,
            })
            .collect();

        Ok(NewOrder {
            user_id,
            totals: OrderTotals::from_subtotal(amount),
            delivery_date: delivery_date(placed_at, self.urgent_items),
            notes,
            service_type: self.service_type,
            items,
        })
    }

    /// Booking details folded into the order's notes column.
    fn summary_notes(&self) -> String {
        let mut notes = format!(
            "Service: {} | Address: {} | Contact: {} | Urgent: {} | Normal: {}",
            self.service_type,
            self.delivery_address,
            self.contact_number,
            self.urgent_items,
            self.normal_items
        );
        if !self.notes.is_empty() {
            notes.push_str(" | Notes: ");
            notes.push_str(&self.notes);
        }
        notes
    }
}

/// Order placement and cancellation.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            orders: OrderRepository::new(pool),
        }
    }

    /// Price and store a draft. Delivery is computed from the shop's local
    /// clock.
    ///
    /// # Errors
    ///
    /// Returns the draft's validation error, or `Repository` if the insert
    /// fails.
    #[instrument(skip(self, draft), fields(items = draft.items.len()))]
    pub async fn place(
        &self,
        user_id: UserId,
        draft: OrderDraft,
    ) -> Result<OrderWithItems, OrderError> {
        let placed_at = chrono::Local::now().naive_local();
        let new_order = draft.prepare(user_id, placed_at)?;
        let order = self.orders.create(&new_order).await?;

        tracing::info!(
            order_id = %order.order.id,
            total = %order.order.total,
            delivery = %order.order.delivery_date,
            "Order placed"
        );
        Ok(order)
    }

    /// Cancel an order that has not been picked up for processing yet.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `NotCancellable`.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: OrderId, user_id: UserId) -> Result<(), OrderError> {
        match self.orders.cancel(id, user_id).await? {
            CancelOutcome::Cancelled => {
                tracing::info!("Order cancelled");
                Ok(())
            }
            CancelOutcome::NotCancellable(status) => Err(OrderError::NotCancellable(status)),
            CancelOutcome::NotFound => Err(OrderError::NotFound),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn placed_at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
    }

    fn draft(value: serde_json::Value) -> OrderDraft {
        serde_json::from_value(value).unwrap()
    }

    fn sample() -> serde_json::Value {
        json!({
            "items": [
                {"service": "Shirt", "quantity": 3, "price_per_item": 10, "subtotal": 30},
                {"quantity": 2, "price_per_item": "35.00", "subtotal": "70.00"}
            ],
            "total_items": 5,
            "total_amount": 100,
            "urgent_items": 0,
            "normal_items": 5,
            "delivery_address": "12 MG Road",
            "contact_number": "9876543210"
        })
    }

    #[test]
    fn test_prepare_prices_and_numbers_items() {
        let order = draft(sample())
            .prepare(UserId::new(4), placed_at(10))
            .unwrap();

        assert_eq!(order.totals.subtotal, Decimal::new(100, 0));
        assert_eq!(order.totals.tax, Decimal::new(1800, 2));
        assert_eq!(order.totals.total, Decimal::new(11800, 2));
        assert_eq!(order.service_type, "iron");
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[1].name, "Iron Service");
        assert_eq!(order.delivery_date, placed_at(10) + chrono::TimeDelta::hours(24));
    }

    #[test]
    fn test_prepare_urgent_delivery() {
        let mut value = sample();
        value["urgent_items"] = json!(1);
        let order = draft(value).prepare(UserId::new(4), placed_at(19)).unwrap();
        let next_evening = NaiveDate::from_ymd_opt(2025, 6, 3)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap();
        assert_eq!(order.delivery_date, next_evening);
    }

    #[test]
    fn test_notes_summary() {
        let mut value = sample();
        value["notes"] = json!("Ring twice");
        let order = draft(value).prepare(UserId::new(4), placed_at(10)).unwrap();
        assert_eq!(
            order.notes,
            "Service: iron | Address: 12 MG Road | Contact: 9876543210 | Urgent: 0 | Normal: 5 | Notes: Ring twice"
        );
    }

    #[test]
    fn test_prepare_rejects_bad_drafts() {
        let mut value = sample();
        value["items"] = json!([]);
        assert!(matches!(
            draft(value).prepare(UserId::new(1), placed_at(10)),
            Err(OrderError::NoItems)
        ));

        let mut value = sample();
        value["total_items"] = json!(0);
        assert!(matches!(
            draft(value).prepare(UserId::new(1), placed_at(10)),
            Err(OrderError::InvalidItemCount)
        ));

        let mut value = sample();
        value.as_object_mut().unwrap().remove("total_amount");
        let err = draft(value)
            .prepare(UserId::new(1), placed_at(10))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid total amount");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
