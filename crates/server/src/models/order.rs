//! Iron and wash order types.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use quick_laundry_core::{OrderId, OrderItemId, OrderStatus, OrderTotals, PaymentStatus, UserId};

/// An order header row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Shop wall-clock time.
    pub delivery_date: NaiveDateTime,
    pub pickup_date: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line on an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    /// Position on the order, starting at 1.
    pub item_id: i32,
    pub item_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub service_type: String,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

/// An order with its lines, as listed under "my orders".
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Contact details of the customer who placed an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderCustomer {
    pub full_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A single order with lines and customer details.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    #[serde(flatten)]
    pub customer: OrderCustomer,
    pub items: Vec<OrderItem>,
}

/// Order counts per status and lifetime spend for one customer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderStatistics {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub confirmed_orders: i64,
    pub processing_orders: i64,
    pub ready_orders: i64,
    pub delivered_orders: i64,
    pub cancelled_orders: i64,
    pub total_spent: Decimal,
}

/// A priced order ready to insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub totals: OrderTotals,
    pub delivery_date: NaiveDateTime,
    pub notes: String,
    /// Service line applied to every item (`iron`, `wash_iron`, ...).
    pub service_type: String,
    pub items: Vec<NewOrderItem>,
}

/// A line of a [`NewOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}
