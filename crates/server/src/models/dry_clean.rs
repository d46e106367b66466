//! Dry-clean pickup and contact form types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use quick_laundry_core::{ContactId, ContactStatus, DryCleanOrderId, DryCleanStatus, Email, UserId};

/// A scheduled dry-clean pickup.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DryCleanOrder {
    pub id: DryCleanOrderId,
    /// Set when the customer was signed in.
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub service: String,
    /// Free text or the JSON text of whatever list the form sent.
    pub items: String,
    pub pickup_date: NaiveDate,
    pub pickup_time: String,
    pub special_instructions: String,
    pub status: DryCleanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated pickup request.
#[derive(Debug, Clone)]
pub struct NewDryCleanOrder {
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
    pub service: String,
    pub items: String,
    pub pickup_date: NaiveDate,
    pub pickup_time: String,
    pub special_instructions: String,
}

/// Pickup counts per status.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DryCleanStatistics {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub confirmed_orders: i64,
    pub processing_orders: i64,
    pub completed_orders: i64,
    pub cancelled_orders: i64,
}

/// A contact form submission.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

/// Validated contact form data.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}
