//! Core types for Quick Laundry.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod delivery;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use delivery::delivery_date;
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{GST_RATE, OrderTotals, line_total};
pub use status::*;
