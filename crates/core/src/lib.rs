//! Quick Laundry Core - Shared domain types.
//!
//! This crate provides the types used across all Quick Laundry components:
//! - `server` - JSON API for customers, orders, pricing and dry cleaning
//! - `cli` - Command-line tools for migrations, seeding and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database support is opt-in via the `postgres`
//! feature, which adds `sqlx` encode/decode implementations.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, statuses, money and delivery rules
//! - [`validation`] - Field validators for registration and profile forms

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::ValidationError;
