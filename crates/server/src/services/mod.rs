//! Business logic services for the laundry API.
//!
//! # Services
//!
//! - `auth` - Password accounts, login lockouts, sessions
//! - `jwt` - Access, refresh and reset token signing
//! - `otp` - Email verification codes for registration
//! - `password_reset` - Reset links
//! - `email` - Transactional email over SMTP
//! - `pricing` - Cached price list, grouping and quotes
//! - `orders` - Placing and cancelling iron/wash orders
//! - `uploads` - Avatar files

pub mod auth;
pub mod email;
pub mod jwt;
pub mod orders;
pub mod otp;
pub mod password_reset;
pub mod pricing;
pub mod uploads;
