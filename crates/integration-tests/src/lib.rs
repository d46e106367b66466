//! Integration tests for the Quick Laundry API.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database, migrate and seed
//! cargo run -p quick-laundry-cli -- migrate
//! cargo run -p quick-laundry-cli -- seed pricing
//!
//! # Start the server (without SMTP, codes are logged)
//! cargo run -p quick-laundry-server
//!
//! # Run integration tests
//! cargo test -p quick-laundry-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `app` - Index, health and fallbacks
//! - `auth` - Registration, login and token rejection paths
//! - `pricing` - Price list reads and quotes
//! - `dry_clean` - Pickup lifecycle and contact form
//! - `accounts` - Login lockout and session lifecycle (database only)
//!
//! `LAUNDRY_BASE_URL` points the tests at a server other than
//! `http://localhost:3000`. Database tests read `LAUNDRY_DATABASE_URL`,
//! falling back to `DATABASE_URL`.

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use sqlx::PgPool;

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("LAUNDRY_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Absolute URL for an API path.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url())
}

/// A plain HTTP client.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .build()
        .expect("Failed to create HTTP client")
}

/// Assert the status and decode the JSON body.
///
/// # Panics
///
/// Panics if the status differs or the body is not JSON.
pub async fn expect_json(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let body: Value = response.json().await.expect("Response body is not JSON");
    assert_eq!(actual, status, "unexpected status, body: {body}");
    body
}

/// Assert an error response carrying the given message.
///
/// # Panics
///
/// Panics if the status, `success` flag or message differ.
pub async fn expect_error(response: Response, status: StatusCode, message: &str) {
    let body = expect_json(response, status).await;
    assert_eq!(body["success"], false, "body: {body}");
    assert_eq!(body["message"], message, "body: {body}");
}

/// An email address no earlier run has used.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", uuid::Uuid::new_v4().simple())
}

/// Connect to the test database and apply pending migrations.
///
/// # Panics
///
/// Panics if no database URL is set, the connection fails or a migration
/// fails.
pub async fn database_pool() -> PgPool {
    let database_url = std::env::var("LAUNDRY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("LAUNDRY_DATABASE_URL or DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    quick_laundry_server::MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
