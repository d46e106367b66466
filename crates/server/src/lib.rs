//! Quick Laundry API library.
//!
//! The HTTP server, repositories and services live here so the binary,
//! the CLI and the tests can share them.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, http::Request};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::middleware::rate_limit::RateLimitConfigError;
use crate::state::AppState;

/// Migrations for the `laundry` schema, embedded at build time.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Build the full application router with middleware and uploaded files.
///
/// Trailing slashes are trimmed before routing, so the router is returned
/// wrapped for use with `axum::serve`.
///
/// # Errors
///
/// Returns an error if the auth rate limiter cannot be built.
pub fn app(state: AppState) -> Result<Router, RateLimitConfigError> {
    let uploads = ServeDir::new(state.avatars().root());

    let router = routes::routes()?
        .nest_service("/uploads", uploads.clone())
        .nest_service("/api/uploads", uploads)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    Ok(Router::new().fallback_service(
        tower::ServiceBuilder::new()
            .layer(NormalizePathLayer::trim_trailing_slash())
            .service(router),
    ))
}
