//! HTTP route handlers for the laundry API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - API index
//! GET  /health                        - Database health
//! GET  /health/live                   - Liveness check
//!
//! # Auth (/api, rate limited)
//! POST /api/send-otp                  - Email a registration code
//! POST /api/verify-otp                - Check a registration code
//! POST /api/register                  - Create an account
//! POST /api/login                     - Email or username + password
//! POST /api/refresh-token             - New access token from a refresh token
//! POST /api/logout                    - Close the current session
//! GET  /api/sessions                  - List live sessions
//! DELETE /api/sessions/{id}           - Revoke a session
//! POST /api/forgot-password           - Email a reset link
//! POST /api/reset-password            - Set a new password from a link
//! POST /api/verify-reset-token        - Check a reset link
//!
//! # Profile (/api/user, requires auth)
//! GET  /profile, /{id}                - Profile
//! PUT  /{id}                          - Update profile
//! POST /{id}/upload-avatar            - Upload avatar (multipart)
//! DELETE /{id}/delete-avatar          - Remove avatar
//! POST /change-password               - Change the caller's password
//!
//! # Pricing (/api/pricing)
//! GET  /categories, /items, /search, /grouped/*, /summary
//! POST /calculate                     - Quote a basket
//!
//! # Orders (/api/orders, requires auth)
//! POST /, GET /my-orders, GET /statistics, GET|DELETE /{id}
//! PUT  /{id}/status, POST /{id}/cancel
//!
//! # Dry clean (/api/dry-clean)
//! POST|GET /orders, GET|DELETE /orders/{id}, PUT /orders/{id}/status
//! GET  /statistics, POST /contact
//! ```

pub mod auth;
pub mod dry_clean;
pub mod orders;
pub mod pricing;
pub mod users;

use std::collections::BTreeMap;
use std::fmt::Display;

use axum::{
    Json, Router,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use quick_laundry_core::{Email, ValidationError};

use crate::error::{AppError, ErrorBody};
use crate::middleware::auth_rate_limiter;
use crate::middleware::rate_limit::RateLimitConfigError;
use crate::state::AppState;

/// A JSON body that may be missing or malformed.
///
/// Handlers answer a missing body with their own message ("No data
/// provided", "Request body is required") instead of axum's rejection.
pub struct MaybeJson<T>(pub Option<T>);

impl<T, S> FromRequest<S> for MaybeJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(Some(value))),
            Err(rejection) => {
                tracing::debug!(error = %rejection, "Unusable JSON body");
                Ok(Self(None))
            }
        }
    }
}

/// Trimmed value of a required text field.
///
/// # Errors
///
/// Returns `ValidationError::Required` when the field is missing or blank.
pub fn required<'a>(value: Option<&'a str>, label: &'static str) -> Result<&'a str, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Validation(ValidationError::Required(label)))
}

/// Parse a required email field.
///
/// # Errors
///
/// Returns "Email is required" or the address parse error.
pub fn required_email(value: Option<&str>) -> Result<Email, AppError> {
    Ok(Email::parse(required(value, "Email")?)?)
}

/// Per-field validation errors, reported together as "Validation failed".
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Record the error of a check, keeping the first error per field.
    pub fn check<E: Display>(&mut self, field: &str, result: Result<(), E>) {
        self.capture(field, result);
    }

    /// Record the error of a parse and hand back the value when it succeeded.
    pub fn capture<T, E: Display>(&mut self, field: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.0
                    .entry(field.to_string())
                    .or_insert_with(|| e.to_string());
                None
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// # Errors
    ///
    /// Returns `AppError::InvalidFields` when any check failed.
    pub fn finish(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidFields(self.0))
        }
    }
}

/// Shorthand for a `{"success": true, ...}` body with a status.
pub fn success(status: StatusCode, body: serde_json::Value) -> Response {
    let mut body = body;
    if let Some(map) = body.as_object_mut() {
        map.insert("success".to_string(), serde_json::Value::Bool(true));
    }
    (status, Json(body)).into_response()
}

/// Create the auth routes router.
fn auth_routes() -> Result<Router<AppState>, RateLimitConfigError> {
    use axum::routing::{delete, post};

    let limited = Router::new()
        .route("/send-otp", post(auth::send_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .layer(auth_rate_limiter()?);

    Ok(Router::new()
        .merge(limited)
        .route("/refresh-token", post(auth::refresh_token))
        .route("/logout", post(auth::logout))
        .route("/sessions", get(auth::list_sessions))
        .route("/sessions/{id}", delete(auth::revoke_session))
        .route("/verify-reset-token", post(auth::verify_reset_token))
        .route("/health-auth", get(auth::health)))
}

/// Create the user profile routes router.
fn user_routes() -> Router<AppState> {
    use axum::extract::DefaultBodyLimit;
    use axum::routing::{delete, post};

    Router::new()
        .route("/profile", get(users::own_profile))
        .route("/change-password", post(users::change_password))
        .route("/health", get(users::health))
        .route("/{id}", get(users::get_profile).put(users::update_profile))
        .route(
            "/{id}/upload-avatar",
            post(users::upload_avatar).layer(DefaultBodyLimit::max(users::AVATAR_BODY_LIMIT)),
        )
        .route("/{id}/delete-avatar", delete(users::delete_avatar))
}

/// Create the pricing routes router.
fn pricing_routes() -> Router<AppState> {
    use axum::routing::post;

    Router::new()
        .route("/categories", get(pricing::categories))
        .route("/categories/{id}", get(pricing::category))
        .route("/items", get(pricing::items))
        .route("/items/popular", get(pricing::popular))
        .route("/items/category/{id}", get(pricing::items_by_category))
        .route("/items/service/{service_type}", get(pricing::items_by_service))
        .route("/items/gender/{gender}", get(pricing::items_by_gender))
        .route("/items/{id}", get(pricing::item))
        .route("/search", get(pricing::search))
        .route("/grouped/category", get(pricing::grouped_by_category))
        .route("/grouped/service", get(pricing::grouped_by_service))
        .route("/summary", get(pricing::summary))
        .route("/calculate", post(pricing::calculate))
        .route("/health", get(pricing::health))
}

/// Create the order routes router.
fn order_routes() -> Router<AppState> {
    use axum::routing::{post, put};

    Router::new()
        .route("/", post(orders::create))
        .route("/my-orders", get(orders::my_orders))
        .route("/statistics", get(orders::statistics))
        .route("/health", get(orders::health))
        .route("/{id}", get(orders::show).delete(orders::delete))
        .route("/{id}/status", put(orders::update_status))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the dry-clean routes router.
fn dry_clean_routes() -> Router<AppState> {
    use axum::routing::{post, put};

    Router::new()
        .route(
            "/orders",
            post(dry_clean::create_order).get(dry_clean::list_orders),
        )
        .route(
            "/orders/{id}",
            get(dry_clean::get_order).delete(dry_clean::delete_order),
        )
        .route("/orders/{id}/status", put(dry_clean::update_status))
        .route("/statistics", get(dry_clean::statistics))
        .route("/contact", post(dry_clean::contact))
        .route("/health", get(dry_clean::health))
}

/// Create all routes for the API.
///
/// # Errors
///
/// Returns an error if the auth rate limiter cannot be built.
pub fn routes() -> Result<Router<AppState>, RateLimitConfigError> {
    Ok(Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/health/live", get(|| async { "ok" }))
        .nest("/api", auth_routes()?)
        .nest("/api/user", user_routes())
        .nest("/api/pricing", pricing_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/dry-clean", dry_clean_routes())
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed))
}

async fn not_found() -> impl IntoResponse {
    error_body(StatusCode::NOT_FOUND, "Endpoint not found")
}

async fn method_not_allowed() -> impl IntoResponse {
    error_body(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

fn error_body(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        success: false,
        message: message.to_string(),
        errors: None,
    };
    (status, Json(body)).into_response()
}

/// API index.
///
/// GET /
async fn index(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": format!("Welcome to {} API", state.config().app.name),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api",
            "user": "/api/user",
            "pricing": "/api/pricing",
            "orders": "/api/orders",
            "dry_clean": "/api/dry-clean",
            "health": "/health",
        },
    }))
}

/// Database health.
///
/// GET /health
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let connected = match crate::db::ping(state.pool()).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            false
        }
    };

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let config = state.config();
    (
        status,
        Json(json!({
            "status": if connected { "healthy" } else { "degraded" },
            "database": if connected { "connected" } else { "disconnected" },
            "app_name": config.app.name,
            "environment": config.app.environment,
        })),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use serde::Deserialize;
    use tower::ServiceExt;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: Option<String>,
    }

    async fn parse_body(body: &'static str) -> Option<Named> {
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let MaybeJson(value) = MaybeJson::<Named>::from_request(request, &()).await.unwrap();
        value
    }

    #[tokio::test]
    async fn test_maybe_json() {
        assert_eq!(
            parse_body(r#"{"name":"Ravi"}"#).await.unwrap().name.as_deref(),
            Some("Ravi")
        );
        assert!(parse_body("").await.is_none());
        assert!(parse_body("{not json").await.is_none());
    }

    #[test]
    fn test_required() {
        assert_eq!(required(Some("  Ravi "), "Name").unwrap(), "Ravi");
        let err = required(Some("   "), "Name").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Name is required");
        assert!(required(None, "Name").is_err());
    }

    #[test]
    fn test_required_email() {
        assert_eq!(
            required_email(Some(" Ravi@Example.com ")).unwrap().as_str(),
            "ravi@example.com"
        );
        assert!(matches!(
            required_email(None),
            Err(AppError::Validation(ValidationError::Required("Email")))
        ));
        assert!(matches!(
            required_email(Some("ravi")),
            Err(AppError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_fallbacks_are_json() {
        let app: Router = Router::new()
            .route("/only-get", get(|| async { "ok" }))
            .fallback(not_found)
            .method_not_allowed_fallback(method_not_allowed);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Endpoint not found");

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/only-get")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_field_errors_keep_first_error() {
        let mut errors = FieldErrors::default();
        errors.check("city", Err::<(), _>("City is required"));
        errors.check("city", Err::<(), _>("City name is too long"));
        errors.check("pincode", Ok::<(), &str>(()));
        assert_eq!(errors.capture("phone", Ok::<_, &str>(5)), Some(5));

        match errors.finish() {
            Err(AppError::InvalidFields(map)) => {
                assert_eq!(map.len(), 1);
                assert_eq!(map["city"], "City is required");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(FieldErrors::default().finish().is_ok());
    }

    async fn user_route_status(method: &str, uri: &str) -> StatusCode {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/quick_laundry_test")
            .unwrap();
        let state = AppState::new(crate::config::test_config(), pool).unwrap();
        let app: Router = Router::new()
            .nest("/api/user", user_routes())
            .fallback(not_found)
            .with_state(state);

        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_profile_paths_match_frontend() {
        // Matched routes reach the auth extractor and reject the missing token.
        for (method, uri) in [
            ("GET", "/api/user/7"),
            ("PUT", "/api/user/7"),
            ("POST", "/api/user/7/upload-avatar"),
            ("DELETE", "/api/user/7/delete-avatar"),
            ("POST", "/api/user/change-password"),
            ("GET", "/api/user/profile"),
        ] {
            assert_eq!(
                user_route_status(method, uri).await,
                StatusCode::UNAUTHORIZED,
                "{method} {uri}"
            );
        }

        assert_eq!(
            user_route_status("GET", "/api/user/profile/7").await,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            user_route_status("POST", "/api/user/7/change-password").await,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_success_adds_flag() {
        let response = success(StatusCode::CREATED, json!({"message": "done"}));
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
