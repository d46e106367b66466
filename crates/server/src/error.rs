//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; every error reaches the client as
//! `{"success": false, "message": "..."}`.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use quick_laundry_core::{EmailError as AddressError, ValidationError};

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::email::EmailError;
use crate::services::jwt::TokenError;
use crate::services::orders::OrderError;
use crate::services::otp::OtpError;
use crate::services::password_reset::ResetError;
use crate::services::pricing::PricingError;
use crate::services::uploads::UploadError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// OTP request or verification failed.
    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    /// Password reset request or completion failed.
    #[error("Password reset error: {0}")]
    PasswordReset(#[from] ResetError),

    /// Bearer or refresh token rejected.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Outbound email failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Outbound email the request depends on failed; `message` is shown to
    /// the client.
    #[error("Email error: {source}")]
    EmailDelivery {
        message: &'static str,
        #[source]
        source: EmailError,
    },

    /// Avatar upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Order placement or cancellation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Price quote failed.
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// An email address failed to parse.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] AddressError),

    /// A single field failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Several fields failed validation; keyed by field name.
    #[error("Validation failed")]
    InvalidFields(BTreeMap<String, String>),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but may not touch this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_)
            | Self::Internal(_)
            | Self::Email(_)
            | Self::EmailDelivery { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => err.status(),
            Self::Otp(err) => err.status(),
            Self::PasswordReset(err) => err.status(),
            Self::Token(err) => err.status(),
            Self::Upload(err) => err.status(),
            Self::Order(err) => err.status(),
            Self::Pricing(err) => err.status(),
            Self::Validation(_)
            | Self::InvalidEmail(_)
            | Self::InvalidFields(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to show the client. Server errors never leak details.
    fn client_message(&self) -> String {
        if self.status().is_server_error() {
            return match self {
                Self::Email(_) => "Failed to send email. Please try again later.".to_string(),
                Self::EmailDelivery { message, .. } => (*message).to_string(),
                _ => "Internal server error".to_string(),
            };
        }

        match self {
            Self::Auth(err) => err.to_string(),
            Self::Otp(err) => err.to_string(),
            Self::PasswordReset(err) => err.to_string(),
            Self::Token(err) => err.to_string(),
            Self::Upload(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Pricing(err) => err.to_string(),
            Self::Validation(err) => err.to_string(),
            Self::InvalidEmail(err) => err.to_string(),
            Self::InvalidFields(_) => "Validation failed".to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::RateLimited(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Database(err) => err.to_string(),
            Self::Email(err) | Self::EmailDelivery { source: err, .. } => err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let message = self.client_message();
        let errors = match self {
            Self::InvalidFields(errors) => Some(errors),
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("orders", "Order placed", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Order not found".to_string());
        assert_eq!(err.to_string(), "Not found: Order not found");

        let err = AppError::BadRequest("Status is required".to_string());
        assert_eq!(err.to_string(), "Bad request: Status is required");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited("test".to_string())),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::AccountLocked { minutes: 15 })),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Token(TokenError::Expired)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_body_carries_exact_message() {
        let (status, body) = body_json(AppError::BadRequest("Status is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Status is required");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (_, body) = body_json(AppError::Internal("pool exhausted".into())).await;
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_invalid_fields_include_errors_map() {
        let mut errors = BTreeMap::new();
        errors.insert("pincode".to_string(), "Pincode must be 5 or 6 digits".to_string());
        let (status, body) = body_json(AppError::InvalidFields(errors)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"]["pincode"], "Pincode must be 5 or 6 digits");
    }

    #[tokio::test]
    async fn test_auth_messages_pass_through() {
        let (status, body) = body_json(AppError::Auth(AuthError::AccountLocked { minutes: 15 })).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["message"], "Account locked. Try again in 15 minutes");
    }
}
