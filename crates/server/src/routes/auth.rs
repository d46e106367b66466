//! Authentication route handlers.
//!
//! OTP-verified registration, login, token refresh, sessions and password
//! reset. All handlers answer JSON.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use quick_laundry_core::validation::{
    parse_communication_preference, parse_service_tier, validate_address, validate_city,
    validate_full_name, validate_otp, validate_password, validate_phone, validate_pincode,
    validate_username,
};
use quick_laundry_core::{Email, SessionId};

use super::users::to_profile;
use super::{FieldErrors, MaybeJson, required, required_email, success};
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user};
use crate::middleware::{Client, RequireAuth};
use crate::models::NewUser;
use crate::services::auth::{AuthError, AuthService};
use crate::services::otp::OtpService;
use crate::services::password_reset::{PasswordResetService, ResetError};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub otp: Option<String>,
}

/// Registration form. Every field is optional here so that missing fields
/// are reported together.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub service_type: Option<String>,
    pub communication_preference: Option<String>,
    #[serde(default)]
    pub subscribe_newsletter: bool,
    #[serde(default)]
    pub otp_verified: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email or username.
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: Option<String>,
}

impl RegisterRequest {
    /// Validate every field, collecting one message per bad field.
    ///
    /// Returns the account to create and the password.
    fn validate(self) -> Result<(NewUser, String)> {
        let mut errors = FieldErrors::default();
        let text = |v: Option<String>| v.unwrap_or_default().trim().to_owned();

        let email = errors.capture("email", Email::parse(self.email.as_deref().unwrap_or("")));
        let username = text(self.username);
        errors.check("username", validate_username(&username));
        let password = self.password.unwrap_or_default();
        errors.check("password", validate_password(&password));
        let phone = text(self.phone);
        errors.check("phone", validate_phone(&phone));
        let full_name = text(self.full_name);
        errors.check("full_name", validate_full_name(&full_name));
        let address = text(self.address);
        errors.check("address", validate_address(&address));
        let city = text(self.city);
        errors.check("city", validate_city(&city));
        let pincode = text(self.pincode);
        errors.check("pincode", validate_pincode(&pincode));

        let service_type = match self.service_type.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                errors.capture("service_type", parse_service_tier(raw))
            }
            _ => Some(Default::default()),
        };
        let communication_preference = match self.communication_preference.as_deref() {
            Some(raw) if !raw.trim().is_empty() => errors.capture(
                "communication_preference",
                parse_communication_preference(raw),
            ),
            _ => Some(Default::default()),
        };

        let (Some(email), Some(service_type), Some(communication_preference), true) =
            (email, service_type, communication_preference, errors.is_empty())
        else {
            errors.finish()?;
            return Err(AppError::BadRequest("Validation failed".to_string()));
        };

        let new_user = NewUser {
            email,
            username,
            phone,
            full_name: Some(full_name).filter(|name| !name.is_empty()),
            address,
            city,
            pincode,
            service_type,
            communication_preference,
            subscribe_newsletter: self.subscribe_newsletter,
        };
        Ok((new_user, password))
    }
}

// =============================================================================
// OTP
// =============================================================================

/// Email a registration code.
///
/// POST /api/send-otp
pub async fn send_otp(
    State(state): State<AppState>,
    MaybeJson(body): MaybeJson<EmailRequest>,
) -> Result<Response> {
    let email = required_email(body.and_then(|b| b.email).as_deref())?;

    let otp = OtpService::new(state.pool(), &state.config().security);
    let record = otp.request(&email).await?;

    match state.email() {
        Some(mailer) => mailer
            .send_otp(email.as_str(), &record.otp_code, otp.expiry_minutes())
            .await
            .map_err(|source| AppError::EmailDelivery {
                message: "Failed to send OTP email. Please try again later.",
                source,
            })?,
        None => tracing::warn!(
            email = %email.masked(),
            code = %record.otp_code,
            "SMTP disabled, OTP not emailed"
        ),
    }

    Ok(success(
        StatusCode::OK,
        json!({
            "message": "OTP sent successfully. Please check your email",
            "expires_in_minutes": otp.expiry_minutes(),
        }),
    ))
}

/// Check a registration code.
///
/// POST /api/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    MaybeJson(body): MaybeJson<VerifyOtpRequest>,
) -> Result<Response> {
    let (email, code) = body
        .and_then(|b| Some((b.email?, b.otp?)))
        .filter(|(email, code)| !email.trim().is_empty() && !code.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Email and OTP are required".to_string()))?;

    let code = code.trim();
    validate_otp(code)?;
    let email = Email::parse(&email)?;

    OtpService::new(state.pool(), &state.config().security)
        .verify(&email, code)
        .await?;

    Ok(otp_verified(&email))
}

fn otp_verified(email: &Email) -> Response {
    success(
        StatusCode::OK,
        json!({
            "message": "OTP verified successfully",
            "email": email,
        }),
    )
}

// =============================================================================
// Registration and Login
// =============================================================================

/// Create an account from a verified email.
///
/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    Client(client): Client,
    MaybeJson(body): MaybeJson<RegisterRequest>,
) -> Result<Response> {
    let body = body.ok_or_else(|| AppError::BadRequest("No data provided".to_string()))?;
    if !body.otp_verified {
        return Err(AuthError::EmailNotVerified.into());
    }

    let (new_user, password) = body.validate()?;

    let otp = OtpService::new(state.pool(), &state.config().security);
    if !otp.is_verified(&new_user.email).await? {
        return Err(AuthError::EmailNotVerified.into());
    }

    let auth = AuthService::new(state.pool(), state.jwt(), &state.config().security);
    let user = auth.register(&new_user, &password).await?;
    otp.consume(&user.email).await?;
    let tokens = auth.open_session(&user, &client).await?;

    add_breadcrumb("auth", "User registered", None);
    if let Some(mailer) = state.email().cloned() {
        let to = user.email.as_str().to_owned();
        let name = user.display_name().to_owned();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_welcome(&to, &name).await {
                tracing::warn!(error = %e, "Failed to send welcome email");
            }
        });
    }

    Ok(success(
        StatusCode::CREATED,
        json!({
            "message": "Registration successful",
            "user": to_profile(&state, user),
            "access_token": tokens.access_token,
            "refresh_token": tokens.refresh_token,
        }),
    ))
}

/// Log in with an email or username.
///
/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Client(client): Client,
    MaybeJson(body): MaybeJson<LoginRequest>,
) -> Result<Response> {
    let (identifier, password) = body
        .and_then(|b| Some((b.email?, b.password?)))
        .filter(|(identifier, password)| !identifier.trim().is_empty() && !password.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email and password are required".to_string()))?;

    let auth = AuthService::new(state.pool(), state.jwt(), &state.config().security);
    let (user, tokens) = auth.login(&identifier, &password, &client).await?;

    Ok(success(
        StatusCode::OK,
        json!({
            "message": "Login successful",
            "user": to_profile(&state, user),
            "access_token": tokens.access_token,
            "refresh_token": tokens.refresh_token,
            "token_type": tokens.token_type,
            "expires_in": tokens.expires_in,
        }),
    ))
}

/// Exchange a refresh token for a new access token.
///
/// POST /api/refresh-token
pub async fn refresh_token(
    State(state): State<AppState>,
    Client(client): Client,
    MaybeJson(body): MaybeJson<RefreshRequest>,
) -> Result<Response> {
    let token = body
        .and_then(|b| b.refresh_token)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Unauthorized("Refresh token is required".to_string()))?;

    let refreshed = AuthService::new(state.pool(), state.jwt(), &state.config().security)
        .refresh(token.trim(), &client)
        .await?;

    Ok(success(StatusCode::OK, json!(refreshed)))
}

// =============================================================================
// Sessions
// =============================================================================

/// Close the session behind the current token.
///
/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    AuthService::new(state.pool(), state.jwt(), &state.config().security)
        .logout(&user.token)
        .await?;
    clear_sentry_user();

    Ok(success(
        StatusCode::OK,
        json!({"message": "Logged out successfully"}),
    ))
}

/// List the caller's live sessions.
///
/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let sessions = AuthService::new(state.pool(), state.jwt(), &state.config().security)
        .sessions(user.id)
        .await?;

    Ok(success(
        StatusCode::OK,
        json!({"count": sessions.len(), "sessions": sessions}),
    ))
}

/// Revoke one of the caller's sessions.
///
/// DELETE /api/sessions/{id}
pub async fn revoke_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<SessionId>,
) -> Result<Response> {
    AuthService::new(state.pool(), state.jwt(), &state.config().security)
        .revoke_session(user.id, id)
        .await?;

    Ok(success(StatusCode::OK, json!({"message": "Session revoked"})))
}

// =============================================================================
// Password Reset
// =============================================================================

/// Email a password reset link.
///
/// POST /api/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    MaybeJson(body): MaybeJson<EmailRequest>,
) -> Result<Response> {
    let email = required_email(body.and_then(|b| b.email).as_deref())?;

    let config = state.config();
    let resets =
        PasswordResetService::new(state.pool(), state.jwt(), &config.app, &config.security);

    if let Some(link) = resets.request(&email).await? {
        match state.email() {
            Some(mailer) => mailer
                .send_password_reset(
                    link.user.email.as_str(),
                    link.user.display_name(),
                    &link.url,
                    resets.expiry_hours(),
                )
                .await
                .map_err(|source| AppError::EmailDelivery {
                    message: "Failed to send reset email. Please try again later.",
                    source,
                })?,
            None => tracing::warn!(
                email = %email.masked(),
                url = %link.url,
                "SMTP disabled, reset link not emailed"
            ),
        }
        tracing::info!(user_id = %link.user.id, "Password reset link issued");
    }

    Ok(success(
        StatusCode::OK,
        json!({
            "message": "If an account exists with this email, a password reset link has been sent",
        }),
    ))
}

/// Set a new password from a reset link.
///
/// POST /api/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    MaybeJson(body): MaybeJson<ResetPasswordRequest>,
) -> Result<Response> {
    let (token, new_password) = body.map_or((None, None), |b| (b.token, b.new_password));
    let token = token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Reset token is required".to_string()))?;
    let new_password = new_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("New password is required".to_string()))?;
    validate_password(&new_password)?;

    let config = state.config();
    PasswordResetService::new(state.pool(), state.jwt(), &config.app, &config.security)
        .reset(token.trim(), &new_password)
        .await?;

    Ok(success(
        StatusCode::OK,
        json!({"message": "Password reset successful. Please login with your new password"}),
    ))
}

/// Check a reset link before showing the new password form.
///
/// POST /api/verify-reset-token
pub async fn verify_reset_token(
    State(state): State<AppState>,
    MaybeJson(body): MaybeJson<TokenRequest>,
) -> Result<Response> {
    let token = required(body.as_ref().and_then(|b| b.token.as_deref()), "Token")?;

    let config = state.config();
    let email = PasswordResetService::new(state.pool(), state.jwt(), &config.app, &config.security)
        .verify(token)
        .await?;
    let email = Email::parse(&email).map_err(|_| ResetError::LinkInvalid)?;

    Ok(success(
        StatusCode::OK,
        json!({"message": "Token is valid", "email": email.masked()}),
    ))
}

/// GET /api/health-auth
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "auth"}))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quick_laundry_core::{CommunicationPreference, ServiceTier};

    use super::*;

    fn valid() -> RegisterRequest {
        RegisterRequest {
            email: Some("Anita@Example.com".to_string()),
            username: Some("anita_d".to_string()),
            password: Some("s3cret!pass".to_string()),
            phone: Some("9876543210".to_string()),
            full_name: Some("Anita Desai".to_string()),
            address: Some("12 MG Road".to_string()),
            city: Some("Pune".to_string()),
            pincode: Some("411001".to_string()),
            service_type: None,
            communication_preference: Some("email".to_string()),
            subscribe_newsletter: true,
            otp_verified: true,
        }
    }

    #[tokio::test]
    async fn test_otp_verified_body() {
        let email = Email::parse("anita@example.com").unwrap();
        let response = otp_verified(&email);
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "OTP verified successfully");
        assert_eq!(body["email"], "anita@example.com");
    }

    #[test]
    fn test_register_validation_passes() {
        let (user, password) = valid().validate().unwrap();
        assert_eq!(user.email.as_str(), "anita@example.com");
        assert_eq!(user.service_type, ServiceTier::Standard);
        assert_eq!(user.communication_preference, CommunicationPreference::Email);
        assert_eq!(password, "s3cret!pass");
    }

    #[test]
    fn test_register_validation_collects_fields() {
        let request = RegisterRequest {
            email: Some("not-an-email".to_string()),
            pincode: Some("12".to_string()),
            service_type: Some("overnight".to_string()),
            ..valid()
        };

        match request.validate() {
            Err(AppError::InvalidFields(errors)) => {
                assert_eq!(errors.len(), 3);
                assert_eq!(errors["pincode"], "Pincode must be 5 or 6 digits");
                assert_eq!(
                    errors["service_type"],
                    "Service type must be one of: express, standard, economy"
                );
                assert!(errors.contains_key("email"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_register_blank_full_name_is_none() {
        let request = RegisterRequest {
            full_name: Some("   ".to_string()),
            ..valid()
        };
        let (user, _) = request.validate().unwrap();
        assert!(user.full_name.is_none());
    }
}
