//! User profile route handlers.
//!
//! Every route requires authentication, and a path id must name the caller.
//! Password changes act on the token's user and take no path id.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use quick_laundry_core::UserId;
use quick_laundry_core::validation::{
    PASSWORD_MIN, parse_communication_preference, parse_service_tier, validate_address,
    validate_city, validate_full_name, validate_phone, validate_pincode,
};

use super::{FieldErrors, MaybeJson, success};
use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, ProfileChanges, User, UserProfile};
use crate::services::auth::{AuthError, AuthService};
use crate::services::uploads::{DEFAULT_AVATAR, MAX_AVATAR_BYTES, UploadError, validate_avatar};
use crate::state::AppState;

/// Request body limit on the avatar route; leaves room for multipart framing
/// above the 5 MiB file limit.
pub const AVATAR_BODY_LIMIT: usize = MAX_AVATAR_BYTES + 1024 * 1024;

const AVATAR_FIELD: &str = "profile_picture";

/// Attach the public avatar URL.
pub fn to_profile(state: &AppState, user: User) -> UserProfile {
    let profile_picture_url = user
        .profile_picture
        .as_deref()
        .map(|stored| state.avatar_url(stored));
    UserProfile {
        user,
        profile_picture_url,
    }
}

fn ensure_owner(caller: &CurrentUser, id: UserId) -> Result<()> {
    if caller.id == id {
        Ok(())
    } else {
        tracing::warn!(caller = %caller.id, target = %id, "Profile access denied");
        Err(AppError::Forbidden("Unauthorized access".to_string()))
    }
}

async fn load_user(state: &AppState, id: UserId) -> Result<User> {
    UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Send the "profile updated" email in the background.
fn notify_profile_updated(state: &AppState, user: &User, fields: Vec<&'static str>) {
    let Some(mailer) = state.email().cloned() else {
        return;
    };
    let to = user.email.as_str().to_owned();
    let name = user.display_name().to_owned();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_profile_updated(&to, &name, &fields).await {
            tracing::warn!(error = %e, "Failed to send profile updated email");
        }
    });
}

// =============================================================================
// Profile
// =============================================================================

/// The caller's profile.
///
/// GET /api/user/profile
pub async fn own_profile(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Response> {
    let user = load_user(&state, caller.id).await?;
    Ok(success(
        StatusCode::OK,
        json!({"user": to_profile(&state, user)}),
    ))
}

/// GET /api/user/{id}
pub async fn get_profile(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<UserId>,
) -> Result<Response> {
    ensure_owner(&caller, id)?;
    own_profile(State(state), RequireAuth(caller)).await
}

/// Profile fields a customer may change. Absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdateRequest {
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub service_type: Option<String>,
    pub communication_preference: Option<String>,
    pub subscribe_newsletter: Option<bool>,
}

impl ProfileUpdateRequest {
    fn validate(self) -> Result<ProfileChanges> {
        let mut errors = FieldErrors::default();

        let phone = self.phone.map(|v| v.trim().to_owned());
        if let Some(phone) = &phone {
            errors.check("phone", validate_phone(phone));
        }
        let full_name = self.full_name.map(|v| v.trim().to_owned());
        if let Some(name) = &full_name {
            errors.check("full_name", validate_full_name(name));
        }
        let address = self.address.map(|v| v.trim().to_owned());
        if let Some(address) = &address {
            errors.check("address", validate_address(address));
        }
        let city = self.city.map(|v| v.trim().to_owned());
        if let Some(city) = &city {
            errors.check("city", validate_city(city));
        }
        let pincode = self.pincode.map(|v| v.trim().to_owned());
        if let Some(pincode) = &pincode {
            errors.check("pincode", validate_pincode(pincode));
        }
        let service_type = self
            .service_type
            .and_then(|raw| errors.capture("service_type", parse_service_tier(&raw)));
        let communication_preference = self.communication_preference.and_then(|raw| {
            errors.capture(
                "communication_preference",
                parse_communication_preference(&raw),
            )
        });

        errors.finish()?;

        Ok(ProfileChanges {
            phone,
            full_name: full_name.map(|name| Some(name).filter(|n| !n.is_empty())),
            address,
            city,
            pincode,
            service_type,
            communication_preference,
            subscribe_newsletter: self.subscribe_newsletter,
        })
    }
}

/// Update profile fields and report which ones changed.
///
/// PUT /api/user/{id}
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<UserId>,
    MaybeJson(body): MaybeJson<ProfileUpdateRequest>,
) -> Result<Response> {
    ensure_owner(&caller, id)?;
    let body = body.ok_or_else(|| AppError::BadRequest("No data provided".to_string()))?;

    let changes = body.validate()?;
    if changes.is_empty() {
        return Err(AppError::BadRequest("No valid fields to update".to_string()));
    }

    let current = load_user(&state, id).await?;
    let (changes, updated_fields) = changes.retain_changed(&current);

    let user = if changes.is_empty() {
        current
    } else {
        let user = UserRepository::new(state.pool())
            .update_profile(id, &changes)
            .await
            .map_err(AuthError::from_user_conflict)?;
        tracing::info!(fields = ?updated_fields, "Profile updated");
        notify_profile_updated(&state, &user, updated_fields.clone());
        user
    };

    Ok(success(
        StatusCode::OK,
        json!({
            "message": "Profile updated successfully",
            "user": to_profile(&state, user),
            "updated_fields": updated_fields,
        }),
    ))
}

// =============================================================================
// Avatar
// =============================================================================

/// Pull the avatar file out of the multipart body.
async fn read_avatar(multipart: &mut Multipart) -> std::result::Result<(String, Vec<u8>), UploadError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_owned();
        if filename.trim().is_empty() {
            return Err(UploadError::NoFileSelected);
        }
        let bytes = field.bytes().await?;
        return Ok((filename, bytes.to_vec()));
    }
    Err(UploadError::NoFile)
}

/// Replace the caller's avatar.
///
/// POST /api/user/{id}/upload-avatar
pub async fn upload_avatar(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<UserId>,
    mut multipart: Multipart,
) -> Result<Response> {
    ensure_owner(&caller, id)?;

    let (filename, bytes) = read_avatar(&mut multipart).await?;
    let ext = validate_avatar(&filename, &bytes)?;

    let previous = load_user(&state, id).await?.profile_picture;
    let stored = state.avatars().save(ext, &bytes).await?;
    let user = UserRepository::new(state.pool())
        .set_profile_picture(id, Some(&stored))
        .await?;

    if let Some(previous) = previous
        && let Err(e) = state.avatars().remove(&previous).await
    {
        tracing::warn!(error = %e, path = %previous, "Failed to delete previous avatar");
    }

    tracing::info!(path = %stored, size = bytes.len(), "Avatar uploaded");
    notify_profile_updated(&state, &user, vec![AVATAR_FIELD]);

    Ok(success(
        StatusCode::OK,
        json!({
            "message": "Profile picture uploaded successfully",
            "profile_picture_url": state.avatar_url(&stored),
            "profile_picture": stored,
        }),
    ))
}

/// Remove the caller's avatar.
///
/// DELETE /api/user/{id}/delete-avatar
pub async fn delete_avatar(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<UserId>,
) -> Result<Response> {
    ensure_owner(&caller, id)?;

    let previous = load_user(&state, id).await?.profile_picture;
    UserRepository::new(state.pool())
        .set_profile_picture(id, None)
        .await?;
    if let Some(previous) = previous {
        state.avatars().remove(&previous).await?;
    }

    Ok(success(
        StatusCode::OK,
        json!({
            "message": "Profile picture deleted successfully",
            "default_avatar": DEFAULT_AVATAR,
        }),
    ))
}

// =============================================================================
// Password
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// POST /api/user/change-password
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    MaybeJson(body): MaybeJson<ChangePasswordRequest>,
) -> Result<Response> {
    let (current, new) = body
        .and_then(|b| Some((b.current_password?, b.new_password?)))
        .filter(|(current, new)| !current.is_empty() && !new.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest("Current password and new password are required".to_string())
        })?;
    if new.chars().count() < PASSWORD_MIN {
        return Err(AppError::BadRequest(
            "New password must be at least 8 characters".to_string(),
        ));
    }

    AuthService::new(state.pool(), state.jwt(), &state.config().security)
        .change_password(caller.id, &current, &new)
        .await?;

    Ok(success(
        StatusCode::OK,
        json!({"message": "Password changed successfully"}),
    ))
}

/// GET /api/user/health
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "user"}))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quick_laundry_core::ServiceTier;

    use super::*;

    fn caller(id: i32) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: "anita@example.com".to_string(),
            username: "anita_d".to_string(),
            token: "t".to_string(),
        }
    }

    #[test]
    fn test_ensure_owner() {
        assert!(ensure_owner(&caller(7), UserId::new(7)).is_ok());
        let err = ensure_owner(&caller(7), UserId::new(8)).unwrap_err();
        assert!(matches!(&err, AppError::Forbidden(msg) if msg == "Unauthorized access"));
    }

    #[test]
    fn test_profile_update_validation() {
        let request = ProfileUpdateRequest {
            city: Some(" Mumbai ".to_string()),
            full_name: Some(String::new()),
            service_type: Some("express".to_string()),
            ..ProfileUpdateRequest::default()
        };
        let changes = request.validate().unwrap();
        assert_eq!(changes.city.as_deref(), Some("Mumbai"));
        assert_eq!(changes.full_name, Some(None));
        assert_eq!(changes.service_type, Some(ServiceTier::Express));
        assert!(changes.phone.is_none());
    }

    #[test]
    fn test_profile_update_rejects_bad_fields() {
        let request = ProfileUpdateRequest {
            phone: Some("123".to_string()),
            communication_preference: Some("fax".to_string()),
            ..ProfileUpdateRequest::default()
        };
        match request.validate() {
            Err(AppError::InvalidFields(errors)) => {
                assert_eq!(errors["phone"], "Phone number must be between 10 and 15 digits");
                assert_eq!(
                    errors["communication_preference"],
                    "Communication preference must be one of: sms, email, both"
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_update_has_no_changes() {
        let changes = ProfileUpdateRequest::default().validate().unwrap();
        assert!(changes.is_empty());
    }
}
