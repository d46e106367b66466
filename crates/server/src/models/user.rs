//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use quick_laundry_core::{CommunicationPreference, Email, ServiceTier, UserId};

/// A customer account (domain type). Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub username: String,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    /// Preferred turnaround (`express`, `standard`, `economy`).
    pub service_type: ServiceTier,
    pub communication_preference: CommunicationPreference,
    pub subscribe_newsletter: bool,
    /// Relative path under the upload folder, or an external URL for OAuth avatars.
    pub profile_picture: Option<String>,
    pub oauth_provider: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name to greet the customer with in emails.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// A user as returned by the profile endpoints, with the avatar resolved to
/// a public URL.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
}

/// Account data needed to check a password.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    /// `None` for accounts created through Google Sign-In.
    pub password_hash: Option<String>,
}

/// Validated registration data.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub username: String,
    pub phone: String,
    pub full_name: Option<String>,
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub service_type: ServiceTier,
    pub communication_preference: CommunicationPreference,
    pub subscribe_newsletter: bool,
}

/// Fields a customer may change on their own profile. `None` leaves the
/// column untouched; `full_name: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub phone: Option<String>,
    pub full_name: Option<Option<String>>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub service_type: Option<ServiceTier>,
    pub communication_preference: Option<CommunicationPreference>,
    pub subscribe_newsletter: Option<bool>,
}

impl ProfileChanges {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Drop fields that already hold the requested value.
    ///
    /// Returns the remaining changes and the names of the fields they touch,
    /// in a stable order suitable for the "profile updated" email.
    #[must_use]
    pub fn retain_changed(self, current: &User) -> (Self, Vec<&'static str>) {
        fn keep<T: PartialEq>(
            new: Option<T>,
            old: &T,
            name: &'static str,
            changed: &mut Vec<&'static str>,
        ) -> Option<T> {
            let value = new.filter(|v| v != old)?;
            changed.push(name);
            Some(value)
        }

        let mut changed = Vec::new();
        let retained = Self {
            phone: keep(self.phone.map(Some), &current.phone, "phone", &mut changed)
                .flatten(),
            full_name: keep(self.full_name, &current.full_name, "full_name", &mut changed),
            address: keep(self.address.map(Some), &current.address, "address", &mut changed)
                .flatten(),
            city: keep(self.city.map(Some), &current.city, "city", &mut changed).flatten(),
            pincode: keep(self.pincode.map(Some), &current.pincode, "pincode", &mut changed)
                .flatten(),
            service_type: keep(
                self.service_type,
                &current.service_type,
                "service_type",
                &mut changed,
            ),
            communication_preference: keep(
                self.communication_preference,
                &current.communication_preference,
                "communication_preference",
                &mut changed,
            ),
            subscribe_newsletter: keep(
                self.subscribe_newsletter,
                &current.subscribe_newsletter,
                "subscribe_newsletter",
                &mut changed,
            ),
        };

        (retained, changed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_user() -> User {
        User {
            id: UserId::new(7),
            email: Email::parse("anita@example.com").unwrap(),
            username: "anita_d".to_string(),
            phone: Some("9876543210".to_string()),
            full_name: Some("Anita Desai".to_string()),
            address: Some("12 MG Road".to_string()),
            city: Some("Pune".to_string()),
            pincode: Some("411001".to_string()),
            service_type: ServiceTier::Standard,
            communication_preference: CommunicationPreference::Both,
            subscribe_newsletter: false,
            profile_picture: None,
            oauth_provider: None,
            is_active: true,
            email_verified: true,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let mut user = sample_user();
        assert_eq!(user.display_name(), "Anita Desai");

        user.full_name = Some("  ".to_string());
        assert_eq!(user.display_name(), "anita_d");
    }

    #[test]
    fn test_retain_changed_drops_unchanged_fields() {
        let user = sample_user();
        let changes = ProfileChanges {
            phone: Some("9876543210".to_string()),
            city: Some("Mumbai".to_string()),
            service_type: Some(ServiceTier::Express),
            subscribe_newsletter: Some(false),
            ..ProfileChanges::default()
        };

        let (retained, changed) = changes.retain_changed(&user);

        assert_eq!(changed, vec!["city", "service_type"]);
        assert_eq!(retained.phone, None);
        assert_eq!(retained.city.as_deref(), Some("Mumbai"));
        assert_eq!(retained.subscribe_newsletter, None);
    }

    #[test]
    fn test_retain_changed_can_clear_full_name() {
        let user = sample_user();
        let changes = ProfileChanges {
            full_name: Some(None),
            ..ProfileChanges::default()
        };

        let (retained, changed) = changes.retain_changed(&user);
        assert_eq!(changed, vec!["full_name"]);
        assert_eq!(retained.full_name, Some(None));
    }

    #[test]
    fn test_retain_changed_with_nothing_new_is_empty() {
        let user = sample_user();
        let changes = ProfileChanges {
            pincode: Some("411001".to_string()),
            ..ProfileChanges::default()
        };

        let (retained, changed) = changes.retain_changed(&user);
        assert!(changed.is_empty());
        assert!(retained.is_empty());
    }

    #[test]
    fn test_profile_serializes_flat_without_missing_url() {
        let profile = UserProfile {
            user: sample_user(),
            profile_picture_url: None,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["username"], "anita_d");
        assert_eq!(json["service_type"], "standard");
        assert!(json.get("profile_picture_url").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
