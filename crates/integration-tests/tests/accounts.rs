//! Login lockout and session lifecycle, driven through the auth service
//! against a real database.
//!
//! Each test registers its own account, so runs do not interfere.

use quick_laundry_core::{CommunicationPreference, Email, ServiceTier};
use quick_laundry_integration_tests::{database_pool, unique_email};
use quick_laundry_server::config::{JwtConfig, SecurityConfig};
use quick_laundry_server::db::{SessionRepository, UserRepository};
use quick_laundry_server::models::{NewUser, User};
use quick_laundry_server::services::auth::{AuthError, AuthService, ClientInfo};
use quick_laundry_server::services::jwt::JwtService;
use secrecy::SecretString;
use sqlx::PgPool;

const PASSWORD: &str = "s3cret!pass";
const WRONG_PASSWORD: &str = "wr0ng!pass";

fn jwt() -> JwtService {
    let config = JwtConfig {
        secret: SecretString::from("k9#Fq2!vLw8@Zr5$Tn1^Hx4&Pb7*Md3%"),
        access_token_hours: 1,
        refresh_token_days: 1,
    };
    JwtService::new(&config, 1)
}

fn new_user() -> NewUser {
    let id = uuid::Uuid::new_v4().as_u128();
    NewUser {
        email: Email::parse(&unique_email("account")).expect("valid email"),
        username: format!("it_{:x}", id % 0xffff_ffff_ffff),
        phone: format!("9{:09}", id % 1_000_000_000),
        full_name: Some("Integration Tester".to_string()),
        address: "12 MG Road, Pune".to_string(),
        city: "Pune".to_string(),
        pincode: "411001".to_string(),
        service_type: ServiceTier::Standard,
        communication_preference: CommunicationPreference::Email,
        subscribe_newsletter: false,
    }
}

async fn register(auth: &AuthService<'_>) -> User {
    auth.register(&new_user(), PASSWORD)
        .await
        .expect("Failed to register account")
}

async fn remove(pool: &PgPool, user: &User) {
    UserRepository::new(pool)
        .delete_by_email(&user.email)
        .await
        .expect("Failed to delete account");
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_fifth_failure_locks_account() {
    let pool = database_pool().await;
    let (jwt, security) = (jwt(), SecurityConfig::default());
    let auth = AuthService::new(&pool, &jwt, &security);
    let user = register(&auth).await;
    let client = ClientInfo::default();

    for _ in 0..security.max_login_attempts {
        let result = auth.login(user.email.as_str(), WRONG_PASSWORD, &client).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)), "{result:?}");
    }

    // The right password no longer helps once locked
    let result = auth.login(user.email.as_str(), PASSWORD, &client).await;
    assert!(matches!(result, Err(AuthError::AccountLocked { .. })), "{result:?}");

    remove(&pool, &user).await;
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_successful_login_resets_failures() {
    let pool = database_pool().await;
    let (jwt, security) = (jwt(), SecurityConfig::default());
    let auth = AuthService::new(&pool, &jwt, &security);
    let user = register(&auth).await;
    let client = ClientInfo::default();

    for _ in 1..security.max_login_attempts {
        let result = auth.login(&user.username, WRONG_PASSWORD, &client).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)), "{result:?}");
    }
    auth.login(&user.username, PASSWORD, &client)
        .await
        .expect("login below the threshold should succeed");

    // A full allowance of failures is available again
    for _ in 1..security.max_login_attempts {
        let result = auth.login(&user.username, WRONG_PASSWORD, &client).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)), "{result:?}");
    }
    auth.login(&user.username, PASSWORD, &client)
        .await
        .expect("count should restart after a success");

    remove(&pool, &user).await;
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_session_create_validate_revoke() {
    let pool = database_pool().await;
    let (jwt, security) = (jwt(), SecurityConfig::default());
    let auth = AuthService::new(&pool, &jwt, &security);
    let sessions = SessionRepository::new(&pool);
    let user = register(&auth).await;
    let client = ClientInfo {
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: Some("integration-tests".to_string()),
    };

    // Two logins in the same second get separate sessions
    let (_, first) = auth
        .login(user.email.as_str(), PASSWORD, &client)
        .await
        .expect("first login");
    let (_, second) = auth
        .login(user.email.as_str(), PASSWORD, &client)
        .await
        .expect("second login");
    assert_ne!(first.access_token, second.access_token);

    let live = sessions
        .touch_live(&first.access_token)
        .await
        .expect("lookup failed")
        .expect("session should be live");
    assert_eq!(live.user_id, user.id);
    assert_eq!(live.ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(auth.sessions(user.id).await.expect("list failed").len(), 2);

    // Logout closes only the session behind that token
    auth.logout(&first.access_token).await.expect("logout failed");
    assert!(sessions.touch_live(&first.access_token).await.expect("lookup failed").is_none());
    assert!(sessions.touch_live(&second.access_token).await.expect("lookup failed").is_some());

    // Refresh opens a new session
    let refreshed = auth
        .refresh(&second.refresh_token, &client)
        .await
        .expect("refresh failed");
    let refreshed_session = sessions
        .touch_live(&refreshed.access_token)
        .await
        .expect("lookup failed")
        .expect("refreshed session should be live");

    // Revoking by id is limited to the owner
    let other = register(&auth).await;
    let result = auth.revoke_session(other.id, refreshed_session.id).await;
    assert!(matches!(result, Err(AuthError::SessionNotFound)), "{result:?}");
    auth.revoke_session(user.id, refreshed_session.id)
        .await
        .expect("owner revoke failed");
    assert!(sessions.touch_live(&refreshed.access_token).await.expect("lookup failed").is_none());

    remove(&pool, &other).await;
    remove(&pool, &user).await;
}
