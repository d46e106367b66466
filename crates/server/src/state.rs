//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::email::EmailService;
use crate::services::jwt::JwtService;
use crate::services::pricing::PricingCatalog;
use crate::services::uploads::AvatarStore;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    jwt: JwtService,
    email: Option<EmailService>,
    pricing: PricingCatalog,
    avatars: AvatarStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let jwt = JwtService::new(&config.jwt, config.security.password_reset_expiry_hours);
        let email = config
            .email
            .as_ref()
            .map(|email| EmailService::new(email, &config.app))
            .transpose()?;
        if email.is_none() {
            tracing::warn!("SMTP_HOST not set, emails are disabled and OTP codes will be logged");
        }
        let avatars = AvatarStore::new(config.uploads.folder.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                email,
                pricing: PricingCatalog::new(),
                avatars,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn jwt(&self) -> &JwtService {
        &self.inner.jwt
    }

    /// The mailer, or `None` in dev mode.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    #[must_use]
    pub fn pricing(&self) -> &PricingCatalog {
        &self.inner.pricing
    }

    #[must_use]
    pub fn avatars(&self) -> &AvatarStore {
        &self.inner.avatars
    }

    /// Public URL of a stored avatar.
    #[must_use]
    pub fn avatar_url(&self, stored: &str) -> String {
        crate::services::uploads::public_url(self.inner.config.app.base_url(), stored)
    }
}
