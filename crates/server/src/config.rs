//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LAUNDRY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET_KEY` - HS256 signing key (min 32 chars, high entropy)
//!
//! ## Optional
//! - `LAUNDRY_HOST` - Bind address (default: 127.0.0.1)
//! - `LAUNDRY_PORT` - Listen port (default: 3000)
//! - `APP_NAME` - Brand name used in emails (default: Quick Laundry)
//! - `APP_URL` - Public URL of the frontend (default: <http://localhost:3000>)
//! - `APP_ENV` - Deployment environment (default: development)
//! - `JWT_ACCESS_TOKEN_EXPIRES_HOURS` - Access token lifetime (default: 24)
//! - `JWT_REFRESH_TOKEN_EXPIRES_DAYS` - Refresh token lifetime (default: 30)
//! - `OTP_EXPIRY_MINUTES` - OTP lifetime and request window (default: 10)
//! - `OTP_MAX_ATTEMPTS` - OTP requests per window and guesses per code (default: 5)
//! - `PASSWORD_RESET_EXPIRY_HOURS` - Reset link lifetime and request window (default: 1)
//! - `PASSWORD_RESET_MAX_ATTEMPTS` - Reset requests per window (default: 3)
//! - `MAX_LOGIN_ATTEMPTS` - Failed logins before lockout (default: 5)
//! - `LOGIN_LOCKOUT_MINUTES` - Lockout window (default: 15)
//! - `MAX_SESSIONS_PER_USER` - Concurrent sessions kept per user (default: 5)
//! - `UPLOAD_FOLDER` - Avatar storage directory (default: uploads)
//! - `SMTP_HOST` - Enables outbound mail; when set, `SMTP_USERNAME`,
//!   `SMTP_PASSWORD` and `SMTP_FROM` are required and `SMTP_PORT` defaults to 587
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Branding and public URLs
    pub app: AppConfig,
    /// Token signing and lifetimes
    pub jwt: JwtConfig,
    /// OTP, password reset, login and session limits
    pub security: SecurityConfig,
    /// Avatar storage
    pub uploads: UploadConfig,
    /// Outbound mail (dev mode when `None`)
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Branding and public URLs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Brand name shown in emails and the API index
    pub name: String,
    /// Public URL of the frontend; reset links and avatar URLs hang off it
    pub url: Url,
    /// Deployment environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// `APP_URL` without a trailing slash, ready for `format!("{base}/path")`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }
}

/// JWT signing configuration.
///
/// Implements `Debug` manually to redact the signing key.
#[derive(Clone)]
pub struct JwtConfig {
    /// HS256 signing key
    pub secret: SecretString,
    /// Access token (and session) lifetime in hours
    pub access_token_hours: i64,
    /// Refresh token lifetime in days
    pub refresh_token_days: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("access_token_hours", &self.access_token_hours)
            .field("refresh_token_days", &self.refresh_token_days)
            .finish()
    }
}

/// Limits for the authentication flows.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Minutes an OTP stays valid; also the OTP request window
    pub otp_expiry_minutes: i64,
    /// OTP requests allowed per window, and wrong guesses allowed per code
    pub otp_max_attempts: i64,
    /// Hours a reset link stays valid; also the reset request window
    pub password_reset_expiry_hours: i64,
    /// Reset requests allowed per window
    pub password_reset_max_attempts: i64,
    /// Failed logins allowed per lockout window
    pub max_login_attempts: i64,
    /// Lockout window in minutes
    pub login_lockout_minutes: i64,
    /// Sessions kept per user; older ones are pruned on login
    pub max_sessions_per_user: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            otp_expiry_minutes: 10,
            otp_max_attempts: 5,
            password_reset_expiry_hours: 1,
            password_reset_max_attempts: 3,
            max_login_attempts: 5,
            login_lockout_minutes: 15,
            max_sessions_per_user: 5,
        }
    }
}

/// Avatar storage configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Root directory; avatars go to `{folder}/profile_pictures/`
    pub folder: PathBuf,
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port (STARTTLS)
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: SecretString,
    /// Sender address, e.g. `Quick Laundry <noreply@quicklaundry.in>`
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the JWT secret fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("LAUNDRY_DATABASE_URL")?;
        let host = get_parsed_env("LAUNDRY_HOST", "127.0.0.1")?;
        let port = get_parsed_env("LAUNDRY_PORT", "3000")?;

        Ok(Self {
            database_url,
            host,
            port,
            app: AppConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            security: SecurityConfig::from_env()?,
            uploads: UploadConfig {
                folder: PathBuf::from(get_env_or_default("UPLOAD_FOLDER", "uploads")),
            },
            email: EmailConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_env_or_default("APP_URL", "http://localhost:3000");
        let url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("APP_URL".to_string(), e.to_string()))?;

        Ok(Self {
            name: get_env_or_default("APP_NAME", "Quick Laundry"),
            url,
            environment: get_env_or_default("APP_ENV", "development"),
        })
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("JWT_SECRET_KEY")?;
        validate_secret_length(&secret, "JWT_SECRET_KEY")?;

        Ok(Self {
            secret,
            access_token_hours: get_positive_env("JWT_ACCESS_TOKEN_EXPIRES_HOURS", 24)?,
            refresh_token_days: get_positive_env("JWT_REFRESH_TOKEN_EXPIRES_DAYS", 30)?,
        })
    }
}

impl SecurityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            otp_expiry_minutes: get_positive_env("OTP_EXPIRY_MINUTES", defaults.otp_expiry_minutes)?,
            otp_max_attempts: get_positive_env("OTP_MAX_ATTEMPTS", defaults.otp_max_attempts)?,
            password_reset_expiry_hours: get_positive_env(
                "PASSWORD_RESET_EXPIRY_HOURS",
                defaults.password_reset_expiry_hours,
            )?,
            password_reset_max_attempts: get_positive_env(
                "PASSWORD_RESET_MAX_ATTEMPTS",
                defaults.password_reset_max_attempts,
            )?,
            max_login_attempts: get_positive_env("MAX_LOGIN_ATTEMPTS", defaults.max_login_attempts)?,
            login_lockout_minutes: get_positive_env(
                "LOGIN_LOCKOUT_MINUTES",
                defaults.login_lockout_minutes,
            )?,
            max_sessions_per_user: get_positive_env(
                "MAX_SESSIONS_PER_USER",
                defaults.max_sessions_per_user,
            )?,
        })
    }
}

impl EmailConfig {
    /// SMTP is optional as a group: without `SMTP_HOST` the server runs in
    /// dev mode and logs codes instead of mailing them.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: get_parsed_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: SecretString::from(get_required_env("SMTP_PASSWORD")?),
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable (or its default) parsed into `T`.
fn get_parsed_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

/// Get a strictly positive integer, e.g. a lifetime or a limit.
fn get_positive_env(key: &str, default: i64) -> Result<i64, ConfigError> {
    let value = std::env::var(key).map_or(Ok(default), |raw| parse_value::<i64>(key, &raw))?;
    ensure_positive(key, value)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn ensure_positive(key: &str, value: i64) -> Result<i64, ConfigError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be greater than zero (got {value})"),
        ))
    }
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Configuration used by unit tests across the crate.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://localhost/quick_laundry_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        app: AppConfig {
            name: "Quick Laundry".to_string(),
            url: Url::parse("http://localhost:3000/").unwrap(),
            environment: "test".to_string(),
        },
        jwt: JwtConfig {
            secret: SecretString::from("k9#Fq2!vLw8@Zr5$Tn1^Hx4&Pb7*Md3%"),
            access_token_hours: 24,
            refresh_token_days: 30,
        },
        security: SecurityConfig::default(),
        uploads: UploadConfig {
            folder: std::env::temp_dir().join("quick-laundry-test-uploads"),
        },
        email: None,
        sentry_dsn: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-jwt-key-here", "JWT_SECRET_KEY").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "JWT_SECRET_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("k9#Fq2!vLw8@Zr5$Tn1^Hx4&Pb7*Md3%", "JWT_SECRET_KEY").is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        let short = SecretString::from("k9#Fq2!vLw8@");
        assert!(validate_secret_length(&short, "JWT_SECRET_KEY").is_err());

        let long = SecretString::from("k9#Fq2!vLw8@Zr5$Tn1^Hx4&Pb7*Md3%");
        assert!(validate_secret_length(&long, "JWT_SECRET_KEY").is_ok());
    }

    #[test]
    fn test_parse_value() {
        let port: u16 = parse_value("LAUNDRY_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);

        let err = parse_value::<u16>("LAUNDRY_PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "LAUNDRY_PORT"));
    }

    #[test]
    fn test_ensure_positive() {
        assert_eq!(ensure_positive("OTP_MAX_ATTEMPTS", 5).unwrap(), 5);
        assert!(ensure_positive("OTP_MAX_ATTEMPTS", 0).is_err());
        assert!(ensure_positive("OTP_MAX_ATTEMPTS", -3).is_err());
    }

    #[test]
    fn test_security_defaults() {
        let defaults = SecurityConfig::default();
        assert_eq!(defaults.otp_expiry_minutes, 10);
        assert_eq!(defaults.otp_max_attempts, 5);
        assert_eq!(defaults.max_login_attempts, 5);
        assert_eq!(defaults.login_lockout_minutes, 15);
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let config = test_config();
        assert_eq!(config.app.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = test_config();
        let jwt_debug = format!("{:?}", config.jwt);
        assert!(jwt_debug.contains("[REDACTED]"));
        assert!(!jwt_debug.contains("k9#Fq2"));

        let email = EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("super_secret_smtp_password"),
            from_address: "noreply@example.com".to_string(),
        };
        let email_debug = format!("{email:?}");
        assert!(email_debug.contains("smtp.example.com"));
        assert!(!email_debug.contains("super_secret_smtp_password"));
    }
}
