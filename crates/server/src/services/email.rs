//! Email service for OTP codes and account notifications.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plain text
//! templates. The server runs without it when `SMTP_HOST` is unset.

use askama::Template;
use axum::http::StatusCode;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::{AppConfig, EmailConfig};

#[derive(Template)]
#[template(path = "email/otp.html")]
struct OtpEmailHtml<'a> {
    app_name: &'a str,
    code: &'a str,
    expires_in_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/otp.txt")]
struct OtpEmailText<'a> {
    app_name: &'a str,
    code: &'a str,
    expires_in_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    app_name: &'a str,
    app_url: &'a str,
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    app_name: &'a str,
    app_url: &'a str,
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    app_name: &'a str,
    name: &'a str,
    reset_link: &'a str,
    expires_in_hours: i64,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    app_name: &'a str,
    name: &'a str,
    reset_link: &'a str,
    expires_in_hours: i64,
}

#[derive(Template)]
#[template(path = "email/profile_updated.html")]
struct ProfileUpdatedEmailHtml<'a> {
    app_name: &'a str,
    name: &'a str,
    fields: &'a [&'a str],
}

#[derive(Template)]
#[template(path = "email/profile_updated.txt")]
struct ProfileUpdatedEmailText<'a> {
    app_name: &'a str,
    name: &'a str,
    fields: &'a [&'a str],
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl EmailError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    app_name: String,
    app_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, app: &AppConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            app_name: app.name.clone(),
            app_url: app.base_url().to_string(),
        })
    }

    /// Send a registration OTP code.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_otp(
        &self,
        to: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> Result<(), EmailError> {
        let app_name = self.app_name.as_str();
        let html = OtpEmailHtml {
            app_name,
            code,
            expires_in_minutes,
        }
        .render()?;
        let text = OtpEmailText {
            app_name,
            code,
            expires_in_minutes,
        }
        .render()?;

        let subject = format!("Your {app_name} verification code");
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send a welcome email after successful registration.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_welcome(&self, to: &str, name: &str) -> Result<(), EmailError> {
        let app_name = self.app_name.as_str();
        let app_url = self.app_url.as_str();
        let html = WelcomeEmailHtml {
            app_name,
            app_url,
            name,
        }
        .render()?;
        let text = WelcomeEmailText {
            app_name,
            app_url,
            name,
        }
        .render()?;

        let subject = format!("Welcome to {app_name}");
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send a password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_link: &str,
        expires_in_hours: i64,
    ) -> Result<(), EmailError> {
        let app_name = self.app_name.as_str();
        let html = PasswordResetEmailHtml {
            app_name,
            name,
            reset_link,
            expires_in_hours,
        }
        .render()?;
        let text = PasswordResetEmailText {
            app_name,
            name,
            reset_link,
            expires_in_hours,
        }
        .render()?;

        let subject = format!("Reset your {app_name} password");
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Tell a customer which profile fields changed.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_profile_updated(
        &self,
        to: &str,
        name: &str,
        changed_fields: &[&str],
    ) -> Result<(), EmailError> {
        let labels: Vec<&str> = changed_fields.iter().copied().map(field_label).collect();
        let app_name = self.app_name.as_str();
        let html = ProfileUpdatedEmailHtml {
            app_name,
            name,
            fields: &labels,
        }
        .render()?;
        let text = ProfileUpdatedEmailText {
            app_name,
            name,
            fields: &labels,
        }
        .render()?;

        let subject = format!("Your {app_name} profile was updated");
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(subject = %subject, "Email sent");
        Ok(())
    }
}

/// Human label for a profile column name.
#[must_use]
pub fn field_label(field: &str) -> &str {
    match field {
        "phone" => "Phone number",
        "full_name" => "Full name",
        "address" => "Address",
        "city" => "City",
        "pincode" => "Pincode",
        "service_type" => "Preferred service",
        "communication_preference" => "Communication preference",
        "subscribe_newsletter" => "Newsletter subscription",
        "profile_picture" => "Profile picture",
        "password" => "Password",
        other => other,
    }
}
