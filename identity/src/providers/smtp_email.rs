//! SMTP notification dispatcher using Lettre.

use crate::error::{AuthError, Result};
use crate::providers::NotificationDispatcher;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::env;

/// SMTP dispatcher.
///
/// Sends real emails over an authenticated, TLS-wrapped SMTP relay.
///
/// # Configuration
///
/// - `smtp_server`: SMTP server address (e.g., "smtp.gmail.com")
/// - `smtp_port`: SMTP server port (usually 587 for STARTTLS, 465 for TLS)
/// - `smtp_username` / `smtp_password`: relay credentials
/// - `from_email` / `from_name`: sender identity
///
/// # Examples
///
/// ```ignore
/// use warden_identity::providers::SmtpDispatcher;
///
/// let dispatcher = SmtpDispatcher::new(
///     "smtp.gmail.com".to_string(),
///     587,
///     "user@gmail.com".to_string(),
///     "app_password".to_string(),
///     "noreply@example.com".to_string(),
///     "Warden".to_string(),
/// );
/// ```
#[derive(Clone)]
pub struct SmtpDispatcher {
    smtp_server: String,
    smtp_port: u16,
    credentials: Credentials,
    from_email: String,
    from_name: String,
}

impl std::fmt::Debug for SmtpDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpDispatcher")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("from_email", &self.from_email)
            .finish_non_exhaustive()
    }
}

impl SmtpDispatcher {
    /// Create a new SMTP dispatcher.
    #[must_use]
    pub fn new(
        smtp_server: String,
        smtp_port: u16,
        smtp_username: String,
        smtp_password: String,
        from_email: String,
        from_name: String,
    ) -> Self {
        Self {
            smtp_server,
            smtp_port,
            credentials: Credentials::new(smtp_username, smtp_password),
            from_email,
            from_name,
        }
    }

    /// Load from `SMTP_HOST`, `SMTP_PORT` (default 587), `SMTP_USERNAME`,
    /// `SMTP_PASSWORD`, `SMTP_FROM_EMAIL`, and `SMTP_FROM_NAME` (default "Warden").
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if a required variable is missing
    /// or the port does not parse.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            env::var(name).map_err(|_| AuthError::Configuration(format!("{name} must be set")))
        };

        let port = match env::var("SMTP_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AuthError::Configuration(format!("SMTP_PORT is not a valid port: {raw}")))?,
            Err(_) => 587,
        };

        Ok(Self::new(
            var("SMTP_HOST")?,
            port,
            var("SMTP_USERNAME")?,
            var("SMTP_PASSWORD")?,
            var("SMTP_FROM_EMAIL")?,
            env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Warden".to_string()),
        ))
    }

    /// Build a transport per message to avoid stale pooled connections.
    fn build_transport(&self) -> Result<SmtpTransport> {
        Ok(SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| AuthError::EmailDelivery(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}

impl NotificationDispatcher for SmtpDispatcher {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| AuthError::EmailDelivery(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AuthError::EmailDelivery(format!("Invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| AuthError::EmailDelivery(format!("Failed to build email: {e}")))?;

        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| AuthError::EmailDelivery(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| AuthError::EmailDelivery(format!("Email task failed: {e}")))??;

        tracing::info!(to = %to, subject = %subject, "Email sent via SMTP");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_recipient_fails_before_connecting() {
        let dispatcher = SmtpDispatcher::new(
            "smtp.invalid".to_string(),
            587,
            "user".to_string(),
            "pass".to_string(),
            "noreply@example.com".to_string(),
            "Warden".to_string(),
        );

        let result = dispatcher.send("not an address", "Hi", "<p>Hi</p>").await;
        assert!(matches!(result, Err(AuthError::EmailDelivery(msg)) if msg.contains("Invalid to address")));
    }
}
