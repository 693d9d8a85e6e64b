//! Notification dispatcher trait.

use crate::error::Result;
use std::future::Future;

/// Email delivery.
///
/// This trait abstracts over delivery services (SMTP, SES, Postmark, etc.).
/// The lifecycle manager decides *when* to send and renders the body; the
/// dispatcher only delivers. Failures are logged by the caller and never roll
/// back committed state.
pub trait NotificationDispatcher: Send + Sync {
    /// Send an HTML email.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailDelivery`](crate::AuthError::EmailDelivery) if:
    /// - An address does not parse
    /// - The transport rejects the message
    fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}
