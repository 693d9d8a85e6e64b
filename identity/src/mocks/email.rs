//! Recording notification dispatcher for testing.

use crate::error::{AuthError, Result};
use crate::providers::NotificationDispatcher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// An email captured by [`RecordingDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// Recipient.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

impl SentEmail {
    /// Value of a query parameter in the first link carrying it.
    ///
    /// Handy for pulling the confirmation/reset token out of an email.
    #[must_use]
    pub fn link_param(&self, name: &str) -> Option<String> {
        let needle = format!("{name}=");
        let start = self.html.find(&needle)? + needle.len();
        let value: String = self.html[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '%' | '.'))
            .collect();
        urlencoding::decode(&value).ok().map(|v| v.into_owned())
    }
}

/// Records every email instead of sending it.
///
/// Switch to failure mode with [`RecordingDispatcher::failing`] to check that
/// delivery errors never roll back committed state.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingDispatcher {
    /// Create a dispatcher that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher whose every send fails (nothing is recorded).
    #[must_use]
    pub fn failing() -> Self {
        let dispatcher = Self::default();
        dispatcher.set_failing(true);
        dispatcher
    }

    /// Toggle failure mode.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// All recorded emails, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Recorded emails addressed to `to`.
    #[must_use]
    pub fn sent_to(&self, to: &str) -> Vec<SentEmail> {
        self.sent().into_iter().filter(|e| e.to == to).collect()
    }

    /// Most recent email addressed to `to`.
    #[must_use]
    pub fn last_to(&self, to: &str) -> Option<SentEmail> {
        self.sent_to(to).pop()
    }

    /// Forget all recorded emails.
    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuthError::EmailDelivery("simulated delivery failure".to_string()));
        }

        self.sent
            .lock()
            .map_err(|_| AuthError::EmailDelivery("recorder lock poisoned".to_string()))?
            .push(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                html: html_body.to_string(),
            });
        Ok(())
    }
}
