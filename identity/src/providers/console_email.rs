//! Console notification dispatcher for development.

use crate::error::Result;
use crate::providers::NotificationDispatcher;
use tracing::info;

/// Console dispatcher.
///
/// Logs emails instead of sending them. Links in the body are printed
/// verbatim, so confirmation and reset flows can be completed by hand.
#[derive(Clone, Debug, Default)]
pub struct ConsoleDispatcher;

impl ConsoleDispatcher {
    /// Create a new console dispatcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NotificationDispatcher for ConsoleDispatcher {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let links: Vec<&str> = extract_links(html_body).collect();
        info!(
            to = %to,
            subject = %subject,
            links = ?links,
            "📧 Email (development mode)"
        );
        Ok(())
    }
}

/// `href` targets in an HTML body.
fn extract_links(html: &str) -> impl Iterator<Item = &str> {
    html.split("href=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
}
