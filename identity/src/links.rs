//! Links embedded in notification emails.
//!
//! Format: `<route>?userId=<id>&<tokenField>=<token>`, with both values
//! percent-encoded.

use crate::state::UserId;

/// Query parameter carrying a confirmation token.
pub const CONFIRMATION_TOKEN_FIELD: &str = "confirmationToken";

/// Query parameter carrying a password reset token.
pub const RESET_TOKEN_FIELD: &str = "resetPasswordToken";

/// Build a single-use link.
///
/// # Examples
///
/// ```
/// use warden_identity::links::build_link;
/// use warden_identity::UserId;
///
/// let id = UserId::parse("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
/// let link = build_link("https://x.io/api/users/confirm-account", id, "confirmationToken", "a_b-c");
/// assert_eq!(
///     link,
///     "https://x.io/api/users/confirm-account?userId=67e55044-10b1-426f-9247-bb680e5fe0c8&confirmationToken=a_b-c"
/// );
/// ```
#[must_use]
pub fn build_link(route_url: &str, user_id: UserId, token_field: &str, token: &str) -> String {
    format!(
        "{route_url}?userId={}&{token_field}={}",
        urlencoding::encode(&user_id.to_string()),
        urlencoding::encode(token)
    )
}
