//! Identity lifecycle constants.
//!
//! Success messages are part of the deployed wire contract; clients match on
//! some of them, so they change only together with the clients.

/// Success messages for the response envelope.
pub mod messages {
    /// Registration succeeded.
    pub const REGISTERED: &str =
        "User registered successfully. Please check your email inbox to confirm your account.";

    /// Password or federated login succeeded.
    pub const LOGGED_IN: &str = "User logged in successfully.";

    /// Refresh rotated the session.
    pub const TOKEN_REFRESHED: &str = "Access token refreshed successfully.";

    /// Account confirmed.
    pub const ACCOUNT_CONFIRMED: &str = "Your account has been successfully confirmed.";

    /// Current user fetched.
    pub const USER_RETRIEVED: &str = "User retrieved successfully.";

    /// Public profile fetched.
    pub const PROFILE_RETRIEVED: &str = "User profile retrieved successfully.";

    /// Password changed.
    pub const PASSWORD_CHANGED: &str = "Password changed successfully.";

    /// Password reset.
    pub const PASSWORD_RESET: &str = "Password has been reset successfully.";

    /// Account details updated.
    pub const ACCOUNT_UPDATED: &str = "Account updated successfully.";

    /// Email change confirmed.
    pub const EMAIL_CHANGED: &str = "Great! Email changed successfully.";

    /// Account deleted.
    pub const USER_DELETED: &str = "User deleted successfully.";

    /// Resend-confirmation response. Identical whether or not the account exists.
    #[must_use]
    pub fn confirmation_resent(email: &str) -> String {
        format!(
            "If your account exists, a new confirmation email has been sent to ({email}). Please check your inbox."
        )
    }

    /// Forgot-password response. Identical whether or not the account exists.
    #[must_use]
    pub fn reset_requested(email: &str) -> String {
        format!("If your account exists, an email has been sent to ({email}) with further instructions.")
    }

    /// Email-change request accepted.
    #[must_use]
    pub fn email_change_requested(new_email: &str) -> String {
        format!(
            "A confirmation email has been sent to ({new_email}). Please check your inbox and follow the instructions to confirm your email address."
        )
    }

    /// Ban/unban applied; `action` is "banned" or "unbanned".
    #[must_use]
    pub fn status_changed(action: &str) -> String {
        format!("User {action} successfully.")
    }
}
