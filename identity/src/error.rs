//! Error types for identity and credential lifecycle operations.

use thiserror::Error;

/// Result type alias for identity operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Classification of an [`AuthError`].
///
/// The transport boundary uses this to decide how loudly to log and how
/// much of the message may reach the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Lookup miss.
    NotFound,
    /// Duplicate unique field, or the record is already in the target state.
    Conflict,
    /// Bad credential, or a bad/expired/mismatched token or signature.
    Unauthorized,
    /// Acting on another principal's resource, banned/unconfirmed account,
    /// or insufficient role.
    Forbidden,
    /// Malformed input.
    Validation,
    /// Hashing, signing, token generation, or storage failure.
    Internal,
}

/// Comprehensive error taxonomy for the identity lifecycle.
///
/// Every variant carries a user-facing message. Internal variants also carry
/// a diagnostic string that is logged but never sent to clients (see
/// [`AuthError::client_message`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════

    /// No account matches the given id, username, or email.
    #[error("User does not exist.")]
    UserNotFound,

    // ═══════════════════════════════════════════════════════════
    // Conflicts
    // ═══════════════════════════════════════════════════════════

    /// A unique field (username or email) is already taken.
    #[error("A user already exists with the same {field}.")]
    DuplicateField {
        /// Name of the conflicting field.
        field: &'static str,
    },

    /// Email is already the live address of some account.
    #[error("This email address is already in use. Please provide a different email address.")]
    EmailInUse,

    /// Password login attempted on a federated account.
    #[error("You have already an account created using {provider}. Try to login with {provider}")]
    FederatedAccount {
        /// Provider the account was created with.
        provider: String,
    },

    /// Federated login attempted on an email that belongs to a password account.
    #[error("Your email is associated with an account. Please login with your email & password")]
    LocalAccountExists,

    /// Confirmation attempted on an account that is already confirmed.
    #[error("Hey there! Your account is already confirmed. Feel free to log in.")]
    AccountAlreadyConfirmed,

    /// Confirmation email requested for an account that is already confirmed.
    #[error("Your account is already confirmed. Feel free to log in.")]
    ConfirmationNotNeeded,

    /// Ban requested on an account that is already banned.
    #[error("User is already banned.")]
    AlreadyBanned,

    /// Unban requested on an account that is not banned.
    #[error("User is already unbanned.")]
    AlreadyUnbanned,

    /// The record changed between verification and commit.
    #[error("The account was modified concurrently. Please try again.")]
    ConcurrentModification,

    // ═══════════════════════════════════════════════════════════
    // Authentication
    // ═══════════════════════════════════════════════════════════

    /// Username/email and password do not match.
    #[error("Incorrect username or password. Please try again.")]
    InvalidCredentials,

    /// Current password check failed during an email change.
    #[error("Incorrect password. Please provide correct password and try again.")]
    IncorrectPassword,

    /// Confirmation token does not match the pending one.
    #[error("Uh-oh! The account confirmation token provided is invalid.")]
    InvalidConfirmationToken,

    /// Reset token does not match the pending one.
    #[error("You might have clicked on a broken link. Please request a new link to reset your password.")]
    InvalidResetToken,

    /// Email-change token does not match, or no change is pending.
    #[error("Sorry, you don't have permission to update this email address. Please click on the correct link.")]
    InvalidEmailChangeToken,

    /// Refresh token is invalid, expired, or has been rotated away.
    #[error("The refresh token provided is invalid or has expired. Please login again to obtain a new refresh token.")]
    InvalidRefreshToken,

    /// Access token is missing, malformed, expired, or badly signed.
    #[error("Authentication failed: invalid or expired access token.")]
    InvalidAccessToken,

    /// Federated identity assertion was rejected by the verifier.
    #[error("Invalid token")]
    InvalidFederatedAssertion,

    // ═══════════════════════════════════════════════════════════
    // Authorization
    // ═══════════════════════════════════════════════════════════

    /// Token is valid but the role claim does not satisfy the requirement.
    #[error("Access denied: Insufficient permissions.")]
    InsufficientPermissions,

    /// Principal tried to act on another account.
    #[error("Sorry, you don't have permission to perform this operation. Please provide a valid user id.")]
    NotResourceOwner,

    /// Account is banned.
    #[error("Your account has been temporarily suspended. For assistance, please contact our support team at [{support_email}]. Thank you for your understanding.")]
    AccountSuspended {
        /// Support contact shown to the user.
        support_email: String,
    },

    /// Account has not confirmed its email yet.
    #[error("Account Not Confirmed. Your account needs to be confirmed. Please check your email inbox for the confirmation link.")]
    AccountNotConfirmed,

    /// Delete attempted on an account that is not a plain user.
    #[error("Admin accounts cannot be deleted.")]
    ProtectedAccount,

    // ═══════════════════════════════════════════════════════════
    // Validation
    // ═══════════════════════════════════════════════════════════

    /// Old password check failed during a password change.
    #[error("Incorrect old password. Please try again with the correct password.")]
    IncorrectOldPassword,

    /// Malformed input.
    #[error("{0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Credential store operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Password hashing failed.
    #[error("Password hashing error: {0}")]
    Hashing(String),

    /// Session token signing failed.
    #[error("Token signing error: {0}")]
    Signing(String),

    /// The entropy source failed.
    #[error("Token generation error: {0}")]
    TokenGeneration(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Notification delivery failed.
    #[error("Email error: {0}")]
    EmailDelivery(String),

    /// External media deletion failed.
    #[error("Media error: {0}")]
    Media(String),
}

impl AuthError {
    /// Taxonomy classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound => ErrorKind::NotFound,

            Self::DuplicateField { .. }
            | Self::EmailInUse
            | Self::FederatedAccount { .. }
            | Self::LocalAccountExists
            | Self::AccountAlreadyConfirmed
            | Self::ConfirmationNotNeeded
            | Self::AlreadyBanned
            | Self::AlreadyUnbanned
            | Self::ConcurrentModification => ErrorKind::Conflict,

            Self::InvalidCredentials
            | Self::IncorrectPassword
            | Self::InvalidConfirmationToken
            | Self::InvalidResetToken
            | Self::InvalidEmailChangeToken
            | Self::InvalidRefreshToken
            | Self::InvalidAccessToken
            | Self::InvalidFederatedAssertion => ErrorKind::Unauthorized,

            Self::InsufficientPermissions
            | Self::NotResourceOwner
            | Self::AccountSuspended { .. }
            | Self::AccountNotConfirmed
            | Self::ProtectedAccount => ErrorKind::Forbidden,

            Self::IncorrectOldPassword | Self::Validation(_) => ErrorKind::Validation,

            Self::Storage(_)
            | Self::Hashing(_)
            | Self::Signing(_)
            | Self::TokenGeneration(_)
            | Self::Configuration(_)
            | Self::EmailDelivery(_)
            | Self::Media(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status code used in the response envelope.
    ///
    /// Mostly follows [`ErrorKind`], except where deployed clients already
    /// depend on a different code: confirmation-token failures and rejected
    /// federated assertions answer 400.
    ///
    /// # Examples
    ///
    /// ```
    /// # use warden_identity::AuthError;
    /// assert_eq!(AuthError::AccountAlreadyConfirmed.status_code(), 400);
    /// assert_eq!(AuthError::ConfirmationNotNeeded.status_code(), 409);
    /// assert_eq!(AuthError::EmailInUse.status_code(), 409);
    /// ```
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::AccountAlreadyConfirmed
            | Self::InvalidConfirmationToken
            | Self::InvalidFederatedAssertion => 400,
            _ => match self.kind() {
                ErrorKind::NotFound => 404,
                ErrorKind::Conflict => 409,
                ErrorKind::Unauthorized => 401,
                ErrorKind::Forbidden => 403,
                ErrorKind::Validation => 400,
                ErrorKind::Internal => 500,
            },
        }
    }

    /// Message safe to send to a client.
    ///
    /// Internal errors never expose their diagnostic detail.
    #[must_use]
    pub fn client_message(&self) -> String {
        if self.kind() == ErrorKind::Internal {
            "Internal server error.".to_string()
        } else {
            self.to_string()
        }
    }

    /// Returns `true` if this error is due to invalid user input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use warden_identity::AuthError;
    /// assert!(AuthError::InvalidCredentials.is_user_error());
    /// assert!(!AuthError::Storage("down".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }

    /// Returns `true` if this error indicates a possible attack.
    ///
    /// # Examples
    ///
    /// ```
    /// # use warden_identity::AuthError;
    /// assert!(AuthError::InvalidRefreshToken.is_security_issue());
    /// assert!(!AuthError::UserNotFound.is_security_issue());
    /// ```
    #[must_use]
    pub const fn is_security_issue(&self) -> bool {
        matches!(
            self,
            Self::InvalidRefreshToken
                | Self::InvalidAccessToken
                | Self::InvalidResetToken
                | Self::InvalidEmailChangeToken
                | Self::InvalidFederatedAssertion
                | Self::LocalAccountExists
                | Self::InsufficientPermissions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_are_masked() {
        let err = AuthError::Storage("connection reset by peer".to_string());
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.client_message(), "Internal server error.");
    }

    #[test]
    fn test_user_errors_keep_their_message() {
        let err = AuthError::DuplicateField { field: "email" };
        assert_eq!(err.client_message(), "A user already exists with the same email.");
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn test_status_codes_follow_kind() {
        assert_eq!(AuthError::UserNotFound.status_code(), 404);
        assert_eq!(AuthError::InvalidCredentials.status_code(), 401);
        assert_eq!(AuthError::AccountNotConfirmed.status_code(), 403);
        assert_eq!(AuthError::InsufficientPermissions.status_code(), 403);
        assert_eq!(AuthError::IncorrectOldPassword.status_code(), 400);
        assert_eq!(AuthError::AlreadyBanned.status_code(), 409);
    }

    #[test]
    fn test_confirmation_failures_answer_bad_request() {
        assert_eq!(AuthError::AccountAlreadyConfirmed.kind(), ErrorKind::Conflict);
        assert_eq!(AuthError::AccountAlreadyConfirmed.status_code(), 400);
        assert_eq!(AuthError::InvalidConfirmationToken.kind(), ErrorKind::Unauthorized);
        assert_eq!(AuthError::InvalidConfirmationToken.status_code(), 400);
    }

    #[test]
    fn test_resend_on_confirmed_account_conflicts() {
        let err = AuthError::ConfirmationNotNeeded;
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.status_code(), 409);
        assert_ne!(err.to_string(), AuthError::AccountAlreadyConfirmed.to_string());
    }

    #[test]
    fn test_suspension_message_names_support() {
        let err = AuthError::AccountSuspended {
            support_email: "help@example.com".to_string(),
        };
        assert!(err.to_string().contains("[help@example.com]"));
    }
}
