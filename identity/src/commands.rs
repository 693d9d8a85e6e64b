//! Atomic per-flow update commands.
//!
//! Every mutation of an existing user record is expressed as a [`UserCommand`].
//! A command bundles the guard ("the record still looks the way this flow
//! expects") with the new values, so a store can evaluate and apply it in a
//! single atomic step:
//!
//! ```text
//! lock(record) → guard(record)? → mutate(record) → enforce unique email/username → unlock
//! ```
//!
//! Two concurrent redemptions of the same single-use token therefore cannot
//! both succeed: the second one sees the token already cleared.
//!
//! Token comparisons use `constant_time_eq`.

use crate::state::{Avatar, User};
use chrono::{DateTime, Utc};

/// A single atomic mutation of one user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Overwrite the confirmation token. Guard: not yet confirmed.
    IssueConfirmationToken {
        /// New token.
        token: String,
    },

    /// Confirm the account. Guard: not yet confirmed and token matches.
    ///
    /// Sets `is_account_confirmed` and clears the token.
    ConfirmAccount {
        /// Presented token.
        token: String,
    },

    /// Overwrite the refresh token unconditionally (new login).
    StoreRefreshToken {
        /// New refresh token.
        token: String,
    },

    /// Replace the refresh token. Guard: stored token equals `presented`.
    RotateRefreshToken {
        /// Token the caller presented.
        presented: String,
        /// Token that replaces it.
        replacement: String,
    },

    /// Replace the password hash. Guard: local account and hash unchanged
    /// since the caller verified the old password.
    ChangePassword {
        /// Hash the caller verified against.
        expected_hash: String,
        /// New hash.
        new_hash: String,
    },

    /// Overwrite the reset token. Guard: local account.
    IssueResetToken {
        /// New token.
        token: String,
    },

    /// Replace the password and clear the reset token.
    /// Guard: local account and reset token matches.
    ResetPassword {
        /// Presented token.
        token: String,
        /// New hash.
        new_hash: String,
    },

    /// Store a candidate email and its confirmation token.
    RequestEmailChange {
        /// Candidate email.
        pending_email: String,
        /// New token.
        token: String,
    },

    /// Promote the pending email and clear the pending state.
    /// Guard: a change is pending and the token matches.
    ConfirmEmailChange {
        /// Presented token.
        token: String,
    },

    /// Flip the ban flag. Guard: the flag differs from `banned`.
    SetBanStatus {
        /// Target state.
        banned: bool,
    },

    /// Update self-service profile fields. `None` leaves a field unchanged.
    UpdateProfile {
        /// New display name.
        name: Option<String>,
        /// New username.
        username: Option<String>,
        /// New avatar.
        avatar: Option<Avatar>,
    },
}

/// Why a command's guard refused to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The presented token does not match the stored one (or none is stored).
    TokenMismatch,
    /// The account is already confirmed.
    AlreadyConfirmed,
    /// The ban flag is already in the requested state.
    StatusUnchanged,
    /// The password hash changed since it was read.
    CredentialChanged,
    /// The operation needs a local password account.
    NotLocalAccount,
}

/// Outcome of a conditional update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The guard held and the mutation was committed.
    Applied {
        /// Record before the mutation.
        previous: Box<User>,
        /// Record after the mutation.
        current: Box<User>,
    },
    /// The guard failed; nothing was written.
    Rejected(Rejection),
}

impl UserCommand {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IssueConfirmationToken { .. } => "issue_confirmation_token",
            Self::ConfirmAccount { .. } => "confirm_account",
            Self::StoreRefreshToken { .. } => "store_refresh_token",
            Self::RotateRefreshToken { .. } => "rotate_refresh_token",
            Self::ChangePassword { .. } => "change_password",
            Self::IssueResetToken { .. } => "issue_reset_token",
            Self::ResetPassword { .. } => "reset_password",
            Self::RequestEmailChange { .. } => "request_email_change",
            Self::ConfirmEmailChange { .. } => "confirm_email_change",
            Self::SetBanStatus { .. } => "set_ban_status",
            Self::UpdateProfile { .. } => "update_profile",
        }
    }

    /// Evaluate the guard against `user` and, if it holds, mutate `user`.
    ///
    /// Stores call this while holding whatever lock makes the
    /// read-check-write sequence atomic. On rejection `user` is untouched.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] describing which guard failed.
    pub fn apply(&self, user: &mut User, now: DateTime<Utc>) -> Result<(), Rejection> {
        let auth = &mut user.authentication;

        match self {
            Self::IssueConfirmationToken { token } => {
                if auth.is_account_confirmed {
                    return Err(Rejection::AlreadyConfirmed);
                }
                auth.confirmation_token = Some(token.clone());
            }

            Self::ConfirmAccount { token } => {
                if auth.is_account_confirmed {
                    return Err(Rejection::AlreadyConfirmed);
                }
                if !token_matches(auth.confirmation_token.as_deref(), token) {
                    return Err(Rejection::TokenMismatch);
                }
                auth.is_account_confirmed = true;
                auth.confirmation_token = None;
            }

            Self::StoreRefreshToken { token } => {
                auth.refresh_token = Some(token.clone());
            }

            Self::RotateRefreshToken {
                presented,
                replacement,
            } => {
                if !token_matches(auth.refresh_token.as_deref(), presented) {
                    return Err(Rejection::TokenMismatch);
                }
                auth.refresh_token = Some(replacement.clone());
            }

            Self::ChangePassword {
                expected_hash,
                new_hash,
            } => {
                if !auth.auth_type.is_local() {
                    return Err(Rejection::NotLocalAccount);
                }
                if !token_matches(auth.password_hash.as_deref(), expected_hash) {
                    return Err(Rejection::CredentialChanged);
                }
                auth.password_hash = Some(new_hash.clone());
            }

            Self::IssueResetToken { token } => {
                if !auth.auth_type.is_local() {
                    return Err(Rejection::NotLocalAccount);
                }
                auth.reset_password_token = Some(token.clone());
            }

            Self::ResetPassword { token, new_hash } => {
                if !auth.auth_type.is_local() {
                    return Err(Rejection::NotLocalAccount);
                }
                if !token_matches(auth.reset_password_token.as_deref(), token) {
                    return Err(Rejection::TokenMismatch);
                }
                auth.password_hash = Some(new_hash.clone());
                auth.reset_password_token = None;
            }

            Self::RequestEmailChange {
                pending_email,
                token,
            } => {
                auth.pending_email = Some(pending_email.clone());
                auth.change_email_token = Some(token.clone());
            }

            Self::ConfirmEmailChange { token } => {
                let pending = auth
                    .pending_email
                    .as_deref()
                    .map(str::trim)
                    .filter(|email| !email.is_empty())
                    .map(str::to_string);
                let Some(pending) = pending else {
                    return Err(Rejection::TokenMismatch);
                };
                if !token_matches(auth.change_email_token.as_deref(), token) {
                    return Err(Rejection::TokenMismatch);
                }
                auth.pending_email = None;
                auth.change_email_token = None;
                user.email = pending;
            }

            Self::SetBanStatus { banned } => {
                if user.is_banned == *banned {
                    return Err(Rejection::StatusUnchanged);
                }
                user.is_banned = *banned;
            }

            Self::UpdateProfile {
                name,
                username,
                avatar,
            } => {
                if let Some(name) = name {
                    user.name.clone_from(name);
                }
                if let Some(username) = username {
                    user.username.clone_from(username);
                }
                if let Some(avatar) = avatar {
                    user.avatar = Some(avatar.clone());
                }
            }
        }

        user.updated_at = now;
        Ok(())
    }
}

/// Constant-time comparison of a stored single-use token with a presented one.
///
/// An absent or empty stored token never matches.
#[must_use]
pub fn token_matches(stored: Option<&str>, presented: &str) -> bool {
    match stored {
        Some(stored) if !stored.is_empty() => {
            constant_time_eq::constant_time_eq(stored.as_bytes(), presented.as_bytes())
        }
        _ => false,
    }
}
