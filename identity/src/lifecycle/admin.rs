//! Administrative status transitions.

use super::IdentityManager;
use crate::commands::UserCommand;
use crate::error::{AuthError, Result};
use crate::password::PasswordHasher;
use crate::providers::{CredentialStore, IdentityVerifier, MediaStore, NotificationDispatcher};
use crate::state::{Role, UserId, UserProfile};
use crate::tokens::TokenGenerator;
use serde::Serialize;

/// Requested ban status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanAction {
    /// Ban the account.
    Ban,
    /// Lift the ban.
    Unban,
}

impl BanAction {
    /// Parse the wire form (`"ban"` / `"unban"`, case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for anything else.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ban" => Ok(Self::Ban),
            "unban" => Ok(Self::Unban),
            _ => Err(AuthError::Validation(
                "Invalid action. Please use 'ban' or 'unban'.".to_string(),
            )),
        }
    }

    /// Past tense, for the response message.
    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Ban => "banned",
            Self::Unban => "unbanned",
        }
    }

    const fn banned(self) -> bool {
        matches!(self, Self::Ban)
    }
}

/// Result of a ban/unban.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    /// Sanitized record after the change.
    pub user: UserProfile,
    /// `"banned"` or `"unbanned"`.
    pub action: &'static str,
}

impl<S, N, V, M, T, H> IdentityManager<S, N, V, M, T, H>
where
    S: CredentialStore,
    N: NotificationDispatcher,
    V: IdentityVerifier,
    M: MediaStore,
    T: TokenGenerator,
    H: PasswordHasher + Clone + 'static,
{
    /// Ban or unban an account.
    ///
    /// Access tokens minted before a ban stay valid until they expire; only
    /// new logins and current-user lookups are blocked.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UserNotFound`] if `user_id` is unknown
    /// - [`AuthError::AlreadyBanned`] / [`AuthError::AlreadyUnbanned`] if the
    ///   account is already in the requested state
    pub async fn set_ban_status(&self, user_id: UserId, action: BanAction) -> Result<StatusChange> {
        let committed = self
            .commit(
                user_id,
                &UserCommand::SetBanStatus {
                    banned: action.banned(),
                },
                |_| match action {
                    BanAction::Ban => AuthError::AlreadyBanned,
                    BanAction::Unban => AuthError::AlreadyUnbanned,
                },
            )
            .await?;

        tracing::info!(user_id = %user_id, action = action.past_tense(), "Account status changed");
        metrics::counter!("identity.status_changes", "action" => action.past_tense()).increment(1);

        Ok(StatusChange {
            user: committed.current.profile(),
            action: action.past_tense(),
        })
    }

    /// Delete a regular (non-admin) account.
    ///
    /// After the record is gone, the avatar asset (if any) is deleted
    /// best-effort: a media failure is logged and does not fail the call.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UserNotFound`] if `user_id` is unknown
    /// - [`AuthError::ProtectedAccount`] if the account is an admin
    pub async fn delete_user(&self, user_id: UserId) -> Result<UserProfile> {
        let user = self
            .env
            .store
            .delete_if_role(user_id, Role::User)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        tracing::info!(user_id = %user_id, "User deleted");
        metrics::counter!("identity.deletions").increment(1);

        if let Some(asset_id) = user.avatar.as_ref().and_then(|a| a.asset_id.as_deref()) {
            self.discard_asset(asset_id).await;
        }

        Ok(user.profile())
    }

    /// Delete a media asset, best-effort.
    pub(super) async fn discard_asset(&self, asset_id: &str) {
        if let Err(e) = self.env.media.delete_asset(asset_id).await {
            tracing::warn!(asset_id = %asset_id, error = %e, "Media cleanup failed");
            metrics::counter!("identity.media_cleanup.failed").increment(1);
        }
    }
}
