//! Profile reads and self-service updates.

use super::IdentityManager;
use crate::commands::UserCommand;
use crate::error::{AuthError, Result};
use crate::password::PasswordHasher;
use crate::providers::{CredentialStore, IdentityVerifier, MediaStore, NotificationDispatcher};
use crate::state::{Avatar, Principal, PublicProfile, UserId, UserProfile};
use crate::tokens::TokenGenerator;
use crate::utils::{is_valid_url, is_valid_username};
use serde::Deserialize;

/// Minimum display-name length on update.
const MIN_NAME_LEN: usize = 4;

/// Self-service account update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New username.
    pub username: Option<String>,
    /// New avatar URL.
    pub avatar_url: Option<String>,
}

impl AccountUpdate {
    /// Trim and validate into a store command.
    fn into_command(self) -> Result<UserCommand> {
        let name = self.name.map(|n| n.trim().to_string());
        let username = self.username.map(|u| u.trim().to_string());
        let avatar_url = self.avatar_url.map(|u| u.trim().to_string());

        if name.is_none() && username.is_none() && avatar_url.is_none() {
            return Err(AuthError::Validation(
                "Invalid update. Please provide required fields to update account.".to_string(),
            ));
        }
        if name.as_ref().is_some_and(|n| n.chars().count() < MIN_NAME_LEN) {
            return Err(AuthError::Validation(
                "Name is required and must be at least 4 characters long.".to_string(),
            ));
        }
        if username.as_deref().is_some_and(|u| !is_valid_username(u)) {
            return Err(AuthError::Validation(
                "Username is invalid. Username must be start with a character.".to_string(),
            ));
        }
        if avatar_url.as_deref().is_some_and(|u| !is_valid_url(u)) {
            return Err(AuthError::Validation(
                "Invalid avatar URL. Please provide a valid http(s) URL.".to_string(),
            ));
        }

        Ok(UserCommand::UpdateProfile {
            name,
            username,
            avatar: avatar_url.map(|url| Avatar { url, asset_id: None }),
        })
    }
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
    /// Fetch the caller's own record.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotResourceOwner`] if `requested_id` is not the caller
    /// - [`AuthError::UserNotFound`] if the record is gone
    /// - [`AuthError::AccountSuspended`] if banned
    pub async fn get_current_user(
        &self,
        requested_id: UserId,
        principal: &Principal,
    ) -> Result<UserProfile> {
        if requested_id != principal.id {
            return Err(AuthError::NotResourceOwner);
        }

        let user = self.load(requested_id).await?;
        if user.is_banned {
            return Err(self.suspended());
        }
        Ok(user.profile())
    }

    /// Fetch anyone's public profile.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UserNotFound`] if unknown
    /// - [`AuthError::AccountSuspended`] if banned
    pub async fn public_profile(&self, user_id: UserId) -> Result<PublicProfile> {
        let user = self.load(user_id).await?;
        if user.is_banned {
            return Err(self.suspended());
        }
        Ok(PublicProfile::from(&user))
    }

    /// Update the caller's name, username, or avatar.
    ///
    /// A replaced avatar's media asset is deleted best-effort after commit.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotResourceOwner`] if `requested_id` is not the caller
    /// - [`AuthError::Validation`] on an empty update or a malformed field
    /// - [`AuthError::DuplicateField`] if the username is taken
    pub async fn update_account_details(
        &self,
        requested_id: UserId,
        principal: &Principal,
        update: AccountUpdate,
    ) -> Result<UserProfile> {
        if requested_id != principal.id {
            return Err(AuthError::NotResourceOwner);
        }

        let command = update.into_command()?;
        let committed = self
            .commit(requested_id, &command, |_| AuthError::ConcurrentModification)
            .await?;

        tracing::info!(user_id = %requested_id, "Account details updated");

        let replaced_asset = committed
            .previous
            .avatar
            .as_ref()
            .filter(|old| committed.current.avatar.as_ref() != Some(*old))
            .and_then(|old| old.asset_id.as_deref());
        if let Some(asset_id) = replaced_asset {
            self.discard_asset(asset_id).await;
        }

        Ok(committed.current.profile())
    }
}
