//! Registration and account confirmation.

use super::IdentityManager;
use crate::commands::{Rejection, UserCommand};
use crate::error::{AuthError, Result};
use crate::links::{CONFIRMATION_TOKEN_FIELD, build_link};
use crate::password::PasswordHasher;
use crate::providers::{CredentialStore, IdentityVerifier, MediaStore, NotificationDispatcher};
use crate::state::{Authentication, User, UserId, UserProfile};
use crate::templates;
use crate::tokens::TokenGenerator;
use serde::{Deserialize, Serialize};

/// Registration input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Result of a registration.
///
/// The confirmation token is returned as well as emailed. Transports should
/// think twice before echoing it to the client: whoever holds it can confirm
/// the address without access to the inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    /// Sanitized record.
    pub user: UserProfile,
    /// Confirmation token that was emailed.
    pub confirmation_token: String,
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
    /// Register a local password account.
    ///
    /// The record is created unconfirmed with its confirmation token in one
    /// insert; the confirmation email goes out afterwards.
    ///
    /// # Errors
    ///
    /// - [`AuthError::DuplicateField`] if the email or username is taken
    ///   (nothing is written, nothing is sent)
    /// - Internal errors from hashing, token generation, or the store
    pub async fn register(&self, registration: Registration) -> Result<RegisteredUser> {
        let Registration {
            name,
            username,
            email,
            password,
        } = registration;

        // Fail fast before paying for a hash; the insert below is the real check.
        if self.env.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateField { field: "email" });
        }
        if self.env.store.find_by_username(&username).await?.is_some() {
            return Err(AuthError::DuplicateField { field: "username" });
        }

        let password_hash = self.hash_password(&password).await?;
        let token = self.new_token()?;

        let mut user = User::new(name, username, email, Authentication::local(password_hash));
        user.authentication.confirmation_token = Some(token.clone());

        let user = self.env.store.create_user(user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        metrics::counter!("identity.registrations").increment(1);

        self.send_confirmation(&user, &token).await;

        Ok(RegisteredUser {
            user: user.profile(),
            confirmation_token: token,
        })
    }

    /// Issue a fresh confirmation token and resend the email.
    ///
    /// Unknown addresses succeed silently so the response never reveals
    /// whether an account exists.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ConfirmationNotNeeded`] if the account is confirmed
    /// - Internal errors from token generation or the store
    pub async fn resend_confirmation(&self, email: &str) -> Result<()> {
        let Some(user) = self.env.store.find_by_email(email).await? else {
            tracing::debug!("Resend confirmation for unknown address; masked");
            return Ok(());
        };

        if user.authentication.is_account_confirmed {
            return Err(AuthError::ConfirmationNotNeeded);
        }

        let token = self.new_token()?;
        let committed = match self
            .commit(
                user.id,
                &UserCommand::IssueConfirmationToken {
                    token: token.clone(),
                },
                |_| AuthError::ConfirmationNotNeeded,
            )
            .await
        {
            Ok(committed) => committed,
            // Deleted between lookup and update: same answer as a miss.
            Err(AuthError::UserNotFound) => return Ok(()),
            Err(e) => return Err(e),
        };

        tracing::info!(user_id = %user.id, "Confirmation token reissued");
        self.send_confirmation(&committed.current, &token).await;
        Ok(())
    }

    /// Confirm an account with its emailed token.
    ///
    /// One-way: sets the confirmed flag and clears the token atomically, so
    /// of two concurrent confirmations with the same token only one succeeds.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UserNotFound`] if `user_id` is unknown
    /// - [`AuthError::AccountAlreadyConfirmed`] if already confirmed
    /// - [`AuthError::InvalidConfirmationToken`] if the token does not match
    pub async fn confirm_account(&self, user_id: UserId, token: &str) -> Result<UserProfile> {
        let result = self
            .commit(
                user_id,
                &UserCommand::ConfirmAccount {
                    token: token.to_string(),
                },
                |rejection| match rejection {
                    Rejection::AlreadyConfirmed => AuthError::AccountAlreadyConfirmed,
                    _ => AuthError::InvalidConfirmationToken,
                },
            )
            .await;

        match result {
            Ok(committed) => {
                tracing::info!(user_id = %user_id, "Account confirmed");
                metrics::counter!("identity.tokens.redeemed", "flow" => "confirm_account")
                    .increment(1);
                Ok(committed.current.profile())
            }
            Err(e) => {
                if e == AuthError::InvalidConfirmationToken {
                    tracing::warn!(user_id = %user_id, "Confirmation token rejected");
                }
                Err(e)
            }
        }
    }

    async fn send_confirmation(&self, user: &User, token: &str) {
        let link = build_link(
            &self.config.confirm_account_url(),
            user.id,
            CONFIRMATION_TOKEN_FIELD,
            token,
        );
        let email = templates::account_confirmation(&self.config.project_name, &user.name, &link);
        self.notify(&user.email, email).await;
    }
}
