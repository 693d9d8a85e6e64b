//! Two-phase email change.
//!
//! The candidate address sits in `pending_email` until its owner clicks the
//! link sent to it. The live address changes only at confirmation, and the
//! old address is told about it afterwards.

use super::IdentityManager;
use crate::commands::UserCommand;
use crate::error::{AuthError, Result};
use crate::links::{CONFIRMATION_TOKEN_FIELD, build_link};
use crate::password::PasswordHasher;
use crate::providers::{CredentialStore, IdentityVerifier, MediaStore, NotificationDispatcher};
use crate::state::{Principal, UserId, UserProfile};
use crate::templates;
use crate::tokens::TokenGenerator;

impl<S, N, V, M, T, H> IdentityManager<S, N, V, M, T, H>
where
    S: CredentialStore,
    N: NotificationDispatcher,
    V: IdentityVerifier,
    M: MediaStore,
    T: TokenGenerator,
    H: PasswordHasher + Clone + 'static,
{
    /// Request a change of the caller's email address.
    ///
    /// # Errors
    ///
    /// - [`AuthError::EmailInUse`] if `new_email` belongs to any account
    ///   (no token is generated, no email is sent)
    /// - [`AuthError::FederatedAccount`] if the account has no password
    /// - [`AuthError::IncorrectPassword`] if `password` does not verify
    pub async fn request_email_change(
        &self,
        principal: &Principal,
        new_email: &str,
        password: &str,
    ) -> Result<()> {
        if self.env.store.find_by_email(new_email).await?.is_some() {
            return Err(AuthError::EmailInUse);
        }

        let user = self.load(principal.id).await?;
        let auth = &user.authentication;
        let Some(digest) = auth.password_hash.as_deref().filter(|_| auth.auth_type.is_local()) else {
            return Err(AuthError::FederatedAccount {
                provider: auth.auth_type.as_str().to_string(),
            });
        };
        if !self.verify_password(password, digest).await? {
            tracing::warn!(user_id = %user.id, "Email change rejected: wrong password");
            return Err(AuthError::IncorrectPassword);
        }

        let token = self.new_token()?;
        self.commit(
            user.id,
            &UserCommand::RequestEmailChange {
                pending_email: new_email.to_string(),
                token: token.clone(),
            },
            |_| AuthError::ConcurrentModification,
        )
        .await?;

        tracing::info!(user_id = %user.id, "Email change requested");

        let link = build_link(
            &self.config.confirm_email_change_url(),
            user.id,
            CONFIRMATION_TOKEN_FIELD,
            &token,
        );
        let email =
            templates::email_change_confirmation(&self.config.project_name, &user.name, &link);
        self.notify(new_email, email).await;
        Ok(())
    }

    /// Confirm a pending email change with the token sent to the new address.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UserNotFound`] if `user_id` is unknown
    /// - [`AuthError::InvalidEmailChangeToken`] if nothing is pending or the
    ///   token does not match
    /// - [`AuthError::EmailInUse`] if another account took the address meanwhile
    pub async fn confirm_email_change(&self, user_id: UserId, token: &str) -> Result<UserProfile> {
        let committed = self
            .commit(
                user_id,
                &UserCommand::ConfirmEmailChange {
                    token: token.to_string(),
                },
                |_| AuthError::InvalidEmailChangeToken,
            )
            .await
            .inspect_err(|e| {
                if *e == AuthError::InvalidEmailChangeToken {
                    tracing::warn!(user_id = %user_id, "Email change token rejected");
                }
            })?;

        tracing::info!(user_id = %user_id, "Email changed");
        metrics::counter!("identity.tokens.redeemed", "flow" => "confirm_email_change")
            .increment(1);

        self.notify(
            &committed.previous.email,
            templates::email_changed(&committed.current.name),
        )
        .await;

        Ok(committed.current.profile())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::AuthError;
    use crate::lifecycle::tests::{confirmed_user, harness};
    use crate::state::{Principal, Role};

    #[tokio::test]
    async fn test_email_change_round_trip() {
        let h = harness();
        let id = confirmed_user(&h, "ann1", "ann@x.com").await;
        let principal = Principal { id, role: Role::User };

        h.manager
            .request_email_change(&principal, "ann@new.com", "secret12")
            .await
            .unwrap();

        // Live email unchanged until confirmation.
        let current = h.manager.get_current_user(id, &principal).await.unwrap();
        assert_eq!(current.email, "ann@x.com");

        let token = h
            .notifier
            .last_to("ann@new.com")
            .and_then(|e| e.link_param("confirmationToken"))
            .unwrap();
        let profile = h.manager.confirm_email_change(id, &token).await.unwrap();
        assert_eq!(profile.email, "ann@new.com");

        // Old address is told.
        assert_eq!(h.notifier.last_to("ann@x.com").unwrap().subject, "Email changed");

        // Second confirmation fails.
        assert_eq!(
            h.manager.confirm_email_change(id, &token).await,
            Err(AuthError::InvalidEmailChangeToken)
        );
    }

    #[tokio::test]
    async fn test_email_change_requires_password() {
        let h = harness();
        let id = confirmed_user(&h, "ann1", "ann@x.com").await;
        h.notifier.clear();

        let result = h
            .manager
            .request_email_change(&Principal { id, role: Role::User }, "ann@new.com", "nope")
            .await;

        assert_eq!(result, Err(AuthError::IncorrectPassword));
        assert!(h.notifier.sent().is_empty());
    }
}
