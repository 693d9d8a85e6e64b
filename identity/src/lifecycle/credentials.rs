//! Password change, forgot-password, and reset.

use super::IdentityManager;
use crate::commands::{Rejection, UserCommand, token_matches};
use crate::error::{AuthError, Result};
use crate::links::{RESET_TOKEN_FIELD, build_link};
use crate::password::PasswordHasher;
use crate::providers::{CredentialStore, IdentityVerifier, MediaStore, NotificationDispatcher};
use crate::state::{Principal, UserId};
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
    /// Change the caller's password.
    ///
    /// Other sessions stay valid; the stored refresh token is untouched.
    ///
    /// # Errors
    ///
    /// - [`AuthError::FederatedAccount`] if the account has no password
    /// - [`AuthError::IncorrectOldPassword`] if `old_password` does not verify
    /// - [`AuthError::ConcurrentModification`] if the password changed meanwhile
    pub async fn change_password(
        &self,
        principal: &Principal,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self.load(principal.id).await?;

        let auth = &user.authentication;
        let Some(current_hash) = auth.password_hash.as_deref().filter(|_| auth.auth_type.is_local())
        else {
            return Err(AuthError::FederatedAccount {
                provider: auth.auth_type.as_str().to_string(),
            });
        };

        if !self.verify_password(old_password, current_hash).await? {
            tracing::warn!(user_id = %user.id, "Password change rejected: wrong old password");
            return Err(AuthError::IncorrectOldPassword);
        }

        let new_hash = self.hash_password(new_password).await?;
        self.commit(
            user.id,
            &UserCommand::ChangePassword {
                expected_hash: current_hash.to_string(),
                new_hash,
            },
            |_| AuthError::ConcurrentModification,
        )
        .await?;

        tracing::info!(user_id = %user.id, "Password changed");
        self.notify(&user.email, templates::password_changed(&user.username))
            .await;
        Ok(())
    }

    /// Start a password reset.
    ///
    /// Succeeds identically for unknown addresses and for federated accounts
    /// (no token is stored, no email is sent), so the response never reveals
    /// whether or how an account exists.
    ///
    /// # Errors
    ///
    /// Only internal errors (token generation, storage).
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let Some(user) = self.env.store.find_by_email(email).await? else {
            tracing::debug!("Password reset for unknown address; masked");
            return Ok(());
        };

        let token = self.new_token()?;
        let result = self
            .commit(
                user.id,
                &UserCommand::IssueResetToken {
                    token: token.clone(),
                },
                |_| AuthError::InvalidResetToken,
            )
            .await;

        match result {
            Ok(_) => {}
            Err(AuthError::InvalidResetToken | AuthError::UserNotFound) => {
                tracing::debug!(user_id = %user.id, "Password reset not applicable; masked");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        tracing::info!(user_id = %user.id, "Password reset requested");

        let link = build_link(
            &self.config.reset_password_url(),
            user.id,
            RESET_TOKEN_FIELD,
            &token,
        );
        let email = templates::password_reset(&self.config.project_name, &user.name, &link);
        self.notify(&user.email, email).await;
        Ok(())
    }

    /// Complete a password reset with the emailed token.
    ///
    /// The token is cleared in the same atomic step that replaces the hash,
    /// so it cannot be redeemed twice.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UserNotFound`] if `user_id` is unknown
    /// - [`AuthError::InvalidResetToken`] if the token does not match (or was
    ///   already used), or the account is federated
    pub async fn reset_password(
        &self,
        user_id: UserId,
        token: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self.load(user_id).await?;

        // Cheap pre-check so a bad token never costs a hash.
        if !user.authentication.auth_type.is_local()
            || !token_matches(user.authentication.reset_password_token.as_deref(), token)
        {
            tracing::warn!(user_id = %user_id, "Reset token rejected");
            return Err(AuthError::InvalidResetToken);
        }

        let new_hash = self.hash_password(new_password).await?;
        self.commit(
            user_id,
            &UserCommand::ResetPassword {
                token: token.to_string(),
                new_hash,
            },
            |rejection| {
                if rejection != Rejection::TokenMismatch {
                    tracing::debug!(rejection = ?rejection, "Reset rejected");
                }
                AuthError::InvalidResetToken
            },
        )
        .await?;

        tracing::info!(user_id = %user_id, "Password reset");
        metrics::counter!("identity.tokens.redeemed", "flow" => "reset_password").increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::AuthError;
    use crate::lifecycle::tests::{confirmed_user, harness};
    use crate::state::{Principal, Role};

    #[tokio::test]
    async fn test_change_password_requires_old_password() {
        let h = harness();
        let id = confirmed_user(&h, "ann1", "ann@x.com").await;
        let principal = Principal { id, role: Role::User };

        assert_eq!(
            h.manager.change_password(&principal, "nope", "newsecret").await,
            Err(AuthError::IncorrectOldPassword)
        );

        h.notifier.clear();
        h.manager
            .change_password(&principal, "secret12", "newsecret")
            .await
            .unwrap();

        assert!(h.manager.login("ann1", "newsecret", None).await.is_ok());
        assert_eq!(
            h.manager.login("ann1", "secret12", None).await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(h.notifier.sent_to("ann@x.com")[0].subject, "Password changed");
    }

    #[tokio::test]
    async fn test_change_password_keeps_other_sessions() {
        let h = harness();
        let id = confirmed_user(&h, "ann1", "ann@x.com").await;
        let session = h.manager.login("ann1", "secret12", None).await.unwrap();

        h.manager
            .change_password(&Principal { id, role: Role::User }, "secret12", "newsecret")
            .await
            .unwrap();

        assert!(h.manager.refresh(id, &session.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_flow() {
        let h = harness();
        let id = confirmed_user(&h, "ann1", "ann@x.com").await;

        h.manager.forgot_password("ann@x.com").await.unwrap();
        let email = h.notifier.last_to("ann@x.com").unwrap();
        assert_eq!(email.subject, "Warden Password Reset");
        let token = email.link_param("resetPasswordToken").unwrap();

        assert_eq!(
            h.manager.reset_password(id, "wrong", "newsecret").await,
            Err(AuthError::InvalidResetToken)
        );
        h.manager.reset_password(id, &token, "newsecret").await.unwrap();
        assert!(h.manager.login("ann1", "newsecret", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_forgot_password_on_federated_account_is_masked() {
        let h = harness();
        let session = h.manager.social_login("google-ann").await.unwrap();
        h.notifier.clear();

        assert_eq!(h.manager.forgot_password(&session.user.email).await, Ok(()));
        assert!(h.notifier.sent().is_empty());
        assert_eq!(
            h.manager.reset_password(session.user.id, "", "newsecret").await,
            Err(AuthError::InvalidResetToken)
        );
    }
}
