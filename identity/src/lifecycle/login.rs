//! Password login, federated login, refresh rotation, and access checks.

use super::IdentityManager;
use crate::commands::UserCommand;
use crate::error::{AuthError, Result};
use crate::password::PasswordHasher;
use crate::providers::{CredentialStore, IdentityVerifier, MediaStore, NotificationDispatcher};
use crate::state::{Authentication, Principal, Role, TokenPair, User, UserId, UserProfile};
use crate::templates;
use crate::tokens::TokenGenerator;
use crate::utils::{parse_device_name, social_username};
use chrono::Utc;
use serde::Serialize;

/// Attempts at picking a free username for a new federated account.
const SOCIAL_USERNAME_ATTEMPTS: i64 = 3;

/// A freshly opened session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSession {
    /// Sanitized record (no hash, tokens, or ban flag).
    pub user: UserProfile,
    /// Access + refresh pair.
    pub tokens: TokenPair,
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
    /// Log in with username-or-email and password.
    ///
    /// On success the new refresh token replaces any previous one, and a
    /// "new login" notice naming the device goes to the account's email.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UserNotFound`] if no account matches `identifier`
    /// - [`AuthError::FederatedAccount`] if the account has no password
    /// - [`AuthError::InvalidCredentials`] on a wrong password
    /// - [`AuthError::AccountSuspended`] if banned
    /// - [`AuthError::AccountNotConfirmed`] if unconfirmed
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        user_agent: Option<&str>,
    ) -> Result<LoginSession> {
        let user = self
            .env
            .store
            .find_by_identifier(identifier)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let auth = &user.authentication;
        let Some(digest) = auth.password_hash.as_deref().filter(|_| auth.auth_type.is_local()) else {
            return Err(AuthError::FederatedAccount {
                provider: auth.auth_type.as_str().to_string(),
            });
        };

        if !self.verify_password(password, digest).await? {
            tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
            metrics::counter!("identity.logins", "outcome" => "bad_password").increment(1);
            return Err(AuthError::InvalidCredentials);
        }

        if user.is_banned {
            metrics::counter!("identity.logins", "outcome" => "banned").increment(1);
            return Err(self.suspended());
        }
        if !auth.is_account_confirmed {
            metrics::counter!("identity.logins", "outcome" => "unconfirmed").increment(1);
            return Err(AuthError::AccountNotConfirmed);
        }

        let session = self.open_session(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        metrics::counter!("identity.logins", "outcome" => "success").increment(1);

        let device = parse_device_name(user_agent.unwrap_or_default());
        let notice = templates::new_login(&user.username, Utc::now(), device);
        self.notify(&user.email, notice).await;

        Ok(session)
    }

    /// Log in (or sign up) with an external identity assertion.
    ///
    /// The verifier's claims are trusted as-is. A first login creates a
    /// pre-confirmed, password-less account. Any existing federated account
    /// with the same email is logged in, whichever provider asserted it.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidFederatedAssertion`] if the verifier rejects the assertion
    /// - [`AuthError::LocalAccountExists`] if the email belongs to a password account
    /// - [`AuthError::AccountSuspended`] if the federated account is banned
    pub async fn social_login(&self, assertion: &str) -> Result<LoginSession> {
        let identity = self.env.verifier.verify(assertion).await?;

        if let Some(existing) = self.env.store.find_by_email(&identity.email).await? {
            return self.resume_federated(existing).await;
        }

        for attempt in 0..SOCIAL_USERNAME_ATTEMPTS {
            let username = social_username(&identity.name, Utc::now().timestamp_millis() + attempt);
            let mut user = User::new(
                identity.name.clone(),
                username,
                identity.email.clone(),
                Authentication::federated(identity.provider),
            );
            let tokens = self.sessions.mint_pair(user.id, user.authentication.role)?;
            user.authentication.refresh_token = Some(tokens.refresh_token.clone());

            match self.env.store.create_user(user).await {
                Ok(user) => {
                    tracing::info!(
                        user_id = %user.id,
                        provider = identity.provider.as_str(),
                        "Federated account created"
                    );
                    metrics::counter!("identity.logins", "outcome" => "social_signup").increment(1);
                    return Ok(LoginSession {
                        user: user.profile(),
                        tokens,
                    });
                }
                // Lost a race with a concurrent first login for the same email.
                Err(AuthError::DuplicateField { field: "email" }) => {
                    let winner = self
                        .env
                        .store
                        .find_by_email(&identity.email)
                        .await?
                        .ok_or(AuthError::ConcurrentModification)?;
                    return self.resume_federated(winner).await;
                }
                Err(AuthError::DuplicateField { field: "username" }) => {}
                Err(e) => return Err(e),
            }
        }

        Err(AuthError::ConcurrentModification)
    }

    /// Rotate a session.
    ///
    /// The presented token must verify and must equal the single stored
    /// refresh token; the replacement overwrites it atomically, so the
    /// presented token is dead afterwards. Ban status is not consulted.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidRefreshToken`] on a bad signature, expiry,
    ///   subject mismatch, or a token that has already been rotated away
    /// - [`AuthError::UserNotFound`] if the account no longer exists
    pub async fn refresh(&self, user_id: UserId, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.sessions.verify_refresh(refresh_token)?;
        if claims.sub != user_id.to_string() {
            tracing::warn!(user_id = %user_id, "Refresh token subject mismatch");
            return Err(AuthError::InvalidRefreshToken);
        }

        let user = self.load(user_id).await?;
        let tokens = self.sessions.mint_pair(user.id, user.authentication.role)?;

        self.commit(
            user_id,
            &UserCommand::RotateRefreshToken {
                presented: refresh_token.to_string(),
                replacement: tokens.refresh_token.clone(),
            },
            |_| AuthError::InvalidRefreshToken,
        )
        .await
        .inspect_err(|e| {
            if *e == AuthError::InvalidRefreshToken {
                tracing::warn!(user_id = %user_id, "Stale refresh token presented");
            }
        })?;

        tracing::info!(user_id = %user_id, "Session rotated");
        metrics::counter!("identity.tokens.redeemed", "flow" => "refresh").increment(1);
        Ok(tokens)
    }

    /// Verify an access token and return the caller.
    ///
    /// Stateless: a token minted before a ban keeps working until it expires.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidAccessToken`] on a bad or expired token
    /// - [`AuthError::InsufficientPermissions`] if `required_role` is not met
    pub fn authenticate(&self, access_token: &str, required_role: Option<Role>) -> Result<Principal> {
        self.sessions.verify_access(access_token, required_role)
    }

    async fn resume_federated(&self, user: User) -> Result<LoginSession> {
        if user.authentication.auth_type.is_local() {
            tracing::warn!(user_id = %user.id, "Federated login refused for password account");
            return Err(AuthError::LocalAccountExists);
        }
        if user.is_banned {
            return Err(self.suspended());
        }

        let session = self.open_session(&user).await?;
        tracing::info!(user_id = %user.id, "Federated login");
        metrics::counter!("identity.logins", "outcome" => "social").increment(1);
        Ok(session)
    }

    /// Mint a pair and store its refresh token, replacing the previous one.
    async fn open_session(&self, user: &User) -> Result<LoginSession> {
        let tokens = self.sessions.mint_pair(user.id, user.authentication.role)?;
        let committed = self
            .commit(
                user.id,
                &UserCommand::StoreRefreshToken {
                    token: tokens.refresh_token.clone(),
                },
                |_| AuthError::ConcurrentModification,
            )
            .await?;

        Ok(LoginSession {
            user: committed.current.profile(),
            tokens,
        })
    }

    pub(super) fn suspended(&self) -> AuthError {
        AuthError::AccountSuspended {
            support_email: self.config.support_email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::{UpdateOutcome, UserCommand};
    use crate::error::{AuthError, Result};
    use crate::lifecycle::tests::{confirmed_user, harness, manager_over, registration};
    use crate::mocks::{RecordingDispatcher, RecordingMediaStore};
    use crate::providers::CredentialStore;
    use crate::state::{AuthType, Authentication, IdentityProvider, Role, User, UserId};
    use crate::stores::InMemoryCredentialStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store whose first email lookup misses, as if a concurrent first
    /// login committed right after it.
    struct StaleFirstLookup {
        inner: InMemoryCredentialStore,
        stale: AtomicBool,
    }

    impl CredentialStore for StaleFirstLookup {
        async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
            if self.stale.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_by_email(email).await
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
            self.inner.find_by_username(username).await
        }

        async fn create_user(&self, user: User) -> Result<User> {
            self.inner.create_user(user).await
        }

        async fn update_if_match(&self, id: UserId, command: &UserCommand) -> Result<UpdateOutcome> {
            self.inner.update_if_match(id, command).await
        }

        async fn delete_if_role(&self, id: UserId, required_role: Role) -> Result<Option<User>> {
            self.inner.delete_if_role(id, required_role).await
        }
    }

    #[tokio::test]
    async fn test_login_before_confirmation_is_forbidden() {
        let h = harness();
        h.manager.register(registration("ann1", "ann@x.com")).await.unwrap();

        let wrong = h.manager.login("ann1", "wrong-password", None).await;
        assert_eq!(wrong.map(|_| ()).map_err(|e| e.status_code()), Err(401));

        let right = h.manager.login("ann1", "secret12", None).await;
        assert_eq!(right, Err(AuthError::AccountNotConfirmed));
        assert_eq!(AuthError::AccountNotConfirmed.status_code(), 403);
    }

    #[tokio::test]
    async fn test_login_by_email_or_username() {
        let h = harness();
        confirmed_user(&h, "ann1", "ann@x.com").await;

        assert!(h.manager.login("ann1", "secret12", None).await.is_ok());
        assert!(h.manager.login("ann@x.com", "secret12", None).await.is_ok());
        assert_eq!(
            h.manager.login("nobody", "secret12", None).await,
            Err(AuthError::UserNotFound)
        );
    }

    #[tokio::test]
    async fn test_login_sends_device_notice() {
        let h = harness();
        confirmed_user(&h, "ann1", "ann@x.com").await;
        h.notifier.clear();

        h.manager
            .login("ann1", "secret12", Some("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"))
            .await
            .unwrap();

        let notice = h.notifier.last_to("ann@x.com").unwrap();
        assert_eq!(notice.subject, "New login detected");
        assert!(notice.html.contains("Mobile Browser"));
    }

    #[tokio::test]
    async fn test_login_token_carries_role() {
        let h = harness();
        confirmed_user(&h, "ann1", "ann@x.com").await;
        let session = h.manager.login("ann1", "secret12", None).await.unwrap();

        let principal = h
            .manager
            .authenticate(&session.tokens.access_token, Some(Role::User))
            .unwrap();
        assert_eq!(principal.id, session.user.id);
        assert_eq!(
            h.manager.authenticate(&session.tokens.access_token, Some(Role::Admin)),
            Err(AuthError::InsufficientPermissions)
        );
    }

    #[tokio::test]
    async fn test_social_login_creates_confirmed_account() {
        let h = harness();
        let session = h.manager.social_login("google-ann").await.unwrap();

        assert!(session.user.is_account_confirmed);
        assert_eq!(session.user.auth_type, AuthType::Federated(IdentityProvider::Google));
        assert!(session.user.username.starts_with("annlee"));

        // Second login reuses the record.
        let again = h.manager.social_login("google-ann").await.unwrap();
        assert_eq!(again.user.id, session.user.id);
    }

    #[tokio::test]
    async fn test_social_login_cannot_take_over_password_account() {
        let h = harness();
        confirmed_user(&h, "ann1", "ann.lee@x.com").await;

        assert_eq!(
            h.manager.social_login("google-ann").await,
            Err(AuthError::LocalAccountExists)
        );
    }

    #[tokio::test]
    async fn test_password_login_on_federated_account_names_provider() {
        let h = harness();
        let session = h.manager.social_login("google-ann").await.unwrap();

        let result = h.manager.login(&session.user.email, "anything", None).await;
        assert_eq!(
            result,
            Err(AuthError::FederatedAccount {
                provider: "google".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_assertion_rejected() {
        let h = harness();
        assert_eq!(
            h.manager.social_login("forged").await,
            Err(AuthError::InvalidFederatedAssertion)
        );
    }

    #[tokio::test]
    async fn test_refresh_rejects_other_users_token() {
        let h = harness();
        let ann = confirmed_user(&h, "ann1", "ann@x.com").await;
        let bob = confirmed_user(&h, "bob1", "bob@x.com").await;
        let session = h.manager.login("ann1", "secret12", None).await.unwrap();

        assert_eq!(
            h.manager.refresh(bob, &session.tokens.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        );
        assert!(h.manager.refresh(ann, &session.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_social_login_resumes_account_created_concurrently() {
        let inner = InMemoryCredentialStore::new();
        let winner = inner
            .create_user(User::new(
                "Ann Lee".to_string(),
                "annlee1".to_string(),
                "ann.lee@x.com".to_string(),
                Authentication::federated(IdentityProvider::Google),
            ))
            .await
            .unwrap();
        let store = StaleFirstLookup {
            inner: inner.clone(),
            stale: AtomicBool::new(true),
        };
        let manager = manager_over(store, RecordingDispatcher::new(), RecordingMediaStore::new());

        let session = manager.social_login("google-ann").await.unwrap();

        assert_eq!(session.user.id, winner.id);
        assert_eq!(inner.len().unwrap(), 1);
        let stored = inner.find_by_id(winner.id).await.unwrap().unwrap();
        assert_eq!(
            stored.authentication.refresh_token.as_deref(),
            Some(session.tokens.refresh_token.as_str())
        );
    }
}
