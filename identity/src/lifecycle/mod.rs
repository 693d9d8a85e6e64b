//! Identity lifecycle manager.
//!
//! [`IdentityManager`] orchestrates every account-scoped flow:
//!
//! | Flow family     | Operations                                                        |
//! |-----------------|-------------------------------------------------------------------|
//! | `registration`  | register, resend confirmation, confirm account                    |
//! | `login`         | password login, social login, refresh, authenticate               |
//! | `credentials`   | change password, forgot password, reset password                  |
//! | `email_change`  | request and confirm an email change                               |
//! | `admin`         | ban/unban, delete                                                 |
//! | `profile`       | current user, public profile, update account details              |
//!
//! # Commit before notify
//!
//! Every flow commits its state change through a single
//! [`CredentialStore::update_if_match`] (or `create_user`) call and only then
//! dispatches notifications. A dispatch failure is logged and counted, never
//! propagated, and never rolls the commit back. A request abandoned midway
//! leaves the record at its last committed step; every flow can simply be
//! run again.

mod admin;
mod credentials;
mod email_change;
mod login;
mod profile;
mod registration;

pub use admin::{BanAction, StatusChange};
pub use login::LoginSession;
pub use profile::AccountUpdate;
pub use registration::{RegisteredUser, Registration};

use crate::commands::{Rejection, UpdateOutcome, UserCommand};
use crate::config::IdentityConfig;
use crate::environment::IdentityEnvironment;
use crate::error::{AuthError, Result};
use crate::password::PasswordHasher;
use crate::providers::{CredentialStore, IdentityVerifier, MediaStore, NotificationDispatcher};
use crate::session::SessionIssuer;
use crate::state::{User, UserId};
use crate::templates::RenderedEmail;
use crate::tokens::TokenGenerator;

/// A committed conditional update.
#[derive(Debug, Clone)]
pub(crate) struct Committed {
    /// Record before the update.
    pub previous: User,
    /// Record after the update.
    pub current: User,
}

/// Identity lifecycle manager.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct IdentityManager<S, N, V, M, T, H>
where
    S: CredentialStore,
    N: NotificationDispatcher,
    V: IdentityVerifier,
    M: MediaStore,
    T: TokenGenerator,
    H: PasswordHasher + Clone + 'static,
{
    config: IdentityConfig,
    sessions: SessionIssuer,
    env: IdentityEnvironment<S, N, V, M, T, H>,
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
    /// Create a manager.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if `config` fails validation.
    pub fn new(config: IdentityConfig, env: IdentityEnvironment<S, N, V, M, T, H>) -> Result<Self> {
        config.validate()?;
        let sessions = SessionIssuer::new(&config.session);

        tracing::info!(
            project = %config.project_name,
            base_url = %config.public_base_url,
            "Identity manager initialized"
        );

        Ok(Self {
            config,
            sessions,
            env,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Session issuer, for transports that verify tokens themselves.
    #[must_use]
    pub const fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Collaborators.
    #[must_use]
    pub const fn environment(&self) -> &IdentityEnvironment<S, N, V, M, T, H> {
        &self.env
    }

    // ═══════════════════════════════════════════════════════════════════
    // Shared steps
    // ═══════════════════════════════════════════════════════════════════

    async fn load(&self, id: UserId) -> Result<User> {
        self.env.store.find_by_id(id).await?.ok_or(AuthError::UserNotFound)
    }

    fn new_token(&self) -> Result<String> {
        self.env.tokens.new_token(self.config.token_bytes)
    }

    /// Hash on the blocking pool.
    async fn hash_password(&self, plaintext: &str) -> Result<String> {
        let hasher = self.env.hasher.clone();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Hashing(format!("hashing task failed: {e}")))?
    }

    /// Verify on the blocking pool.
    async fn verify_password(&self, plaintext: &str, digest: &str) -> Result<bool> {
        let hasher = self.env.hasher.clone();
        let plaintext = plaintext.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest))
            .await
            .map_err(|e| AuthError::Hashing(format!("verification task failed: {e}")))?
    }

    /// Apply `command` atomically, translating a guard failure with `on_reject`.
    async fn commit(
        &self,
        id: UserId,
        command: &UserCommand,
        on_reject: impl FnOnce(Rejection) -> AuthError + Send,
    ) -> Result<Committed> {
        match self.env.store.update_if_match(id, command).await? {
            UpdateOutcome::Applied { previous, current } => Ok(Committed {
                previous: *previous,
                current: *current,
            }),
            UpdateOutcome::Rejected(rejection) => {
                tracing::debug!(
                    user_id = %id,
                    command = command.name(),
                    rejection = ?rejection,
                    "Conditional update rejected"
                );
                Err(on_reject(rejection))
            }
        }
    }

    /// Send an email, best-effort.
    async fn notify(&self, to: &str, email: RenderedEmail) {
        if let Err(e) = self.env.notifier.send(to, &email.subject, &email.html).await {
            tracing::warn!(
                subject = %email.subject,
                error = %e,
                "Notification failed; committed state is kept"
            );
            metrics::counter!("identity.notifications.failed").increment(1);
        } else {
            metrics::counter!("identity.notifications.sent").increment(1);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{PasswordHashConfig, SessionConfig};
    use crate::mocks::{
        MockIdentityVerifier, RecordingDispatcher, RecordingMediaStore, SequentialTokenGenerator,
    };
    use crate::password::Argon2PasswordHasher;
    use crate::state::IdentityProvider;
    use crate::stores::InMemoryCredentialStore;

    pub(crate) type TestManager<S = InMemoryCredentialStore> = IdentityManager<
        S,
        RecordingDispatcher,
        MockIdentityVerifier,
        RecordingMediaStore,
        SequentialTokenGenerator,
        Argon2PasswordHasher,
    >;

    /// Manager wired to in-memory collaborators, plus handles on them.
    pub(crate) struct Harness {
        pub manager: TestManager,
        pub store: InMemoryCredentialStore,
        pub notifier: RecordingDispatcher,
        pub media: RecordingMediaStore,
    }

    /// Manager over `store`, with fresh recording collaborators.
    pub(crate) fn manager_over<S: CredentialStore>(
        store: S,
        notifier: RecordingDispatcher,
        media: RecordingMediaStore,
    ) -> TestManager<S> {
        let cheap = PasswordHashConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        };
        let config = IdentityConfig::new(
            "http://localhost:3000".to_string(),
            SessionConfig::new("access-secret".to_string(), "refresh-secret".to_string()),
        )
        .with_password_hash(cheap);

        let verifier = MockIdentityVerifier::new().with_identity(
            "google-ann",
            "Ann Lee",
            "ann.lee@x.com",
            IdentityProvider::Google,
        );

        let env = IdentityEnvironment::new(
            store,
            notifier,
            verifier,
            media,
            SequentialTokenGenerator::new(),
            Argon2PasswordHasher::new(cheap).unwrap(),
        );

        IdentityManager::new(config, env).unwrap()
    }

    pub(crate) fn harness() -> Harness {
        let store = InMemoryCredentialStore::new();
        let notifier = RecordingDispatcher::new();
        let media = RecordingMediaStore::new();

        Harness {
            manager: manager_over(store.clone(), notifier.clone(), media.clone()),
            store,
            notifier,
            media,
        }
    }

    pub(crate) fn registration(username: &str, email: &str) -> Registration {
        Registration {
            name: "Ann".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password: "secret12".to_string(),
        }
    }

    /// Register and confirm an account with password `secret12`.
    pub(crate) async fn confirmed_user(h: &Harness, username: &str, email: &str) -> UserId {
        let registered = h.manager.register(registration(username, email)).await.unwrap();
        h.manager
            .confirm_account(registered.user.id, &registered.confirmation_token)
            .await
            .unwrap();
        registered.user.id
    }
}
