//! Identity environment.
//!
//! Bundles the collaborators the lifecycle manager depends on, so the
//! composition root can build them once and hand them over together.

use crate::password::{Argon2PasswordHasher, PasswordHasher};
use crate::providers::{CredentialStore, IdentityVerifier, MediaStore, NotificationDispatcher};
use crate::tokens::{OsTokenGenerator, TokenGenerator};

/// Identity environment.
///
/// # Type Parameters
///
/// - `S`: Credential store
/// - `N`: Notification dispatcher
/// - `V`: Federated identity verifier
/// - `M`: Media store
/// - `T`: Token generator (default: OS entropy)
/// - `H`: Password hasher (default: Argon2id)
#[derive(Debug, Clone)]
pub struct IdentityEnvironment<S, N, V, M, T = OsTokenGenerator, H = Argon2PasswordHasher>
where
    S: CredentialStore,
    N: NotificationDispatcher,
    V: IdentityVerifier,
    M: MediaStore,
    T: TokenGenerator,
    H: PasswordHasher,
{
    /// Credential store.
    pub store: S,

    /// Notification dispatcher (best-effort).
    pub notifier: N,

    /// Federated identity verifier.
    pub verifier: V,

    /// Media store (best-effort cleanup).
    pub media: M,

    /// Single-use token generator.
    pub tokens: T,

    /// Password hasher.
    pub hasher: H,
}

impl<S, N, V, M, T, H> IdentityEnvironment<S, N, V, M, T, H>
where
    S: CredentialStore,
    N: NotificationDispatcher,
    V: IdentityVerifier,
    M: MediaStore,
    T: TokenGenerator,
    H: PasswordHasher,
{
    /// Create a new identity environment.
    #[must_use]
    pub const fn new(store: S, notifier: N, verifier: V, media: M, tokens: T, hasher: H) -> Self {
        Self {
            store,
            notifier,
            verifier,
            media,
            tokens,
            hasher,
        }
    }
}
