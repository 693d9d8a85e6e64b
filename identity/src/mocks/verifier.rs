//! Scripted federated identity verifier for testing.

use crate::error::{AuthError, Result};
use crate::providers::{IdentityVerifier, VerifiedIdentity};
use crate::state::IdentityProvider;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Verifier that accepts only the assertions it was told about.
#[derive(Debug, Clone, Default)]
pub struct MockIdentityVerifier {
    identities: Arc<Mutex<HashMap<String, VerifiedIdentity>>>,
}

impl MockIdentityVerifier {
    /// Create a verifier that rejects everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `assertion` as proof of the given identity.
    #[must_use]
    pub fn with_identity(
        self,
        assertion: &str,
        name: &str,
        email: &str,
        provider: IdentityProvider,
    ) -> Self {
        self.identities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                assertion.to_string(),
                VerifiedIdentity {
                    name: name.to_string(),
                    email: email.to_string(),
                    provider,
                },
            );
        self
    }
}

impl IdentityVerifier for MockIdentityVerifier {
    async fn verify(&self, assertion: &str) -> Result<VerifiedIdentity> {
        self.identities
            .lock()
            .map_err(|_| AuthError::InvalidFederatedAssertion)?
            .get(assertion)
            .cloned()
            .ok_or(AuthError::InvalidFederatedAssertion)
    }
}
