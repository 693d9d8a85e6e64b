//! Federated identity verifier trait.

use crate::error::Result;
use crate::state::IdentityProvider;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Claims extracted from a verified external assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    /// Display name.
    pub name: String,
    /// Verified email address.
    pub email: String,
    /// Provider that asserted the identity.
    pub provider: IdentityProvider,
}

/// Exchanges an external assertion (e.g. a provider ID token) for verified claims.
///
/// The manager trusts whatever this returns; implementing the provider's
/// verification protocol is the implementation's job.
pub trait IdentityVerifier: Send + Sync {
    /// Verify an assertion.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidFederatedAssertion`](crate::AuthError::InvalidFederatedAssertion)
    /// if the assertion is rejected.
    fn verify(&self, assertion: &str) -> impl Future<Output = Result<VerifiedIdentity>> + Send;
}
