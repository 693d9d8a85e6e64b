//! Password hashing.
//!
//! Digests are Argon2id PHC strings (`$argon2id$v=19$m=...`), so the cost
//! parameters and salt travel with each stored hash and old hashes keep
//! verifying after the configured cost changes.

use crate::config::PasswordHashConfig;
use crate::error::{AuthError, Result};
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, Version};
use argon2::{PasswordHasher as _, PasswordVerifier as _};

/// One-way adaptive password hash.
///
/// Both operations are CPU-bound. The lifecycle manager runs them on the
/// blocking pool, which is why implementations must be `Clone + 'static`.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if the hash function fails.
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Check a plaintext password against a stored digest.
    ///
    /// The digest comparison is constant-time. Returns `Ok(false)` on mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if the digest is malformed.
    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool>;
}

/// Argon2id password hasher.
#[derive(Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for Argon2PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2PasswordHasher").finish_non_exhaustive()
    }
}

impl Argon2PasswordHasher {
    /// Create a hasher with the given cost parameters.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the parameters are out of range.
    pub fn new(config: PasswordHashConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AuthError::Configuration(format!("invalid Argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut rand::rngs::OsRng);

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool> {
        let parsed = PasswordHash::new(digest).map_err(|e| AuthError::Hashing(e.to_string()))?;

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Hashing(e.to_string())),
        }
    }
}
