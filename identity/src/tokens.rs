//! Single-use token generation.
//!
//! Confirmation, reset, and email-change tokens are drawn from the operating
//! system's entropy source and encoded as unpadded base64url, so they can be
//! placed in a query string without escaping.

use crate::error::{AuthError, Result};
use base64::Engine;
use rand::RngCore;

/// Produces high-entropy, URL-safe tokens.
pub trait TokenGenerator: Send + Sync {
    /// Generate a token from `bytes` random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenGeneration`] if the entropy source fails.
    /// Callers must propagate this; there is no fallback source.
    fn new_token(&self, bytes: usize) -> Result<String>;
}

/// Token generator backed by [`rand::rngs::OsRng`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTokenGenerator;

impl OsTokenGenerator {
    /// Create a new generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TokenGenerator for OsTokenGenerator {
    fn new_token(&self, bytes: usize) -> Result<String> {
        let mut random_bytes = vec![0u8; bytes];
        rand::rngs::OsRng
            .try_fill_bytes(&mut random_bytes)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_length_encoding() {
        let token = OsTokenGenerator::new().new_token(128).unwrap();
        // 128 bytes → ceil(128 * 4 / 3) chars without padding.
        assert_eq!(token.len(), 171);
    }

    #[test]
    fn test_tokens_are_distinct() {
        let generator = OsTokenGenerator::new();
        let a = generator.new_token(32).unwrap();
        let b = generator.new_token(32).unwrap();
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_tokens_are_url_safe(bytes in 1usize..256) {
            let token = OsTokenGenerator::new().new_token(bytes).unwrap();
            prop_assert!(!token.is_empty());
            prop_assert!(token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }
}
