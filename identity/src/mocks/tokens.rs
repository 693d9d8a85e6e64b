//! Deterministic token generator for testing.

use crate::error::{AuthError, Result};
use crate::tokens::TokenGenerator;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Yields `token-1`, `token-2`, ... regardless of the requested length.
#[derive(Debug, Clone, Default)]
pub struct SequentialTokenGenerator {
    next: Arc<AtomicU64>,
    fail: Arc<AtomicBool>,
}

impl SequentialTokenGenerator {
    /// Create a generator starting at `token-1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an entropy-source failure on every call.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl TokenGenerator for SequentialTokenGenerator {
    fn new_token(&self, _bytes: usize) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuthError::TokenGeneration("simulated entropy failure".to_string()));
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("token-{n}"))
    }
}
