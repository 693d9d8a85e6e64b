//! Recording media store for testing.

use crate::error::{AuthError, Result};
use crate::providers::MediaStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Records asset deletions; can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingMediaStore {
    deleted: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingMediaStore {
    /// Create a store that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle failure mode.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Ids of deleted assets.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl MediaStore for RecordingMediaStore {
    async fn delete_asset(&self, asset_id: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuthError::Media("simulated media failure".to_string()));
        }
        self.deleted
            .lock()
            .map_err(|_| AuthError::Media("recorder lock poisoned".to_string()))?
            .push(asset_id.to_string());
        Ok(())
    }
}
