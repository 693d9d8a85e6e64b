//! External media store trait.

use crate::error::Result;
use std::future::Future;

/// Storage for user-uploaded assets (avatars).
pub trait MediaStore: Send + Sync {
    /// Delete an asset by id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Media`](crate::AuthError::Media) if deletion fails.
    fn delete_asset(&self, asset_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Media store for deployments without external assets. Logs and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardMediaStore;

impl MediaStore for DiscardMediaStore {
    async fn delete_asset(&self, asset_id: &str) -> Result<()> {
        tracing::debug!(asset_id = %asset_id, "No media backend configured, skipping asset delete");
        Ok(())
    }
}
