//! Primary storage with a secondary to fall back on.

use std::sync::Arc;

use async_trait::async_trait;
use lectern_core::{AudioStoragePort, StorageError};

/// Tries `primary`, then `fallback` when the primary upload fails.
///
/// When both fail the fallback's error is returned.
#[derive(Clone)]
pub struct FallbackStorage {
    primary: Arc<dyn AudioStoragePort>,
    fallback: Arc<dyn AudioStoragePort>,
}

impl FallbackStorage {
    pub fn new(primary: Arc<dyn AudioStoragePort>, fallback: Arc<dyn AudioStoragePort>) -> Self {
        Self { primary, fallback }
    }
}

impl std::fmt::Debug for FallbackStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackStorage").finish_non_exhaustive()
    }
}

#[async_trait]
impl AudioStoragePort for FallbackStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        match self.primary.upload(key, bytes, content_type).await {
            Ok(url) => Ok(url),
            Err(error) => {
                tracing::warn!(key, %error, "Primary storage failed, using fallback");
                self.fallback.upload(key, bytes, content_type).await
            }
        }
    }
}
