//! Object storage port for concatenated audio artifacts.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::StorageError;

/// Uploads finished audio and returns a URL the client can play.
///
/// The pipeline treats this call as blocking. Falling back to an alternate
/// store on failure is the implementation's concern.
#[async_trait]
pub trait AudioStoragePort: Send + Sync {
    /// Store `bytes` under `key` and return its public URL.
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Keeps uploads in memory; URLs use the `mem://` scheme.
#[derive(Debug, Default)]
pub struct InMemoryAudioStorage {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl InMemoryAudioStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored under `key`, if any.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(key).map(|(_, b)| b.clone())
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

#[async_trait]
impl AudioStoragePort for InMemoryAudioStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.objects
            .lock()
            .await
            .insert(key.to_string(), (content_type.to_string(), bytes.to_vec()));
        Ok(format!("mem://{key}"))
    }
}
