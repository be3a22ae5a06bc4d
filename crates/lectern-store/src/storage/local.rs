//! Filesystem storage rooted at a directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lectern_core::{AudioStoragePort, StorageError};

use super::validate_key;

/// Writes each object to `<root>/<key>` and returns a `file://` URL.
#[derive(Debug, Clone)]
pub struct LocalAudioStorage {
    root: PathBuf,
}

impl LocalAudioStorage {
    /// Storage rooted at `root`. The directory is created on first upload.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an object with `key` is written to.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl AudioStoragePort for LocalAudioStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        let absolute = tokio::fs::canonicalize(&path).await?;
        tracing::debug!(path = %absolute.display(), bytes = bytes.len(), "Wrote audio file");
        Ok(format!("file://{}", absolute.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_writes_file_and_returns_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalAudioStorage::new(dir.path().join("audio"));

        let url = storage
            .upload("block-1/0.mp3", b"abc", "audio/mpeg")
            .await
            .unwrap();

        let path = storage.path_for("block-1/0.mp3");
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        assert!(url.starts_with("file:///"));
        assert!(url.ends_with("block-1/0.mp3"));
    }

    #[tokio::test]
    async fn test_upload_overwrites_existing_object() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalAudioStorage::new(dir.path());

        storage.upload("a.wav", b"first", "audio/wav").await.unwrap();
        storage.upload("a.wav", b"second", "audio/wav").await.unwrap();
        assert_eq!(std::fs::read(storage.path_for("a.wav")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_traversal_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalAudioStorage::new(dir.path().join("root"));

        let err = storage
            .upload("../escape.mp3", b"x", "audio/mpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Upload(_)));
        assert!(!dir.path().join("escape.mp3").exists());
    }
}
