//! Object storage adapters for finalized region audio.
//!
//! Every adapter implements [`AudioStoragePort`](lectern_core::AudioStoragePort)
//! and returns the URL the audio can be fetched from.

mod fallback;
mod http;
mod local;

pub use fallback::FallbackStorage;
pub use http::{HttpObjectStorage, HttpStorageConfig};
pub use local::LocalAudioStorage;

use lectern_core::StorageError;

/// Reject keys that could escape the storage root or address a directory.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.ends_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(StorageError::Upload(format!("invalid object key '{key}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("block-1/0.mp3").is_ok());
        for key in ["", "/abs.mp3", "a/../b.mp3", "a//b", "dir/", "a\\b", "./x"] {
            assert!(validate_key(key).is_err(), "{key}");
        }
    }
}
