//! HTTP object storage: one `PUT` per object.
//!
//! Works against any bucket or gateway that accepts authenticated `PUT`
//! uploads and serves the same keys under a public base URL.

use std::time::Duration;

use async_trait::async_trait;
use lectern_core::{AudioStoragePort, StorageError};
use reqwest::header::CONTENT_TYPE;

use super::validate_key;

/// Longest response body kept in an upload error.
const MAX_ERROR_BODY: usize = 256;

/// Endpoint and credentials for [`HttpObjectStorage`].
#[derive(Debug, Clone)]
pub struct HttpStorageConfig {
    upload_base: String,
    public_base: Option<String>,
    token: Option<String>,
    timeout: Duration,
}

impl HttpStorageConfig {
    /// Upload to `<upload_base>/<key>`; URLs default to the same base.
    pub fn new(upload_base: impl Into<String>) -> Self {
        Self {
            upload_base: trim_base(upload_base.into()),
            public_base: None,
            token: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Read `LECTERN_STORAGE_URL`, `LECTERN_STORAGE_PUBLIC_URL` and
    /// `LECTERN_STORAGE_TOKEN` from the process environment.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StorageError> {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base = set("LECTERN_STORAGE_URL")
            .ok_or_else(|| StorageError::NotConfigured("LECTERN_STORAGE_URL is not set".into()))?;
        let mut config = Self::new(base);
        if let Some(public) = set("LECTERN_STORAGE_PUBLIC_URL") {
            config = config.with_public_base(public);
        }
        if let Some(token) = set("LECTERN_STORAGE_TOKEN") {
            config = config.with_token(token);
        }
        Ok(config)
    }

    /// Base URL returned to callers, if it differs from the upload base.
    #[must_use]
    pub fn with_public_base(mut self, public_base: impl Into<String>) -> Self {
        self.public_base = Some(trim_base(public_base.into()));
        self
    }

    /// Bearer token sent with every upload.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Whole-request timeout. Defaults to 30 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

/// Uploads objects with `PUT` and returns their public URL.
#[derive(Debug, Clone)]
pub struct HttpObjectStorage {
    client: reqwest::Client,
    config: HttpStorageConfig,
}

impl HttpObjectStorage {
    pub fn new(config: HttpStorageConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn public_url(&self, key: &str) -> String {
        let base = self
            .config
            .public_base
            .as_deref()
            .unwrap_or(&self.config.upload_base);
        format!("{base}/{key}")
    }
}

#[async_trait]
impl AudioStoragePort for HttpObjectStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        let url = format!("{}/{key}", self.config.upload_base);

        let mut request = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes.to_vec());
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Upload(format!("PUT {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(StorageError::Upload(format!("PUT {url} returned {status}: {body}")));
        }

        tracing::debug!(%url, bytes = bytes.len(), "Uploaded audio object");
        Ok(self.public_url(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_requires_url() {
        let err = HttpStorageConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured(_)));

        let err = HttpStorageConfig::from_lookup(lookup(&[("LECTERN_STORAGE_URL", "  ")]));
        assert!(err.is_err());
    }

    #[test]
    fn test_public_url_prefers_public_base() {
        let config = HttpStorageConfig::from_lookup(lookup(&[
            ("LECTERN_STORAGE_URL", "http://upload.local/bucket/"),
            ("LECTERN_STORAGE_PUBLIC_URL", "https://cdn.example.org/audio"),
        ]))
        .unwrap();
        let storage = HttpObjectStorage::new(config).unwrap();
        assert_eq!(
            storage.public_url("b/0.mp3"),
            "https://cdn.example.org/audio/b/0.mp3"
        );

        let storage =
            HttpObjectStorage::new(HttpStorageConfig::new("http://upload.local/bucket/")).unwrap();
        assert_eq!(storage.public_url("b/0.mp3"), "http://upload.local/bucket/b/0.mp3");
    }
}
