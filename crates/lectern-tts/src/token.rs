//! Cached access tokens with single-flight refresh.
//!
//! The slot's mutex doubles as the refresh lease: whoever holds it is the
//! only task allowed to call the provider's token endpoint. Everyone else
//! waits and then reads the refreshed value.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::error::TtsError;

/// A token and its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - margin > now
    }

    fn is_unexpired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Token cache refreshed ahead of expiry.
#[derive(Debug)]
pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
    refresh_margin: Duration,
}

impl TokenCache {
    /// Tokens are refreshed once they are within `refresh_margin` of expiry.
    pub fn new(refresh_margin: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            refresh_margin,
        }
    }

    /// Return the cached token, refreshing it first when it is near expiry.
    ///
    /// A failed refresh still hands out the previous token if it has not
    /// actually expired yet.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, TtsError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<CachedToken, TtsError>> + Send,
    {
        let mut slot = self.slot.lock().await;
        let now = Utc::now();

        if let Some(token) = slot.as_ref().filter(|t| t.is_fresh(now, self.refresh_margin)) {
            return Ok(token.value.clone());
        }

        match refresh().await {
            Ok(fresh) => {
                tracing::debug!(expires_at = %fresh.expires_at, "Access token refreshed");
                let value = fresh.value.clone();
                *slot = Some(fresh);
                Ok(value)
            }
            Err(e) => match slot.as_ref().filter(|t| t.is_unexpired(Utc::now())) {
                Some(token) => {
                    tracing::warn!(error = %e, "Token refresh failed, reusing unexpired token");
                    Ok(token.value.clone())
                }
                None => Err(e),
            },
        }
    }

    /// Drop the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn token(value: &str, ttl_secs: i64) -> CachedToken {
        CachedToken {
            value: value.to_string(),
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
        }
    }

    fn refresh_error() -> TtsError {
        TtsError::Authentication {
            provider: "test".into(),
            message: "denied".into(),
            retryable: false,
        }
    }

    #[tokio::test]
    async fn test_caches_fresh_token() {
        let cache = TokenCache::new(Duration::seconds(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(token("t1", 3600))
                })
                .await
                .unwrap();
            assert_eq!(value, "t1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refreshes_inside_margin() {
        let cache = TokenCache::new(Duration::seconds(120));
        cache
            .get_or_refresh(|| async { Ok(token("old", 60)) })
            .await
            .unwrap();

        let value = cache
            .get_or_refresh(|| async { Ok(token("new", 3600)) })
            .await
            .unwrap();
        assert_eq!(value, "new");
    }

    #[tokio::test]
    async fn test_failed_refresh_reuses_unexpired_token() {
        let cache = TokenCache::new(Duration::seconds(120));
        cache
            .get_or_refresh(|| async { Ok(token("old", 60)) })
            .await
            .unwrap();

        let value = cache
            .get_or_refresh(|| async { Err(refresh_error()) })
            .await
            .unwrap();
        assert_eq!(value, "old");
    }

    #[tokio::test]
    async fn test_failed_refresh_without_token_errors() {
        let cache = TokenCache::new(Duration::seconds(60));
        let result = cache.get_or_refresh(|| async { Err(refresh_error()) }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let cache = TokenCache::new(Duration::seconds(60));
        cache
            .get_or_refresh(|| async { Ok(token("a", 3600)) })
            .await
            .unwrap();
        cache.invalidate().await;
        let value = cache
            .get_or_refresh(|| async { Ok(token("b", 3600)) })
            .await
            .unwrap();
        assert_eq!(value, "b");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_refresh_once() {
        let cache = Arc::new(TokenCache::new(Duration::seconds(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_refresh(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(token("shared", 3600))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
