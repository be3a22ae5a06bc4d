//! Shared HTTP plumbing for provider adapters.
//!
//! Builds the reqwest client every adapter uses and classifies transport
//! and status failures into [`TtsError`] variants. Adapters never retry
//! here; the classification tells the caller whether a retry makes sense.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::TtsError;

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// HTTP settings shared by all provider adapters.
///
/// # Example
///
/// ```
/// use lectern_tts::HttpClientConfig;
/// use std::time::Duration;
///
/// let config = HttpClientConfig::new()
///     .with_timeout(Duration::from_secs(10))
///     .with_user_agent("tutor/2.0");
/// ```
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Whole-request timeout
    pub(crate) timeout: Duration,
    /// TCP connect timeout
    pub(crate) connect_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("lectern-tts/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl HttpClientConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user agent string for HTTP requests.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the whole-request timeout.
    ///
    /// Defaults to 30 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the TCP connect timeout.
    ///
    /// Defaults to 5 seconds.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build a reqwest client from this configuration.
    pub(crate) fn build_client(&self, provider: &str) -> Result<reqwest::Client, TtsError> {
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| TtsError::NotConfigured {
                provider: provider.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })
    }
}

/// Classify a reqwest transport error.
pub(crate) fn transport_error(provider: &str, err: &reqwest::Error) -> TtsError {
    if err.is_timeout() {
        TtsError::Timeout {
            provider: provider.to_string(),
        }
    } else if let Some(status) = err.status() {
        status_error(provider, status, &err.to_string())
    } else {
        TtsError::Network {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}

/// Classify a non-success HTTP status.
///
/// 5xx and 429 are transient; any other status is a rejection.
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> TtsError {
    let message = truncate(body);
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        TtsError::Unavailable {
            provider: provider.to_string(),
            status: status.as_u16(),
            message,
        }
    } else {
        TtsError::Rejected {
            provider: provider.to_string(),
            code: i64::from(status.as_u16()),
            message,
        }
    }
}

/// Drain a failed response into a classified error.
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> TtsError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    status_error(provider, status, &body)
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
