//! Error types for provider operations.
//!
//! Every variant names the provider it came from so callers can log it as
//! a structured field. [`TtsError::is_transient`] is the single source of
//! truth for retry decisions.

use thiserror::Error;

/// Result type alias for provider operations.
pub type TtsResult<T> = Result<T, TtsError>;

/// Errors raised by speech providers.
#[derive(Debug, Error)]
pub enum TtsError {
    /// No provider registered under this name.
    #[error("Unknown speech provider '{0}'")]
    UnknownProvider(String),

    /// Provider is unusable (missing credentials, bad endpoint).
    #[error("Provider '{provider}' is not configured: {reason}")]
    NotConfigured { provider: String, reason: String },

    /// Caller-supplied parameter outside the provider's catalog or range.
    #[error("Invalid parameter for '{provider}': {message}")]
    Validation { provider: String, message: String },

    /// The request timed out.
    #[error("Request to '{provider}' timed out")]
    Timeout { provider: String },

    /// Connection-level failure.
    #[error("Network error talking to '{provider}': {message}")]
    Network { provider: String, message: String },

    /// Server-side failure (5xx, throttling, provider busy codes).
    #[error("Provider '{provider}' is temporarily unavailable ({status}): {message}")]
    Unavailable {
        provider: String,
        status: u16,
        message: String,
    },

    /// The provider refused the request.
    #[error("Provider '{provider}' rejected the request ({code}): {message}")]
    Rejected {
        provider: String,
        code: i64,
        message: String,
    },

    /// Authentication or token refresh failed.
    #[error("Authentication with '{provider}' failed: {message}")]
    Authentication {
        provider: String,
        message: String,
        /// Whether a fresh attempt may succeed (e.g. expired token).
        retryable: bool,
    },

    /// The response could not be decoded.
    #[error("Malformed response from '{provider}': {message}")]
    MalformedResponse { provider: String, message: String },
}

impl TtsError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } | Self::Unavailable { .. } => true,
            Self::Authentication { retryable, .. } => *retryable,
            Self::UnknownProvider(_)
            | Self::NotConfigured { .. }
            | Self::Validation { .. }
            | Self::Rejected { .. }
            | Self::MalformedResponse { .. } => false,
        }
    }

    /// Whether this error must fail the whole request up front.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownProvider(_) | Self::NotConfigured { .. } | Self::Validation { .. }
        )
    }

    pub(crate) fn validation(provider: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(provider: &str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}
