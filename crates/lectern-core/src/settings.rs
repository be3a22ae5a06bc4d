//! Pipeline settings and validation.
//!
//! These are pure configuration types with no infrastructure dependencies.
//! Adapters load them once at process start (defaults overlaid with
//! `LECTERN_*` environment variables) and pass them by value.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of concurrent provider calls across the process.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default soft cap on characters per synthesis chunk.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 300;

/// Default minimum characters before a complete sentence is submitted.
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 8;

/// Default per-call synthesis timeout in seconds.
pub const DEFAULT_SYNTHESIS_TIMEOUT_SECS: u64 = 30;

/// Default number of retries for a transient chunk failure.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 1;

/// Tuning knobs for the narration pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Size of the shared synthesis worker pool.
    pub max_workers: usize,

    /// Soft cap on characters per chunk (the provider's own limits still apply).
    pub max_chunk_chars: usize,

    /// Complete sentences shorter than this wait for more text before submission.
    pub min_chunk_chars: usize,

    /// Timeout for a single provider call.
    pub synthesis_timeout_secs: u64,

    /// Retries for a chunk whose failure is transient.
    pub retry_attempts: u32,

    /// Whether the orchestrator echoes inbound text as `content` events.
    pub emit_content: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PipelineSettings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS,
            synthesis_timeout_secs: DEFAULT_SYNTHESIS_TIMEOUT_SECS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            emit_content: false,
        }
    }

    /// Defaults overlaid with `LECTERN_*` environment variables.
    ///
    /// Unparseable values are reported rather than ignored.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let mut settings = Self::with_defaults();

        if let Some(v) = lookup("LECTERN_MAX_WORKERS") {
            settings.max_workers = parse_var("LECTERN_MAX_WORKERS", &v)?;
        }
        if let Some(v) = lookup("LECTERN_MAX_CHUNK_CHARS") {
            settings.max_chunk_chars = parse_var("LECTERN_MAX_CHUNK_CHARS", &v)?;
        }
        if let Some(v) = lookup("LECTERN_MIN_CHUNK_CHARS") {
            settings.min_chunk_chars = parse_var("LECTERN_MIN_CHUNK_CHARS", &v)?;
        }
        if let Some(v) = lookup("LECTERN_SYNTHESIS_TIMEOUT_SECS") {
            settings.synthesis_timeout_secs = parse_var("LECTERN_SYNTHESIS_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("LECTERN_RETRY_ATTEMPTS") {
            settings.retry_attempts = parse_var("LECTERN_RETRY_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("LECTERN_EMIT_CONTENT") {
            settings.emit_content = parse_var("LECTERN_EMIT_CONTENT", &v)?;
        }

        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Per-call timeout as a [`Duration`].
    #[must_use]
    pub const fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Worker pool size must be between 1 and 64, got {0}")]
    InvalidWorkerCount(usize),

    #[error("Max chunk chars must be between 16 and 10,000, got {0}")]
    InvalidMaxChunkChars(usize),

    #[error("Min chunk chars ({min}) must be smaller than max chunk chars ({max})")]
    MinExceedsMax { min: usize, max: usize },

    #[error("Synthesis timeout must be between 1 and 600 seconds, got {0}")]
    InvalidTimeout(u64),

    #[error("Retry attempts must be at most 5, got {0}")]
    InvalidRetryAttempts(u32),

    #[error("Invalid value '{value}' for {key}")]
    InvalidEnv { key: String, value: String },
}

/// Validate settings values.
pub fn validate_settings(settings: &PipelineSettings) -> Result<(), SettingsError> {
    if !(1..=64).contains(&settings.max_workers) {
        return Err(SettingsError::InvalidWorkerCount(settings.max_workers));
    }
    if !(16..=10_000).contains(&settings.max_chunk_chars) {
        return Err(SettingsError::InvalidMaxChunkChars(settings.max_chunk_chars));
    }
    if settings.min_chunk_chars >= settings.max_chunk_chars {
        return Err(SettingsError::MinExceedsMax {
            min: settings.min_chunk_chars,
            max: settings.max_chunk_chars,
        });
    }
    if !(1..=600).contains(&settings.synthesis_timeout_secs) {
        return Err(SettingsError::InvalidTimeout(settings.synthesis_timeout_secs));
    }
    if settings.retry_attempts > 5 {
        return Err(SettingsError::InvalidRetryAttempts(settings.retry_attempts));
    }
    Ok(())
}
