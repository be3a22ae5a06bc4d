//! Port definitions (trait abstractions) for external collaborators.
//!
//! Ports define the interfaces the pipeline expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` or HTTP client types in any signature
//! - Repositories are insert/query only: audio records are never mutated
//! - Storage returns a URL and owns its own fallback strategy

mod audio_record_repository;
mod audio_storage;

use thiserror::Error;

pub use audio_record_repository::{AudioRecordRepository, InMemoryAudioRecordRepository};
pub use audio_storage::{AudioStoragePort, InMemoryAudioStorage};

/// Domain-specific errors for repository operations.
///
/// This error type abstracts away storage implementation details (e.g., sqlx errors)
/// and provides a clean interface for services to handle storage failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage backend error (database, filesystem, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A constraint was violated (e.g., unique `(block_id, position)`).
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Errors raised by object storage adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend refused or failed the upload.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Local filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The adapter is missing required configuration.
    #[error("Storage not configured: {0}")]
    NotConfigured(String),
}

/// Core error type for semantic domain errors.
///
/// Adapters map this to their own error types (CLI exit codes, HTTP status).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Settings validation error.
    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),

    /// Validation error (invalid input).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}
