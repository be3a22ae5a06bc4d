//! Persistence and object storage adapters for lectern.
//!
//! - [`SqliteAudioRecordRepository`] stores one audio record per region
//! - [`LocalAudioStorage`], [`HttpObjectStorage`] and [`FallbackStorage`]
//!   implement the audio storage port
//! - [`setup_database`] opens a database file and creates the schema
#![deny(unsafe_code)]

pub mod repositories;
pub mod setup;
pub mod storage;

// Re-export repository implementations
pub use repositories::SqliteAudioRecordRepository;

// Re-export storage adapters
pub use storage::{FallbackStorage, HttpObjectStorage, HttpStorageConfig, LocalAudioStorage};

// Re-export setup functions for convenient access
pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
