//! Core domain types, events, and port definitions for lectern.
//!
//! This crate is the shared vocabulary of the narration pipeline. It holds no
//! infrastructure: provider adapters live in `lectern-tts`, persistence and
//! object storage adapters in `lectern-store`, and the streaming engine in
//! `lectern-pipeline`.
//!
//! - [`domain`] - visual kinds, voice/audio settings, finalized audio records
//! - [`events`] - the outbound [`PipelineEvent`] union
//! - [`ports`] - repository and storage traits plus their error types
//! - [`settings`] - pipeline tuning knobs and their validation
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    AudioFormat, AudioRecord, AudioSettings, AudioStatus, VisualKind, VoiceSettings,
};
pub use events::PipelineEvent;
pub use ports::{
    AudioRecordRepository, AudioStoragePort, CoreError, InMemoryAudioRecordRepository,
    InMemoryAudioStorage, RepositoryError, StorageError,
};
pub use settings::{PipelineSettings, SettingsError, validate_settings};
