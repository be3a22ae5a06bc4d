//! Error types for the narration engine.
//!
//! Chunk-level synthesis failures never surface here: they degrade to
//! silent chunks inside the unit. These errors are for misuse of the state
//! machines and for failures that make a whole request unusable.

use lectern_core::SettingsError;
use lectern_tts::TtsError;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised by the orchestrator, units and audio helpers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text arrived after the orchestrator finalized.
    #[error("Orchestrator is already finalized")]
    AlreadyFinalized,

    /// Text was fed to a unit that left the `Open` state.
    #[error("Synthesis unit at position {position} is no longer accepting text")]
    UnitClosed { position: u32 },

    /// The shared worker pool was shut down.
    #[error("Synthesis pool is closed")]
    PoolClosed,

    /// Provider setup failed (unknown provider, credentials, validation).
    #[error(transparent)]
    Provider(#[from] TtsError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// WAV decode/encode failure while concatenating.
    #[error("WAV processing failed: {0}")]
    Wav(#[from] hound::Error),

    /// Chunks of one region disagree on their audio layout.
    #[error("Audio chunks cannot be concatenated: {0}")]
    IncompatibleAudio(String),
}
