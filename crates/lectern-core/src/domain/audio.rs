//! Finalized audio records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::voice::{AudioFormat, VoiceSettings};

/// Outcome of a region's synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioStatus {
    /// Every chunk produced audio.
    Completed,
    /// Some chunks degraded to silence.
    Partial,
}

impl AudioStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

/// One concatenated audio artifact per `(block_id, position)`.
///
/// Created exactly once when a region finalizes and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRecord {
    /// Identifier of the generated block this region belongs to.
    pub block_id: String,
    /// Region position within the block.
    pub position: u32,
    /// Where the concatenated audio was stored, if the upload succeeded.
    pub audio_url: Option<String>,
    /// Total duration of all chunks.
    pub duration_ms: u64,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub voice_settings: VoiceSettings,
    /// Provider model used for synthesis.
    pub model: String,
    /// Characters of narrated (preprocessed) text.
    pub text_length: usize,
    /// Number of synthesis chunks that were concatenated.
    pub segment_count: usize,
    pub status: AudioStatus,
    pub created_at: DateTime<Utc>,
}
