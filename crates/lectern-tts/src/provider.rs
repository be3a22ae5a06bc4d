//! The provider contract shared by every speech backend.

use async_trait::async_trait;
use lectern_core::{AudioFormat, AudioSettings, VoiceSettings};

use crate::config::ProviderConfig;
use crate::error::TtsError;

// ── Shared types ───────────────────────────────────────────────────

/// Audio returned by one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    /// Encoded audio in `format`.
    pub audio_bytes: Vec<u8>,

    /// Reported duration in milliseconds; `0` when the provider gave none.
    pub duration_ms: u64,

    /// Sample rate of the encoded audio (Hz).
    pub sample_rate: u32,

    pub format: AudioFormat,

    /// Words (or CJK characters) spoken.
    pub word_count: usize,
}

// ── Provider trait ─────────────────────────────────────────────────

/// Backend-agnostic speech synthesis provider.
///
/// Implementations must be `Send + Sync`: one instance is shared by every
/// worker through an `Arc<dyn TtsProvider>`. Adapters never retry; callers
/// use [`TtsError::is_transient`] to decide.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Registry key (e.g. `"minimax"`).
    fn name(&self) -> &str;

    /// Whether credentials are present.
    fn is_configured(&self) -> bool;

    /// Static catalog of accepted parameters.
    fn config(&self) -> &ProviderConfig;

    /// Synthesize one chunk of text.
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSettings,
        audio: &AudioSettings,
        model: &str,
    ) -> Result<SynthesizedAudio, TtsError>;

    /// Validate parameters against [`config`](Self::config).
    fn validate(
        &self,
        voice: &VoiceSettings,
        audio: &AudioSettings,
        model: &str,
    ) -> Result<(), TtsError> {
        self.config().validate(self.name(), voice, audio, model)
    }
}

/// Count spoken words: whitespace-separated tokens, with each CJK
/// character counted on its own.
pub fn count_words(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    for c in text.chars() {
        if is_cjk(c) {
            count += 1;
            in_word = false;
        } else if c.is_alphanumeric() {
            if !in_word {
                count += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }
    count
}

const fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF      // kana
        | 0x3400..=0x4DBF    // CJK ext A
        | 0x4E00..=0x9FFF    // CJK unified
        | 0xAC00..=0xD7AF    // hangul
        | 0xF900..=0xFAFF)
}
