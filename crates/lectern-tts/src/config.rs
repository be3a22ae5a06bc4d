//! Static provider catalogs and strict parameter validation.

use lectern_core::{AudioFormat, AudioSettings, VoiceSettings};
use serde::Serialize;

use crate::error::TtsError;

/// A voice offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceOption {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl VoiceOption {
    pub(crate) fn new(id: &str, name: &str, language: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            language: Some(language.to_string()),
        }
    }
}

/// Inclusive numeric range with a default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl NumericRange {
    #[must_use]
    pub const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Per-request text limits enforced by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLimits {
    /// Maximum characters per request.
    pub max_chars: usize,
    /// Maximum UTF-8 bytes per request.
    pub max_bytes: usize,
}

/// What a provider accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub voices: Vec<VoiceOption>,
    pub models: Vec<String>,
    pub emotions: Vec<String>,
    pub formats: Vec<AudioFormat>,
    pub sample_rates: Vec<u32>,
    pub speed_range: NumericRange,
    pub pitch_range: NumericRange,
    pub supports_emotion: bool,
    pub default_voice: String,
    pub default_model: String,
    pub limits: TextLimits,
}

impl ProviderConfig {
    /// Voice settings built from this provider's defaults.
    #[must_use]
    pub fn default_voice_settings(&self) -> VoiceSettings {
        VoiceSettings::new(self.default_voice.clone())
            .with_speed(self.speed_range.default)
            .with_pitch(self.pitch_range.default)
    }

    /// Reject anything outside the catalog. Nothing is clamped.
    pub fn validate(
        &self,
        provider: &str,
        voice: &VoiceSettings,
        audio: &AudioSettings,
        model: &str,
    ) -> Result<(), TtsError> {
        if !self.voices.iter().any(|v| v.id == voice.voice_id) {
            return Err(TtsError::validation(
                provider,
                format!("unknown voice '{}'", voice.voice_id),
            ));
        }
        if !self.models.iter().any(|m| m == model) {
            return Err(TtsError::validation(
                provider,
                format!("unknown model '{model}'"),
            ));
        }
        if !self.speed_range.contains(voice.speed) {
            return Err(TtsError::validation(
                provider,
                format!(
                    "speed {} outside [{}, {}]",
                    voice.speed, self.speed_range.min, self.speed_range.max
                ),
            ));
        }
        if !self.pitch_range.contains(voice.pitch) {
            return Err(TtsError::validation(
                provider,
                format!(
                    "pitch {} outside [{}, {}]",
                    voice.pitch, self.pitch_range.min, self.pitch_range.max
                ),
            ));
        }
        if let Some(emotion) = voice.emotion.as_deref() {
            if !self.supports_emotion {
                return Err(TtsError::validation(
                    provider,
                    "emotion is not supported by this provider",
                ));
            }
            if !self.emotions.iter().any(|e| e == emotion) {
                return Err(TtsError::validation(
                    provider,
                    format!("unknown emotion '{emotion}'"),
                ));
            }
        }
        if !self.formats.contains(&audio.format) {
            return Err(TtsError::validation(
                provider,
                format!("unsupported audio format '{}'", audio.format),
            ));
        }
        if !self.sample_rates.contains(&audio.sample_rate) {
            return Err(TtsError::validation(
                provider,
                format!("unsupported sample rate {}", audio.sample_rate),
            ));
        }
        Ok(())
    }

    /// Reject text the provider would refuse outright.
    pub(crate) fn check_text(&self, provider: &str, text: &str) -> Result<(), TtsError> {
        if text.trim().is_empty() {
            return Err(TtsError::validation(provider, "text is empty"));
        }
        if text.chars().count() > self.limits.max_chars || text.len() > self.limits.max_bytes {
            return Err(TtsError::validation(
                provider,
                format!(
                    "text exceeds limits ({} chars / {} bytes)",
                    self.limits.max_chars, self.limits.max_bytes
                ),
            ));
        }
        Ok(())
    }
}
