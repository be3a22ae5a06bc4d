//! Everything a narration request needs, bundled once and shared by the
//! orchestrator and its units.

use std::fmt;
use std::sync::Arc;

use lectern_core::{
    AudioRecordRepository, AudioSettings, AudioStoragePort, PipelineSettings, VoiceSettings,
    validate_settings,
};
use lectern_tts::TtsProvider;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineResult;
use crate::pool::SynthesisPool;

/// Request-scoped collaborators and settings.
///
/// Cloning is cheap: collaborators are shared behind `Arc`, and clones
/// share the same cancellation token.
#[derive(Clone)]
pub struct PipelineContext {
    pub(crate) block_id: String,
    pub(crate) provider: Arc<dyn TtsProvider>,
    pub(crate) pool: SynthesisPool,
    pub(crate) storage: Arc<dyn AudioStoragePort>,
    pub(crate) records: Arc<dyn AudioRecordRepository>,
    pub(crate) settings: PipelineSettings,
    pub(crate) voice: VoiceSettings,
    pub(crate) audio: AudioSettings,
    pub(crate) model: String,
    pub(crate) cancel: CancellationToken,
}

impl PipelineContext {
    /// Context with the provider's default voice and model, default audio
    /// settings and default pipeline settings.
    pub fn new(
        block_id: impl Into<String>,
        provider: Arc<dyn TtsProvider>,
        pool: SynthesisPool,
        storage: Arc<dyn AudioStoragePort>,
        records: Arc<dyn AudioRecordRepository>,
    ) -> Self {
        let voice = provider.config().default_voice_settings();
        let model = provider.config().default_model.clone();
        Self {
            block_id: block_id.into(),
            provider,
            pool,
            storage,
            records,
            settings: PipelineSettings::default(),
            voice,
            audio: AudioSettings::default(),
            model,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_voice(mut self, voice: VoiceSettings) -> Self {
        self.voice = voice;
        self
    }

    #[must_use]
    pub const fn with_audio(mut self, audio: AudioSettings) -> Self {
        self.audio = audio;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Tie the request to an externally owned token (e.g. client disconnect).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Check pipeline settings and the provider parameters up front, before
    /// any text is accepted.
    pub fn validate(&self) -> PipelineResult<()> {
        validate_settings(&self.settings)?;
        self.provider
            .validate(&self.voice, &self.audio, &self.model)?;
        Ok(())
    }

    pub fn block_id(&self) -> &str {
        &self.block_id
    }

    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Per-chunk caps: the configured character cap tightened by the
    /// provider's own limits.
    pub(crate) fn chunk_limits(&self) -> (usize, usize) {
        let limits = self.provider.config().limits;
        (
            self.settings.max_chunk_chars.min(limits.max_chars),
            limits.max_bytes,
        )
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("block_id", &self.block_id)
            .field("provider", &self.provider.name())
            .field("pool", &self.pool)
            .field("settings", &self.settings)
            .field("voice", &self.voice)
            .field("audio", &self.audio)
            .field("model", &self.model)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
