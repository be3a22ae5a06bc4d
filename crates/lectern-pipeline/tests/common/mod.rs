//! Shared fixtures for pipeline integration tests.
//!
//! `ScriptedProvider` echoes each chunk's text back as its "audio", so the
//! bytes in storage spell out exactly what was narrated and in which order.
#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lectern_core::{
    AudioFormat, AudioRecordRepository, AudioSettings, AudioStoragePort,
    InMemoryAudioRecordRepository, InMemoryAudioStorage, PipelineEvent, PipelineSettings,
    VisualKind, VoiceSettings,
};
use lectern_pipeline::{PipelineContext, SynthesisPool, VisualOrchestrator};
use lectern_tts::{
    NumericRange, ProviderConfig, SynthesizedAudio, TextLimits, TtsError, TtsProvider, VoiceOption,
};

pub const BLOCK_ID: &str = "block-1";
pub const CHUNK_DURATION_MS: u64 = 100;

/// How an injected failure is classified.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Transient,
    Fatal,
}

impl Failure {
    fn error(self) -> TtsError {
        match self {
            Self::Transient => TtsError::Unavailable {
                provider: "scripted".to_string(),
                status: 503,
                message: "try again".to_string(),
            },
            Self::Fatal => TtsError::Rejected {
                provider: "scripted".to_string(),
                code: 400,
                message: "bad input".to_string(),
            },
        }
    }
}

/// Decrements the in-flight counter on every exit path.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ScriptedProvider {
    config: ProviderConfig,
    /// LCG state for pseudo-random delays; 0 disables jitter.
    seed: AtomicU64,
    max_delay_ms: u64,
    fixed_delay_ms: u64,
    failures: Mutex<Vec<(String, u32, Failure)>>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            config: ProviderConfig {
                voices: vec![VoiceOption {
                    id: "narrator".to_string(),
                    name: "Narrator".to_string(),
                    language: Some("en".to_string()),
                }],
                models: vec!["scripted-1".to_string()],
                emotions: Vec::new(),
                formats: vec![AudioFormat::Mp3, AudioFormat::Pcm],
                sample_rates: vec![24_000],
                speed_range: NumericRange::new(0.5, 2.0, 1.0),
                pitch_range: NumericRange::new(-12.0, 12.0, 0.0),
                supports_emotion: false,
                default_voice: "narrator".to_string(),
                default_model: "scripted-1".to_string(),
                limits: TextLimits {
                    max_chars: 2_000,
                    max_bytes: 1_024,
                },
            },
            seed: AtomicU64::new(0),
            max_delay_ms: 0,
            fixed_delay_ms: 0,
            failures: Mutex::new(Vec::new()),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Pseudo-random per-call delay in `0..max_ms`.
    pub fn with_jitter(mut self, seed: u64, max_ms: u64) -> Self {
        self.seed = AtomicU64::new(seed.max(1));
        self.max_delay_ms = max_ms.max(1);
        self
    }

    pub const fn with_delay(mut self, ms: u64) -> Self {
        self.fixed_delay_ms = ms;
        self
    }

    /// Fail the next `times` calls whose text contains `marker`.
    pub fn fail_on(self, marker: &str, times: u32, failure: Failure) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((marker.to_string(), times, failure));
        self
    }

    /// Number of synthesize calls whose text contains `marker`.
    pub fn calls_containing(&self, marker: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(text, _)| text.contains(marker))
            .map(|(_, n)| n)
            .sum()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Every distinct text sent for synthesis.
    pub fn spoken(&self) -> BTreeSet<String> {
        self.calls.lock().unwrap().keys().cloned().collect()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_delay(&self) -> Duration {
        if self.max_delay_ms == 0 {
            return Duration::from_millis(self.fixed_delay_ms);
        }
        let next = self
            .seed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| {
                Some(s.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407))
            })
            .unwrap_or(1);
        Duration::from_millis((next >> 33) % self.max_delay_ms)
    }

    fn injected_failure(&self, text: &str) -> Option<TtsError> {
        let mut failures = self.failures.lock().unwrap();
        let entry = failures
            .iter_mut()
            .find(|(marker, left, _)| *left > 0 && text.contains(marker.as_str()))?;
        entry.1 -= 1;
        Some(entry.2.error())
    }
}

#[async_trait]
impl TtsProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn synthesize(
        &self,
        text: &str,
        _voice: &VoiceSettings,
        audio: &AudioSettings,
        _model: &str,
    ) -> Result<SynthesizedAudio, TtsError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(text.to_string())
            .or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        tokio::time::sleep(self.next_delay()).await;

        if let Some(error) = self.injected_failure(text) {
            return Err(error);
        }
        Ok(SynthesizedAudio {
            audio_bytes: text.as_bytes().to_vec(),
            duration_ms: CHUNK_DURATION_MS,
            sample_rate: audio.sample_rate,
            format: audio.format,
            word_count: lectern_tts::count_words(text),
        })
    }
}

/// Provider, collaborators and a ready context.
pub struct Harness {
    pub provider: Arc<ScriptedProvider>,
    pub storage: Arc<InMemoryAudioStorage>,
    pub records: Arc<InMemoryAudioRecordRepository>,
    pub pool: SynthesisPool,
    pub settings: PipelineSettings,
}

impl Harness {
    pub fn new(provider: ScriptedProvider) -> Self {
        let settings = PipelineSettings::with_defaults();
        Self {
            provider: Arc::new(provider),
            storage: Arc::new(InMemoryAudioStorage::new()),
            records: Arc::new(InMemoryAudioRecordRepository::new()),
            pool: SynthesisPool::new(settings.max_workers),
            settings,
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.pool = SynthesisPool::new(settings.max_workers);
        self.settings = settings;
        self
    }

    pub fn context(&self) -> PipelineContext {
        self.context_with(
            BLOCK_ID,
            self.storage.clone(),
            self.records.clone(),
        )
    }

    pub fn context_with(
        &self,
        block_id: &str,
        storage: Arc<dyn AudioStoragePort>,
        records: Arc<dyn AudioRecordRepository>,
    ) -> PipelineContext {
        PipelineContext::new(block_id, self.provider.clone(), self.pool.clone(), storage, records)
            .with_settings(self.settings.clone())
    }

    pub fn orchestrator(&self) -> VisualOrchestrator {
        VisualOrchestrator::new(self.context()).unwrap()
    }
}

/// Feed every delta, then finalize; returns all events in emission order.
pub async fn run(orchestrator: &mut VisualOrchestrator, deltas: &[&str]) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    for delta in deltas {
        events.extend(orchestrator.process_chunk(delta).await.unwrap());
    }
    events.extend(orchestrator.finalize().await.unwrap());
    events
}

/// Split `text` into deltas of `size` characters.
pub fn deltas(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// `(position, chunk_index, is_final)` of every audio segment.
pub fn segments(events: &[PipelineEvent]) -> Vec<(u32, usize, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::AudioSegment {
                position,
                chunk_index,
                is_final,
                ..
            } => Some((*position, *chunk_index, *is_final)),
            _ => None,
        })
        .collect()
}

/// Positions that received audio.
pub fn audio_positions(events: &[PipelineEvent]) -> BTreeSet<u32> {
    events
        .iter()
        .filter(|e| e.is_audio())
        .filter_map(PipelineEvent::position)
        .collect()
}

/// `(position, kind, content)` of every visual marker.
pub fn markers(events: &[PipelineEvent]) -> Vec<(u32, VisualKind, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::VisualMarker {
                position,
                kind,
                content,
            } => Some((*position, *kind, content.clone())),
            _ => None,
        })
        .collect()
}

/// `(position, audio_url)` of every completion.
pub fn completions(events: &[PipelineEvent]) -> Vec<(u32, Option<String>)> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::AudioComplete {
                position, audio_url, ..
            } => Some((*position, audio_url.clone())),
            _ => None,
        })
        .collect()
}

/// Index of the first event matching `pred`.
pub fn index_of(events: &[PipelineEvent], pred: impl Fn(&PipelineEvent) -> bool) -> usize {
    events
        .iter()
        .position(pred)
        .unwrap_or_else(|| panic!("no matching event in {events:#?}"))
}
