//! One synthesis unit per audio region.
//!
//! A unit accumulates the speakable text of a region, cuts it into
//! sentence-aligned chunks as soon as complete sentences arrive, and
//! submits each chunk to the shared pool. Results come back in any order;
//! the unit re-sequences them by chunk index before emitting events.
//!
//! ```text
//!  Open ──finalize()──▶ Draining ──all tasks joined──▶ Finalized
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use lectern_core::{AudioRecord, AudioStatus, PipelineEvent};
use lectern_tts::TtsError;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::audio;
use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::text::{
    complete_prefix_len, first_cut, is_speakable, last_settled_break, open_markup_start,
    preprocess, split,
};

/// Lifecycle of a [`SynthesisUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Accepting text.
    Open,
    /// Flushing the tail and waiting for outstanding chunks.
    Draining,
    /// Audio persisted (or nothing to persist); inert.
    Finalized,
}

/// Result of one chunk. Failed chunks carry no audio.
#[derive(Debug, Default)]
struct ChunkOutcome {
    audio: Vec<u8>,
    duration_ms: u64,
    failed: bool,
}

impl ChunkOutcome {
    fn silent() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }
}

/// Streaming synthesizer for the audio of a single region.
#[derive(Debug)]
pub struct SynthesisUnit {
    position: u32,
    ctx: PipelineContext,
    state: UnitState,
    /// Text fed but not yet cut into chunks.
    tail: String,
    next_index: usize,
    tasks: JoinSet<(usize, ChunkOutcome)>,
    /// Finished chunks waiting for their turn.
    results: BTreeMap<usize, ChunkOutcome>,
    next_expected: usize,
    /// Chunks already emitted, kept for concatenation.
    emitted: Vec<ChunkOutcome>,
    text_chars: usize,
}

impl SynthesisUnit {
    pub fn new(position: u32, ctx: PipelineContext) -> Self {
        Self {
            position,
            ctx,
            state: UnitState::Open,
            tail: String::new(),
            next_index: 0,
            tasks: JoinSet::new(),
            results: BTreeMap::new(),
            next_expected: 0,
            emitted: Vec::new(),
            text_chars: 0,
        }
    }

    pub const fn position(&self) -> u32 {
        self.position
    }

    pub const fn state(&self) -> UnitState {
        self.state
    }

    /// Whether at least one chunk was submitted.
    pub const fn has_chunks(&self) -> bool {
        self.next_index > 0
    }

    /// Append region text; submits every chunk that is ready.
    ///
    /// Waits for a pool slot when the pool is saturated.
    pub async fn feed(&mut self, text: &str) -> PipelineResult<()> {
        if self.state != UnitState::Open {
            return Err(PipelineError::UnitClosed {
                position: self.position,
            });
        }
        self.tail.push_str(text);
        self.submit_ready().await
    }

    /// Collect finished chunks and emit the in-order run at the cursor.
    ///
    /// The most recently submitted chunk is held back while the unit is
    /// open, since only [`finalize`](Self::finalize) knows it is the last.
    pub fn poll_ready(&mut self) -> Vec<PipelineEvent> {
        while let Some(joined) = self.tasks.try_join_next() {
            self.collect(joined);
        }
        self.emit_ready(false)
    }

    /// Flush, wait for every chunk, emit the remaining segments and persist
    /// the concatenated audio.
    ///
    /// Returns the remaining `AudioSegment` events followed by one
    /// `AudioComplete`. Units without chunks, units whose chunks all failed
    /// and cancelled units emit no `AudioComplete`. Calling this twice is a
    /// no-op.
    pub async fn finalize(&mut self) -> PipelineResult<Vec<PipelineEvent>> {
        if self.state != UnitState::Open {
            return Ok(Vec::new());
        }
        self.state = UnitState::Draining;

        let rest = std::mem::take(&mut self.tail);
        self.submit_text(&rest).await?;

        while let Some(joined) = self.tasks.join_next().await {
            self.collect(joined);
        }

        if self.ctx.is_cancelled() {
            self.state = UnitState::Finalized;
            debug!(position = self.position, "Unit cancelled; discarding results");
            return Ok(Vec::new());
        }

        for index in self.next_expected..self.next_index {
            self.results.entry(index).or_insert_with(ChunkOutcome::silent);
        }
        let mut events = self.emit_ready(true);
        self.state = UnitState::Finalized;

        if !self.has_chunks() {
            return Ok(events);
        }
        if let Some(complete) = self.persist().await {
            events.push(complete);
        }
        Ok(events)
    }

    // ── Submission ─────────────────────────────────────────────────

    async fn submit_ready(&mut self) -> PipelineResult<()> {
        let (max_chars, max_bytes) = self.ctx.chunk_limits();
        let min_chars = self.ctx.settings.min_chunk_chars;

        loop {
            let complete = complete_prefix_len(&self.tail);
            let cut = if complete > 0 && self.tail[..complete].trim().chars().count() >= min_chars {
                complete
            } else if self.tail.chars().count() > max_chars || self.tail.len() > max_bytes {
                // Forced cuts never split inline markup; `split` applies the
                // caps to the preprocessed text.
                match last_settled_break(&self.tail) {
                    Some(cut) => cut,
                    None if open_markup_start(&self.tail).is_none() => {
                        first_cut(&self.tail, max_chars, max_bytes)
                    }
                    None => return Ok(()),
                }
            } else {
                return Ok(());
            };
            let head: String = self.tail.drain(..cut).collect();
            self.submit_text(&head).await?;
        }
    }

    /// Preprocess, split and submit one slice of region text.
    async fn submit_text(&mut self, raw: &str) -> PipelineResult<()> {
        if self.ctx.is_cancelled() || raw.trim().is_empty() {
            return Ok(());
        }
        let (max_chars, max_bytes) = self.ctx.chunk_limits();
        let prose = preprocess(raw);
        for piece in split(&prose, max_chars, max_bytes) {
            if is_speakable(&piece) {
                self.submit(piece).await?;
            }
        }
        Ok(())
    }

    async fn submit(&mut self, text: String) -> PipelineResult<()> {
        let permit = tokio::select! {
            biased;
            () = self.ctx.cancel.cancelled() => return Ok(()),
            permit = self.ctx.pool.reserve() => permit?,
        };

        let index = self.next_index;
        self.next_index += 1;
        self.text_chars += text.chars().count();
        debug!(
            position = self.position,
            chunk_index = index,
            chars = text.chars().count(),
            "Submitting chunk"
        );

        let ctx = self.ctx.clone();
        let position = self.position;
        self.tasks.spawn(async move {
            let _permit = permit;
            (index, synthesize_chunk(&ctx, position, index, &text).await)
        });
        Ok(())
    }

    // ── Collection ─────────────────────────────────────────────────

    fn collect(&mut self, joined: Result<(usize, ChunkOutcome), JoinError>) {
        match joined {
            Ok((index, outcome)) => {
                self.results.insert(index, outcome);
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                // The chunk's slot is filled with silence at finalize.
                error!(position = self.position, error = %e, "Synthesis task panicked");
            }
        }
    }

    fn emit_ready(&mut self, last_known: bool) -> Vec<PipelineEvent> {
        let limit = if last_known {
            self.next_index
        } else {
            self.next_index.saturating_sub(1)
        };

        let mut events = Vec::new();
        while self.next_expected < limit {
            let Some(outcome) = self.results.remove(&self.next_expected) else {
                break;
            };
            let index = self.next_expected;
            self.next_expected += 1;
            events.push(PipelineEvent::AudioSegment {
                position: self.position,
                chunk_index: index,
                audio_data: outcome.audio.clone(),
                duration_ms: outcome.duration_ms,
                is_final: last_known && index + 1 == self.next_index,
            });
            self.emitted.push(outcome);
        }
        events
    }

    // ── Persistence ────────────────────────────────────────────────

    /// Concatenate, upload and record the region audio.
    async fn persist(&mut self) -> Option<PipelineEvent> {
        let total_bytes: usize = self.emitted.iter().map(|o| o.audio.len()).sum();
        if total_bytes == 0 {
            warn!(
                position = self.position,
                chunks = self.emitted.len(),
                "Every chunk failed; no audio to persist"
            );
            return None;
        }

        let duration_ms: u64 = self.emitted.iter().map(|o| o.duration_ms).sum();
        let failed = self.emitted.iter().filter(|o| o.failed).count();
        let segment_count = self.emitted.len();
        let parts: Vec<Vec<u8>> = self.emitted.drain(..).map(|o| o.audio).collect();

        let format = self.ctx.audio.format;
        let bytes = audio::concat(format, &parts).unwrap_or_else(|e| {
            error!(position = self.position, error = %e, "Audio concatenation failed; joining raw bytes");
            parts.concat()
        });

        let key = format!("{}/{}.{}", self.ctx.block_id, self.position, format.extension());
        let audio_url = match self
            .ctx
            .storage
            .upload(&key, &bytes, format.content_type())
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                error!(position = self.position, key = %key, error = %e, "Audio upload failed");
                None
            }
        };

        let record = AudioRecord {
            block_id: self.ctx.block_id.clone(),
            position: self.position,
            audio_url: audio_url.clone(),
            duration_ms,
            format,
            sample_rate: self.ctx.audio.sample_rate,
            voice_settings: self.ctx.voice.clone(),
            model: self.ctx.model.clone(),
            text_length: self.text_chars,
            segment_count,
            status: if failed > 0 {
                AudioStatus::Partial
            } else {
                AudioStatus::Completed
            },
            created_at: Utc::now(),
        };
        if let Err(e) = self.ctx.records.insert(&record).await {
            error!(position = self.position, error = %e, "Failed to persist audio record");
        }

        info!(
            block_id = %self.ctx.block_id,
            position = self.position,
            chunks = segment_count,
            failed,
            duration_ms,
            bytes = bytes.len(),
            "Region audio finalized"
        );

        Some(PipelineEvent::AudioComplete {
            position: self.position,
            audio_url,
            duration_ms,
        })
    }
}

/// Synthesize one chunk with timeout and bounded retry.
///
/// Never fails: an exhausted or non-retryable error degrades to a silent
/// chunk so later chunks are never blocked.
async fn synthesize_chunk(
    ctx: &PipelineContext,
    position: u32,
    index: usize,
    text: &str,
) -> ChunkOutcome {
    let provider = ctx.provider.name();
    let timeout = ctx.settings.synthesis_timeout();
    let max_attempts = ctx.settings.retry_attempts + 1;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let call = ctx.provider.synthesize(text, &ctx.voice, &ctx.audio, &ctx.model);
        let result = tokio::time::timeout(timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(TtsError::Timeout {
                    provider: provider.to_string(),
                })
            });

        match result {
            Ok(synth) => {
                let duration_ms = if synth.duration_ms > 0 {
                    synth.duration_ms
                } else {
                    audio::measure_duration_ms(&synth.audio_bytes, synth.format, synth.sample_rate)
                };
                return ChunkOutcome {
                    audio: synth.audio_bytes,
                    duration_ms,
                    failed: false,
                };
            }
            Err(e) if e.is_transient() && attempt < max_attempts && !ctx.is_cancelled() => {
                warn!(
                    position,
                    chunk_index = index,
                    provider,
                    attempt,
                    error = %e,
                    "Transient synthesis failure; retrying"
                );
            }
            Err(e) => {
                warn!(
                    position,
                    chunk_index = index,
                    provider,
                    attempt,
                    error = %e,
                    "Chunk synthesis failed; continuing with silence"
                );
                return ChunkOutcome::silent();
            }
        }
    }
}
