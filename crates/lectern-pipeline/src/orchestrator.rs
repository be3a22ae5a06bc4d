//! Visual-aware orchestration of one generated block.
//!
//! The orchestrator owns the raw text buffer and the current synthesis
//! unit. The buffer is append-only; `fed_offset` marks how much of it has
//! been narrated or consumed as a visual element, and only moves forward.
//! Each text delta is scanned for visual elements; text in front of
//! an element is narrated, a complete element closes the current audio
//! region and is reported as a marker, and an unfinished element holds
//! everything from its start until it completes.
//!
//! Positions count audio regions. A visual marker carries the position of
//! the region that follows it, so back-to-back visuals with no narration in
//! between share a position.

use lectern_core::PipelineEvent;
use tracing::debug;

use crate::boundary::{Scan, safe_prefix_len, scan_with};
use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::unit::SynthesisUnit;

/// Drives boundary detection and synthesis units for one block.
#[derive(Debug)]
pub struct VisualOrchestrator {
    ctx: PipelineContext,
    /// Every delta received so far.
    buffer: String,
    /// Bytes of `buffer` already handed to a unit or consumed as a visual.
    fed_offset: usize,
    position: u32,
    unit: SynthesisUnit,
    finalized: bool,
}

impl VisualOrchestrator {
    /// Validate the request and open the first region at position 0.
    pub fn new(ctx: PipelineContext) -> PipelineResult<Self> {
        ctx.validate()?;
        debug!(
            block_id = %ctx.block_id,
            provider = ctx.provider_name(),
            model = %ctx.model,
            "Starting narration"
        );
        Ok(Self {
            unit: SynthesisUnit::new(0, ctx.clone()),
            ctx,
            buffer: String::new(),
            fed_offset: 0,
            position: 0,
            finalized: false,
        })
    }

    /// Position of the region currently being narrated.
    pub const fn position(&self) -> u32 {
        self.position
    }

    /// Bytes of raw text already narrated or consumed as a visual element.
    pub const fn fed_offset(&self) -> usize {
        self.fed_offset
    }

    /// Bytes of raw text received so far.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub const fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Stop submitting new chunks. In-flight chunks finish but their audio
    /// is discarded and nothing more is persisted.
    pub fn cancel(&self) {
        self.ctx.cancel.cancel();
    }

    /// Accept the next text delta and return the events it made ready.
    pub async fn process_chunk(&mut self, text: &str) -> PipelineResult<Vec<PipelineEvent>> {
        if self.finalized {
            return Err(PipelineError::AlreadyFinalized);
        }
        let mut events = Vec::new();
        if self.ctx.is_cancelled() {
            return Ok(events);
        }

        if self.ctx.settings.emit_content && !text.is_empty() {
            events.push(PipelineEvent::Content {
                text: text.to_string(),
            });
        }
        self.buffer.push_str(text);
        self.drive(false, &mut events).await?;
        events.extend(self.unit.poll_ready());
        Ok(self.drop_audio_if_cancelled(events))
    }

    /// Close the current region without a visual and emit `Break`.
    ///
    /// Text still held back is narrated first; generation may continue
    /// afterwards.
    pub async fn process_break(&mut self) -> PipelineResult<Vec<PipelineEvent>> {
        if self.finalized {
            return Err(PipelineError::AlreadyFinalized);
        }
        let mut events = Vec::new();
        if self.ctx.is_cancelled() {
            return Ok(events);
        }

        self.drive(true, &mut events).await?;
        self.close_region(&mut events).await?;
        debug!(position = self.position, "Break");
        events.push(PipelineEvent::Break);
        Ok(self.drop_audio_if_cancelled(events))
    }

    /// Flush everything and finalize the last region.
    ///
    /// An unfinished visual element at end of stream is never reported as a
    /// marker; the preprocessor strips its unclosed markup before anything
    /// is spoken. A second call returns no events.
    pub async fn finalize(&mut self) -> PipelineResult<Vec<PipelineEvent>> {
        if self.finalized {
            return Ok(Vec::new());
        }
        self.finalized = true;

        let mut events = Vec::new();
        if !self.ctx.is_cancelled() {
            self.drive(true, &mut events).await?;
        }
        events.extend(self.unit.finalize().await?);
        debug!(
            block_id = %self.ctx.block_id,
            regions = self.position + u32::from(self.unit.has_chunks()),
            "Narration finalized"
        );
        Ok(self.drop_audio_if_cancelled(events))
    }

    /// Scan the unfed suffix and feed every safe prefix, closing a region at
    /// each complete visual element.
    async fn drive(&mut self, at_end: bool, events: &mut Vec<PipelineEvent>) -> PipelineResult<()> {
        loop {
            let base = self.fed_offset;
            match scan_with(&self.buffer[base..], at_end) {
                Scan::Complete(m) => {
                    self.feed_through(base + m.start).await?;
                    self.close_region(events).await?;
                    debug!(
                        position = self.position,
                        kind = %m.kind,
                        bytes = m.content.len(),
                        "Visual element complete"
                    );
                    self.advance(base + m.end);
                    events.push(PipelineEvent::VisualMarker {
                        position: self.position,
                        kind: m.kind,
                        content: m.content,
                    });
                }
                Scan::Incomplete { start } if !at_end => {
                    if start > 0 {
                        debug!(position = self.position, start, "Waiting for visual element to complete");
                    }
                    return self.feed_through(base + start).await;
                }
                Scan::Incomplete { .. } | Scan::Absent => {
                    let safe = safe_prefix_len(&self.buffer[base..], at_end);
                    return self.feed_through(base + safe).await;
                }
            }
        }
    }

    /// Hand `buffer[fed_offset..end]` to the current unit.
    async fn feed_through(&mut self, end: usize) -> PipelineResult<()> {
        let start = self.fed_offset;
        self.advance(end);
        self.unit.feed(&self.buffer[start..end]).await
    }

    fn advance(&mut self, offset: usize) {
        debug_assert!(offset >= self.fed_offset, "fed_offset moved backwards");
        debug_assert!(self.buffer.is_char_boundary(offset));
        self.fed_offset = offset;
    }

    /// Finalize the current unit and open the next one. The position only
    /// advances when the closed region actually produced chunks.
    async fn close_region(&mut self, events: &mut Vec<PipelineEvent>) -> PipelineResult<()> {
        events.extend(self.unit.finalize().await?);
        if self.unit.has_chunks() {
            self.position += 1;
        }
        self.unit = SynthesisUnit::new(self.position, self.ctx.clone());
        Ok(())
    }

    fn drop_audio_if_cancelled(&self, events: Vec<PipelineEvent>) -> Vec<PipelineEvent> {
        if self.ctx.is_cancelled() {
            events.into_iter().filter(|e| !e.is_audio()).collect()
        } else {
            events
        }
    }
}
