//! Streaming audio-visual narration engine.
//!
//! Turns an incrementally generated markdown stream into ordered audio
//! while carving visual elements (diagrams, tables, code, math) out of the
//! narration and reporting where they sit on the audio timeline.
//!
//! ```text
//! text deltas ──▶ VisualOrchestrator ──scan──▶ boundary detector
//!                     │  speakable text
//!                     ▼
//!               SynthesisUnit (one per region)
//!                     │  sentence chunks
//!                     ▼
//!               SynthesisPool ──▶ TtsProvider  (parallel, bounded)
//!                     │  results in any order
//!                     ▼
//!        ordered AudioSegment events ──▶ concat ──▶ storage + record
//! ```
//!
//! The orchestrator is a single-owner state machine driven by the caller's
//! sequential `process_chunk` / `finalize` calls; each call returns the
//! events that became ready.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod audio;
pub mod boundary;
mod context;
mod error;
mod orchestrator;
mod pool;
pub mod text;
mod unit;

// ============================================================================
// Public API
// ============================================================================

pub use boundary::{
    Scan, VisualMatch, find_earliest_complete, has_incomplete_tail, safe_prefix_len, scan, scan_with,
};
pub use context::PipelineContext;
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::VisualOrchestrator;
pub use pool::SynthesisPool;
pub use text::{preprocess, split, split_sentences};
pub use unit::{SynthesisUnit, UnitState};

// Silence unused dev-dependency warnings
#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use mockall as _;
