//! Domain types shared by every lectern crate.
//!
//! These are pure data types with no infrastructure dependencies.

mod audio;
mod visual;
mod voice;

pub use audio::{AudioRecord, AudioStatus};
pub use visual::VisualKind;
pub use voice::{AudioFormat, AudioSettings, VoiceSettings};
