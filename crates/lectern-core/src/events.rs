//! Canonical outbound event union.
//!
//! The pipeline produces these for its caller, which forwards them over
//! whatever transport it owns (SSE, WebSocket, CLI output).
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "visual_marker", "position": 1, "kind": "svg", "content": "<svg>…</svg>" }
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::VisualKind;

/// Events emitted by the orchestrator, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Passthrough of an inbound text increment.
    Content { text: String },

    /// A visual element was carved out of the narration.
    VisualMarker {
        position: u32,
        kind: VisualKind,
        content: String,
    },

    /// One synthesized chunk, delivered in strict chunk order per region.
    AudioSegment {
        position: u32,
        #[serde(rename = "chunkIndex")]
        chunk_index: usize,
        /// Encoded audio, base64 on the wire.
        #[serde(rename = "audioData", with = "base64_bytes")]
        audio_data: Vec<u8>,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
        /// Set on the last segment of the region.
        #[serde(rename = "isFinal")]
        is_final: bool,
    },

    /// A region finished; its concatenated audio is persisted.
    AudioComplete {
        position: u32,
        #[serde(rename = "audioUrl")]
        audio_url: Option<String>,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },

    /// Interaction break forwarded from the text source.
    Break,
}

impl PipelineEvent {
    /// Region position carried by the event, if any.
    #[must_use]
    pub const fn position(&self) -> Option<u32> {
        match self {
            Self::VisualMarker { position, .. }
            | Self::AudioSegment { position, .. }
            | Self::AudioComplete { position, .. } => Some(*position),
            Self::Content { .. } | Self::Break => None,
        }
    }

    /// Whether this is an audio segment or completion event.
    #[must_use]
    pub const fn is_audio(&self) -> bool {
        matches!(self, Self::AudioSegment { .. } | Self::AudioComplete { .. })
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visual_marker_wire_shape() {
        let event = PipelineEvent::VisualMarker {
            position: 1,
            kind: VisualKind::Svg,
            content: "<svg></svg>".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "visual_marker");
        assert_eq!(json["kind"], "svg");
        assert_eq!(json["position"], 1);
    }

    #[test]
    fn test_audio_segment_encodes_base64() {
        let event = PipelineEvent::AudioSegment {
            position: 0,
            chunk_index: 2,
            audio_data: vec![0xff, 0xfb, 0x90],
            duration_ms: 120,
            is_final: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "audio_segment");
        assert_eq!(json["audioData"], "//uQ");
        assert_eq!(json["chunkIndex"], 2);

        let back: PipelineEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_break_has_only_tag() {
        let json = serde_json::to_string(&PipelineEvent::Break).unwrap();
        assert_eq!(json, r#"{"type":"break"}"#);
    }

    #[test]
    fn test_position_accessor() {
        assert_eq!(PipelineEvent::Break.position(), None);
        let complete = PipelineEvent::AudioComplete {
            position: 3,
            audio_url: None,
            duration_ms: 0,
        };
        assert_eq!(complete.position(), Some(3));
        assert!(complete.is_audio());
    }
}
