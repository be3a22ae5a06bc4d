//! Volcengine (ByteDance openspeech) adapter.
//!
//! Authenticates with `Authorization: Bearer;{token}` and an app id in the
//! body. The model selects the cluster. Audio comes back base64 encoded;
//! status code 3000 means success. Requests are capped at 1024 UTF-8 bytes.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lectern_core::{AudioFormat, AudioSettings, VoiceSettings};
use serde::{Deserialize, Serialize};

use super::env_value;
use crate::config::{NumericRange, ProviderConfig, TextLimits, VoiceOption};
use crate::error::TtsError;
use crate::http::{HttpClientConfig, status_error, transport_error};
use crate::provider::{SynthesizedAudio, TtsProvider, count_words};

/// Registry name.
pub const NAME: &str = "volcengine";

const DEFAULT_BASE_URL: &str = "https://openspeech.bytedance.com/api/v1/tts";
const DEFAULT_UID: &str = "lectern";
const SUCCESS_CODE: i64 = 3000;

/// Concurrency limit, server busy, timeout, wait timeout, backend link error.
const TRANSIENT_CODES: [i64; 5] = [3003, 3005, 3030, 3032, 3040];

/// Connection settings for Volcengine.
#[derive(Debug, Clone, Default)]
pub struct VolcengineConfig {
    pub(crate) app_id: Option<String>,
    pub(crate) access_token: Option<String>,
    pub(crate) base_url: Option<String>,
    pub(crate) uid: Option<String>,
    /// Default cluster (the model) when the caller does not pick one.
    pub(crate) cluster: Option<String>,
    pub(crate) http: HttpClientConfig,
}

impl VolcengineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `VOLCENGINE_APP_ID`, `VOLCENGINE_ACCESS_TOKEN`, `VOLCENGINE_CLUSTER`
    /// and `VOLCENGINE_BASE_URL`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            app_id: env_value(&lookup, "VOLCENGINE_APP_ID"),
            access_token: env_value(&lookup, "VOLCENGINE_ACCESS_TOKEN"),
            base_url: env_value(&lookup, "VOLCENGINE_BASE_URL"),
            uid: None,
            cluster: env_value(&lookup, "VOLCENGINE_CLUSTER"),
            http: HttpClientConfig::default(),
        }
    }

    #[must_use]
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Cluster used as the default model. Unlisted clusters are added to the catalog.
    #[must_use]
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// User id reported to the provider.
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    #[must_use]
    pub fn with_http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }
}

/// Volcengine speech provider.
pub struct VolcengineProvider {
    config: VolcengineConfig,
    client: reqwest::Client,
    catalog: ProviderConfig,
}

impl VolcengineProvider {
    pub fn new(config: VolcengineConfig) -> Result<Self, TtsError> {
        let client = config.http.build_client(NAME)?;
        let mut catalog = catalog();
        if let Some(cluster) = config.cluster.as_deref() {
            if !catalog.models.iter().any(|m| m == cluster) {
                catalog.models.push(cluster.to_string());
            }
            catalog.default_model = cluster.to_string();
        }
        Ok(Self {
            config,
            client,
            catalog,
        })
    }

    fn credentials(&self) -> Result<(&str, &str), TtsError> {
        let missing = |reason: &str| TtsError::NotConfigured {
            provider: NAME.to_string(),
            reason: reason.to_string(),
        };
        match (
            self.config.app_id.as_deref(),
            self.config.access_token.as_deref(),
        ) {
            (Some(app), Some(token)) => Ok((app, token)),
            (None, _) => Err(missing("VOLCENGINE_APP_ID is not set")),
            (_, None) => Err(missing("VOLCENGINE_ACCESS_TOKEN is not set")),
        }
    }
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    app: App<'a>,
    user: User<'a>,
    audio: AudioParams<'a>,
    request: RequestParams<'a>,
}

#[derive(Debug, Serialize)]
struct App<'a> {
    appid: &'a str,
    token: &'a str,
    cluster: &'a str,
}

#[derive(Debug, Serialize)]
struct User<'a> {
    uid: &'a str,
}

#[derive(Debug, Serialize)]
struct AudioParams<'a> {
    voice_type: &'a str,
    encoding: &'static str,
    rate: u32,
    speed_ratio: f32,
    volume_ratio: f32,
    pitch_ratio: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RequestParams<'a> {
    reqid: String,
    text: &'a str,
    text_type: &'static str,
    operation: &'static str,
}

#[derive(Debug, Deserialize)]
struct TtsResponse {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<String>,
    addition: Option<Addition>,
}

#[derive(Debug, Deserialize)]
struct Addition {
    /// Milliseconds, sent as a string.
    duration: Option<String>,
}

#[async_trait]
impl TtsProvider for VolcengineProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    fn config(&self) -> &ProviderConfig {
        &self.catalog
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSettings,
        audio: &AudioSettings,
        model: &str,
    ) -> Result<SynthesizedAudio, TtsError> {
        let (app_id, token) = self.credentials()?;
        self.catalog.validate(NAME, voice, audio, model)?;
        self.catalog.check_text(NAME, text)?;

        let body = TtsRequest {
            app: App {
                appid: app_id,
                token,
                cluster: model,
            },
            user: User {
                uid: self.config.uid.as_deref().unwrap_or(DEFAULT_UID),
            },
            audio: AudioParams {
                voice_type: &voice.voice_id,
                encoding: audio.format.as_str(),
                rate: audio.sample_rate,
                speed_ratio: voice.speed,
                volume_ratio: 1.0,
                pitch_ratio: voice.pitch,
                emotion: voice.emotion.as_deref(),
            },
            request: RequestParams {
                reqid: uuid::Uuid::new_v4().to_string(),
                text,
                text_type: "plain",
                operation: "query",
            },
        };

        tracing::debug!(provider = NAME, cluster = model, bytes = text.len(), "Synthesizing");

        let response = self
            .client
            .post(self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))
            .header("Authorization", format!("Bearer;{token}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(NAME, &e))?;

        // Provider errors arrive with 4xx/5xx status and a JSON code; read
        // the code when present so busy codes stay retryable.
        let status = response.status();
        let raw = response
            .bytes()
            .await
            .map_err(|e| transport_error(NAME, &e))?;
        let parsed: TtsResponse = match serde_json::from_slice(&raw) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(status_error(NAME, status, &String::from_utf8_lossy(&raw)));
            }
            Err(e) => return Err(TtsError::malformed(NAME, e.to_string())),
        };

        decode_response(parsed, text, audio)
    }
}

fn decode_response(
    parsed: TtsResponse,
    text: &str,
    audio: &AudioSettings,
) -> Result<SynthesizedAudio, TtsError> {
    if parsed.code != SUCCESS_CODE {
        return Err(if TRANSIENT_CODES.contains(&parsed.code) {
            TtsError::Unavailable {
                provider: NAME.to_string(),
                status: 503,
                message: format!("{} ({})", parsed.message, parsed.code),
            }
        } else {
            TtsError::Rejected {
                provider: NAME.to_string(),
                code: parsed.code,
                message: parsed.message,
            }
        });
    }

    let encoded = parsed
        .data
        .filter(|d| !d.is_empty())
        .ok_or_else(|| TtsError::malformed(NAME, "response carries no audio"))?;
    let audio_bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| TtsError::malformed(NAME, format!("audio is not valid base64: {e}")))?;

    let duration_ms = parsed
        .addition
        .and_then(|a| a.duration)
        .and_then(|d| d.trim().parse().ok())
        .unwrap_or(0);

    Ok(SynthesizedAudio {
        audio_bytes,
        duration_ms,
        sample_rate: audio.sample_rate,
        format: audio.format,
        word_count: count_words(text),
    })
}

fn catalog() -> ProviderConfig {
    ProviderConfig {
        voices: vec![
            VoiceOption::new("BV001_streaming", "通用女声", "zh-CN"),
            VoiceOption::new("BV002_streaming", "通用男声", "zh-CN"),
            VoiceOption::new("BV700_streaming", "灿灿", "zh-CN"),
            VoiceOption::new("BV701_streaming", "擎苍", "zh-CN"),
            VoiceOption::new("BV406_streaming", "超自然音色-梓梓", "zh-CN"),
            VoiceOption::new("BV407_streaming", "超自然音色-燃燃", "zh-CN"),
            VoiceOption::new("BV503_streaming", "活力女声-Ariana", "en-US"),
            VoiceOption::new("BV504_streaming", "活力男声-Jackson", "en-US"),
        ],
        models: ["volcano_tts", "volcano_mega"].map(String::from).to_vec(),
        emotions: [
            "happy", "sad", "angry", "scare", "hate", "surprise", "pleased", "sorry", "annoyed",
            "narrator",
        ]
        .map(String::from)
        .to_vec(),
        formats: vec![AudioFormat::Mp3, AudioFormat::Wav, AudioFormat::Pcm],
        sample_rates: vec![8_000, 16_000, 24_000],
        speed_range: NumericRange::new(0.2, 3.0, 1.0),
        pitch_range: NumericRange::new(0.1, 3.0, 1.0),
        supports_emotion: true,
        default_voice: "BV700_streaming".to_string(),
        default_model: "volcano_tts".to_string(),
        limits: TextLimits {
            max_chars: 1_024,
            max_bytes: 1_024,
        },
    }
}
