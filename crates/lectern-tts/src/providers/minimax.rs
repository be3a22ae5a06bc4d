//! MiniMax T2A v2 adapter.
//!
//! Authenticates with a bearer API key plus a group id query parameter.
//! Audio comes back hex-encoded inside a JSON envelope whose `base_resp`
//! carries the provider status code.

use async_trait::async_trait;
use lectern_core::{AudioFormat, AudioSettings, VoiceSettings};
use serde::{Deserialize, Serialize};

use super::env_value;
use crate::config::{NumericRange, ProviderConfig, TextLimits, VoiceOption};
use crate::error::TtsError;
use crate::http::{HttpClientConfig, error_from_response, transport_error};
use crate::provider::{SynthesizedAudio, TtsProvider, count_words};

/// Registry name.
pub const NAME: &str = "minimax";

const DEFAULT_BASE_URL: &str = "https://api.minimax.chat/v1/t2a_v2";

/// Provider status codes worth retrying: unknown error, timeout, RPM and TPM limits.
const TRANSIENT_CODES: [i64; 4] = [1000, 1001, 1002, 1039];

/// Connection settings for MiniMax.
#[derive(Debug, Clone, Default)]
pub struct MinimaxConfig {
    pub(crate) api_key: Option<String>,
    pub(crate) group_id: Option<String>,
    pub(crate) base_url: Option<String>,
    pub(crate) http: HttpClientConfig,
}

impl MinimaxConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `MINIMAX_API_KEY`, `MINIMAX_GROUP_ID` and `MINIMAX_BASE_URL`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: env_value(&lookup, "MINIMAX_API_KEY"),
            group_id: env_value(&lookup, "MINIMAX_GROUP_ID"),
            base_url: env_value(&lookup, "MINIMAX_BASE_URL"),
            http: HttpClientConfig::default(),
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Override the endpoint (tests point this at a mock server).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }
}

/// MiniMax speech provider.
pub struct MinimaxProvider {
    config: MinimaxConfig,
    client: reqwest::Client,
    catalog: ProviderConfig,
}

impl MinimaxProvider {
    pub fn new(config: MinimaxConfig) -> Result<Self, TtsError> {
        let client = config.http.build_client(NAME)?;
        Ok(Self {
            config,
            client,
            catalog: catalog(),
        })
    }

    fn endpoint(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    fn credentials(&self) -> Result<(&str, &str), TtsError> {
        match (self.config.api_key.as_deref(), self.config.group_id.as_deref()) {
            (Some(key), Some(group)) => Ok((key, group)),
            (None, _) => Err(not_configured("MINIMAX_API_KEY is not set")),
            (_, None) => Err(not_configured("MINIMAX_GROUP_ID is not set")),
        }
    }
}

fn not_configured(reason: &str) -> TtsError {
    TtsError::NotConfigured {
        provider: NAME.to_string(),
        reason: reason.to_string(),
    }
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct T2aRequest<'a> {
    model: &'a str,
    text: &'a str,
    stream: bool,
    voice_setting: VoiceSetting<'a>,
    audio_setting: AudioSetting,
}

#[derive(Debug, Serialize)]
struct VoiceSetting<'a> {
    voice_id: &'a str,
    speed: f32,
    vol: f32,
    pitch: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct AudioSetting {
    sample_rate: u32,
    bitrate: u32,
    format: &'static str,
    channel: u8,
}

#[derive(Debug, Deserialize)]
struct T2aResponse {
    data: Option<T2aData>,
    extra_info: Option<ExtraInfo>,
    base_resp: BaseResp,
}

#[derive(Debug, Deserialize)]
struct T2aData {
    audio: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtraInfo {
    audio_length: Option<u64>,
    audio_sample_rate: Option<u32>,
    word_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct BaseResp {
    status_code: i64,
    #[serde(default)]
    status_msg: String,
}

#[async_trait]
impl TtsProvider for MinimaxProvider {
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
        let (api_key, group_id) = self.credentials()?;
        self.catalog.validate(NAME, voice, audio, model)?;
        self.catalog.check_text(NAME, text)?;

        #[allow(clippy::cast_possible_truncation)]
        let body = T2aRequest {
            model,
            text,
            stream: false,
            voice_setting: VoiceSetting {
                voice_id: &voice.voice_id,
                speed: voice.speed,
                vol: 1.0,
                pitch: voice.pitch.round() as i32,
                emotion: voice.emotion.as_deref(),
            },
            audio_setting: AudioSetting {
                sample_rate: audio.sample_rate,
                bitrate: audio.bitrate,
                format: audio.format.as_str(),
                channel: 1,
            },
        };

        tracing::debug!(provider = NAME, model, chars = text.chars().count(), "Synthesizing");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("GroupId", group_id)])
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(NAME, &e))?;

        if !response.status().is_success() {
            return Err(error_from_response(NAME, response).await);
        }

        let parsed: T2aResponse = response
            .json()
            .await
            .map_err(|e| TtsError::malformed(NAME, e.to_string()))?;

        decode_response(parsed, text, audio)
    }
}

fn decode_response(
    parsed: T2aResponse,
    text: &str,
    audio: &AudioSettings,
) -> Result<SynthesizedAudio, TtsError> {
    let status = parsed.base_resp;
    if status.status_code != 0 {
        return Err(if TRANSIENT_CODES.contains(&status.status_code) {
            TtsError::Unavailable {
                provider: NAME.to_string(),
                status: 503,
                message: format!("{} ({})", status.status_msg, status.status_code),
            }
        } else {
            TtsError::Rejected {
                provider: NAME.to_string(),
                code: status.status_code,
                message: status.status_msg,
            }
        });
    }

    let hex_audio = parsed
        .data
        .and_then(|d| d.audio)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| TtsError::malformed(NAME, "response carries no audio"))?;
    let audio_bytes =
        decode_hex(&hex_audio).ok_or_else(|| TtsError::malformed(NAME, "audio is not valid hex"))?;

    let extra = parsed.extra_info;
    Ok(SynthesizedAudio {
        audio_bytes,
        duration_ms: extra.as_ref().and_then(|e| e.audio_length).unwrap_or(0),
        sample_rate: extra
            .as_ref()
            .and_then(|e| e.audio_sample_rate)
            .unwrap_or(audio.sample_rate),
        format: audio.format,
        word_count: extra
            .and_then(|e| e.word_count)
            .unwrap_or_else(|| count_words(text)),
    })
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

fn catalog() -> ProviderConfig {
    ProviderConfig {
        voices: vec![
            VoiceOption::new("male-qn-qingse", "青涩青年", "zh-CN"),
            VoiceOption::new("male-qn-jingying", "精英青年", "zh-CN"),
            VoiceOption::new("female-shaonv", "少女", "zh-CN"),
            VoiceOption::new("female-yujie", "御姐", "zh-CN"),
            VoiceOption::new("female-chengshu", "成熟女性", "zh-CN"),
            VoiceOption::new("female-tianmei", "甜美女性", "zh-CN"),
            VoiceOption::new("presenter_male", "男性主持人", "zh-CN"),
            VoiceOption::new("presenter_female", "女性主持人", "zh-CN"),
            VoiceOption::new("audiobook_male_1", "男性有声书", "zh-CN"),
            VoiceOption::new("audiobook_female_1", "女性有声书", "zh-CN"),
        ],
        models: ["speech-01-turbo", "speech-01-hd", "speech-02-turbo", "speech-02-hd"]
            .map(String::from)
            .to_vec(),
        emotions: [
            "happy",
            "sad",
            "angry",
            "fearful",
            "disgusted",
            "surprised",
            "neutral",
        ]
        .map(String::from)
        .to_vec(),
        formats: vec![AudioFormat::Mp3, AudioFormat::Wav, AudioFormat::Pcm],
        sample_rates: vec![8_000, 16_000, 22_050, 24_000, 32_000, 44_100],
        speed_range: NumericRange::new(0.5, 2.0, 1.0),
        pitch_range: NumericRange::new(-12.0, 12.0, 0.0),
        supports_emotion: true,
        default_voice: "female-tianmei".to_string(),
        default_model: "speech-01-turbo".to_string(),
        limits: TextLimits {
            max_chars: 5_000,
            max_bytes: 15_000,
        },
    }
}
