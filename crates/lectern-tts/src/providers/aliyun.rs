//! Aliyun Intelligent Speech Interaction (NLS) adapter.
//!
//! Synthesis calls need a short-lived access token obtained from a signed
//! `CreateToken` request (HMAC-SHA1 over the canonical query string). The
//! token is cached and refreshed before it expires; concurrent callers
//! share a single refresh. A token the gateway reports as invalid is
//! dropped and the error is marked retryable so the next attempt fetches a
//! new one.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use lectern_core::{AudioFormat, AudioSettings, VoiceSettings};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use super::env_value;
use crate::config::{NumericRange, ProviderConfig, TextLimits, VoiceOption};
use crate::error::TtsError;
use crate::http::{HttpClientConfig, status_error, transport_error};
use crate::provider::{SynthesizedAudio, TtsProvider, count_words};
use crate::token::{CachedToken, TokenCache};

/// Registry name.
pub const NAME: &str = "aliyun";

const DEFAULT_REGION: &str = "cn-shanghai";
const DEFAULT_TOKEN_URL: &str = "https://nls-meta.cn-shanghai.aliyuncs.com/";
const DEFAULT_TTS_URL: &str = "https://nls-gateway-cn-shanghai.aliyuncs.com/stream/v1/tts";
const API_VERSION: &str = "2019-02-28";

/// Gateway status for an invalid or expired token.
const STATUS_INVALID_TOKEN: i64 = 40_000_001;
/// Gateway status for too many requests.
const STATUS_TOO_MANY_REQUESTS: i64 = 40_000_005;

type HmacSha1 = Hmac<Sha1>;

/// Connection settings for Aliyun NLS.
#[derive(Debug, Clone)]
pub struct AliyunConfig {
    pub(crate) access_key_id: Option<String>,
    pub(crate) access_key_secret: Option<String>,
    pub(crate) app_key: Option<String>,
    pub(crate) region: String,
    pub(crate) token_url: String,
    pub(crate) tts_url: String,
    /// Refresh tokens this long before they expire.
    pub(crate) refresh_margin: chrono::Duration,
    pub(crate) http: HttpClientConfig,
}

impl Default for AliyunConfig {
    fn default() -> Self {
        Self {
            access_key_id: None,
            access_key_secret: None,
            app_key: None,
            region: DEFAULT_REGION.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            tts_url: DEFAULT_TTS_URL.to_string(),
            refresh_margin: chrono::Duration::minutes(5),
            http: HttpClientConfig::default(),
        }
    }
}

impl AliyunConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `ALIYUN_ACCESS_KEY_ID`, `ALIYUN_ACCESS_KEY_SECRET`, `ALIYUN_APP_KEY`
    /// and the optional `ALIYUN_REGION`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self {
            access_key_id: env_value(&lookup, "ALIYUN_ACCESS_KEY_ID"),
            access_key_secret: env_value(&lookup, "ALIYUN_ACCESS_KEY_SECRET"),
            app_key: env_value(&lookup, "ALIYUN_APP_KEY"),
            ..Self::default()
        };
        if let Some(region) = env_value(&lookup, "ALIYUN_REGION") {
            config = config.with_region(region);
        }
        config
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.access_key_secret = Some(access_key_secret.into());
        self
    }

    #[must_use]
    pub fn with_app_key(mut self, app_key: impl Into<String>) -> Self {
        self.app_key = Some(app_key.into());
        self
    }

    /// Switch region; both endpoints follow it.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        self.token_url = format!("https://nls-meta.{region}.aliyuncs.com/");
        self.tts_url = format!("https://nls-gateway-{region}.aliyuncs.com/stream/v1/tts");
        self.region = region;
        self
    }

    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    #[must_use]
    pub fn with_tts_url(mut self, url: impl Into<String>) -> Self {
        self.tts_url = url.into();
        self
    }

    #[must_use]
    pub const fn with_refresh_margin(mut self, margin: chrono::Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    #[must_use]
    pub fn with_http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }
}

struct Credentials<'a> {
    access_key_id: &'a str,
    access_key_secret: &'a str,
    app_key: &'a str,
}

/// Aliyun NLS speech provider.
pub struct AliyunProvider {
    config: AliyunConfig,
    client: reqwest::Client,
    catalog: ProviderConfig,
    tokens: TokenCache,
}

impl AliyunProvider {
    pub fn new(config: AliyunConfig) -> Result<Self, TtsError> {
        let client = config.http.build_client(NAME)?;
        let tokens = TokenCache::new(config.refresh_margin);
        Ok(Self {
            config,
            client,
            catalog: catalog(),
            tokens,
        })
    }

    fn credentials(&self) -> Result<Credentials<'_>, TtsError> {
        let missing = |key: &str| TtsError::NotConfigured {
            provider: NAME.to_string(),
            reason: format!("{key} is not set"),
        };
        Ok(Credentials {
            access_key_id: self
                .config
                .access_key_id
                .as_deref()
                .ok_or_else(|| missing("ALIYUN_ACCESS_KEY_ID"))?,
            access_key_secret: self
                .config
                .access_key_secret
                .as_deref()
                .ok_or_else(|| missing("ALIYUN_ACCESS_KEY_SECRET"))?,
            app_key: self
                .config
                .app_key
                .as_deref()
                .ok_or_else(|| missing("ALIYUN_APP_KEY"))?,
        })
    }

    /// Issue a signed `CreateToken` call.
    async fn create_token(&self, creds: &Credentials<'_>) -> Result<CachedToken, TtsError> {
        let mut params = BTreeMap::new();
        params.insert("AccessKeyId", creds.access_key_id.to_string());
        params.insert("Action", "CreateToken".to_string());
        params.insert("Format", "JSON".to_string());
        params.insert("RegionId", self.config.region.clone());
        params.insert("SignatureMethod", "HMAC-SHA1".to_string());
        params.insert("SignatureNonce", uuid::Uuid::new_v4().to_string());
        params.insert("SignatureVersion", "1.0".to_string());
        params.insert(
            "Timestamp",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        params.insert("Version", API_VERSION.to_string());

        let query = canonical_query(&params);
        let signature = sign(&string_to_sign(&query), creds.access_key_secret)?;
        let url = format!(
            "{}?Signature={}&{query}",
            self.config.token_url,
            percent_encode(&signature)
        );

        tracing::debug!(provider = NAME, region = %self.config.region, "Requesting access token");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(NAME, &e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(NAME, &e))?;

        if status.is_server_error() {
            return Err(status_error(NAME, status, &body));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                TtsError::malformed(NAME, format!("token response: {e}"))
            } else {
                auth_error(body.clone(), false)
            }
        })?;

        match parsed.token {
            Some(token) if status.is_success() => {
                let expires_at = DateTime::from_timestamp(token.expire_time, 0).ok_or_else(|| {
                    TtsError::malformed(NAME, format!("bad ExpireTime {}", token.expire_time))
                })?;
                Ok(CachedToken {
                    value: token.id,
                    expires_at,
                })
            }
            _ => Err(auth_error(
                parsed
                    .err_msg
                    .or(parsed.message)
                    .unwrap_or_else(|| format!("CreateToken failed with HTTP {status}")),
                false,
            )),
        }
    }
}

fn auth_error(message: String, retryable: bool) -> TtsError {
    TtsError::Authentication {
        provider: NAME.to_string(),
        message,
        retryable,
    }
}

// ── Request signing ────────────────────────────────────────────────

/// RFC 3986 percent-encoding, as the POP signature scheme requires.
fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `k=v` pairs sorted by key, each side percent-encoded, joined with `&`.
fn canonical_query(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn string_to_sign(canonical_query: &str) -> String {
    format!(
        "GET&{}&{}",
        percent_encode("/"),
        percent_encode(canonical_query)
    )
}

/// Base64 HMAC-SHA1 keyed with `secret + "&"`.
fn sign(string_to_sign: &str, secret: &str) -> Result<String, TtsError> {
    let mut mac = HmacSha1::new_from_slice(format!("{secret}&").as_bytes()).map_err(|e| {
        TtsError::NotConfigured {
            provider: NAME.to_string(),
            reason: format!("invalid signing key: {e}"),
        }
    })?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "Token")]
    token: Option<TokenBody>,
    #[serde(rename = "ErrMsg")]
    err_msg: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "ExpireTime")]
    expire_time: i64,
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    appkey: &'a str,
    token: &'a str,
    text: &'a str,
    format: &'static str,
    sample_rate: u32,
    voice: &'a str,
    volume: u8,
    speech_rate: i32,
    pitch_rate: i32,
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    status: i64,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl TtsProvider for AliyunProvider {
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
        let creds = self.credentials()?;
        self.catalog.validate(NAME, voice, audio, model)?;
        self.catalog.check_text(NAME, text)?;

        let token = self
            .tokens
            .get_or_refresh(|| self.create_token(&creds))
            .await?;

        #[allow(clippy::cast_possible_truncation)]
        let body = TtsRequest {
            appkey: creds.app_key,
            token: &token,
            text,
            format: audio.format.as_str(),
            sample_rate: audio.sample_rate,
            voice: &voice.voice_id,
            volume: 50,
            speech_rate: voice.speed.round() as i32,
            pitch_rate: voice.pitch.round() as i32,
        };

        tracing::debug!(provider = NAME, voice = %voice.voice_id, chars = text.chars().count(), "Synthesizing");

        let response = self
            .client
            .post(&self.config.tts_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(NAME, &e))?;

        let status = response.status();
        let is_audio = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("audio/"));
        let raw = response
            .bytes()
            .await
            .map_err(|e| transport_error(NAME, &e))?;

        if status.is_success() && is_audio {
            if raw.is_empty() {
                return Err(TtsError::malformed(NAME, "empty audio body"));
            }
            return Ok(SynthesizedAudio {
                audio_bytes: raw.to_vec(),
                duration_ms: 0,
                sample_rate: audio.sample_rate,
                format: audio.format,
                word_count: count_words(text),
            });
        }

        let Ok(gateway) = serde_json::from_slice::<GatewayError>(&raw) else {
            let body = String::from_utf8_lossy(&raw);
            return Err(if status.is_success() {
                TtsError::malformed(NAME, "response is neither audio nor a gateway error")
            } else {
                status_error(NAME, status, &body)
            });
        };

        if gateway.status == STATUS_INVALID_TOKEN {
            self.tokens.invalidate().await;
            return Err(auth_error(gateway.message, true));
        }
        if gateway.status >= 50_000_000 || gateway.status == STATUS_TOO_MANY_REQUESTS {
            return Err(TtsError::Unavailable {
                provider: NAME.to_string(),
                status: if status.is_success() { 503 } else { status.as_u16() },
                message: format!("{} ({})", gateway.message, gateway.status),
            });
        }
        Err(TtsError::Rejected {
            provider: NAME.to_string(),
            code: gateway.status,
            message: gateway.message,
        })
    }
}

fn catalog() -> ProviderConfig {
    ProviderConfig {
        voices: vec![
            VoiceOption::new("xiaoyun", "小云", "zh-CN"),
            VoiceOption::new("xiaogang", "小刚", "zh-CN"),
            VoiceOption::new("ruoxi", "若兮", "zh-CN"),
            VoiceOption::new("siqi", "思琪", "zh-CN"),
            VoiceOption::new("sijia", "思佳", "zh-CN"),
            VoiceOption::new("aiqi", "艾琪", "zh-CN"),
            VoiceOption::new("aijia", "艾佳", "zh-CN"),
            VoiceOption::new("aicheng", "艾诚", "zh-CN"),
            VoiceOption::new("aixia", "艾夏", "zh-CN"),
            VoiceOption::new("xiaomei", "小美", "zh-CN"),
            VoiceOption::new("abby", "Abby", "en-US"),
            VoiceOption::new("andy", "Andy", "en-US"),
        ],
        models: vec!["default".to_string()],
        emotions: Vec::new(),
        formats: vec![AudioFormat::Mp3, AudioFormat::Wav, AudioFormat::Pcm],
        sample_rates: vec![8_000, 16_000, 24_000],
        speed_range: NumericRange::new(-500.0, 500.0, 0.0),
        pitch_range: NumericRange::new(-500.0, 500.0, 0.0),
        supports_emotion: false,
        default_voice: "xiaoyun".to_string(),
        default_model: "default".to_string(),
        limits: TextLimits {
            max_chars: 300,
            max_bytes: 900,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AliyunProvider {
        AliyunProvider::new(
            AliyunConfig::new()
                .with_credentials("my_access_key_id", "my_access_key_secret")
                .with_app_key("app-key")
                .with_token_url(format!("{}/token", server.uri()))
                .with_tts_url(format!("{}/stream/v1/tts", server.uri())),
        )
        .unwrap()
    }

    fn token_body(id: &str) -> serde_json::Value {
        serde_json::json!({
            "RequestId": "req",
            "Token": {
                "Id": id,
                "ExpireTime": (Utc::now() + chrono::Duration::hours(24)).timestamp(),
                "UserId": "123"
            }
        })
    }

    async fn mount_token(server: &MockServer, id: &str, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/token"))
            .and(query_param("Action", "CreateToken"))
            .and(query_param("SignatureMethod", "HMAC-SHA1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(id)))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn test_string_to_sign_matches_pop_format() {
        let mut params = BTreeMap::new();
        params.insert("AccessKeyId", "my_access_key_id".to_string());
        params.insert("Action", "CreateToken".to_string());
        params.insert("Format", "JSON".to_string());
        params.insert("RegionId", "cn-shanghai".to_string());
        params.insert("SignatureMethod", "HMAC-SHA1".to_string());
        params.insert(
            "SignatureNonce",
            "b924c8c3-6d03-4c5d-ad36-d984d3116788".to_string(),
        );
        params.insert("SignatureVersion", "1.0".to_string());
        params.insert("Timestamp", "2019-04-18T08:32:31Z".to_string());
        params.insert("Version", "2019-02-28".to_string());

        let query = canonical_query(&params);
        assert!(query.starts_with("AccessKeyId=my_access_key_id&Action=CreateToken"));
        assert!(query.contains("Timestamp=2019-04-18T08%3A32%3A31Z"));

        assert_eq!(
            string_to_sign(&query),
            "GET&%2F&AccessKeyId%3Dmy_access_key_id%26Action%3DCreateToken%26Format%3DJSON\
             %26RegionId%3Dcn-shanghai%26SignatureMethod%3DHMAC-SHA1\
             %26SignatureNonce%3Db924c8c3-6d03-4c5d-ad36-d984d3116788\
             %26SignatureVersion%3D1.0%26Timestamp%3D2019-04-18T08%253A32%253A31Z\
             %26Version%3D2019-02-28"
        );
    }

    #[test]
    fn test_signature_is_deterministic_sha1_base64() {
        let a = sign("GET&%2F&x", "secret").unwrap();
        let b = sign("GET&%2F&x", "secret").unwrap();
        let c = sign("GET&%2F&x", "other").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        // 20-byte digest → 28 base64 chars
        assert_eq!(a.len(), 28);
        assert!(a.ends_with('='));
    }

    #[test]
    fn test_percent_encode_reserved() {
        assert_eq!(percent_encode("a b*c~d"), "a%20b%2Ac~d");
        assert_eq!(percent_encode("/"), "%2F");
    }

    #[test]
    fn test_region_moves_endpoints() {
        let config = AliyunConfig::new().with_region("cn-beijing");
        assert_eq!(config.token_url, "https://nls-meta.cn-beijing.aliyuncs.com/");
        assert!(config.tts_url.contains("nls-gateway-cn-beijing"));
    }

    #[test]
    fn test_requires_all_three_credentials() {
        let provider = AliyunProvider::new(
            AliyunConfig::new().with_credentials("id", "secret"),
        )
        .unwrap();
        assert!(!provider.is_configured());
    }

    #[tokio::test]
    async fn test_synthesize_fetches_token_once() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1", 1).await;
        Mock::given(method("POST"))
            .and(path("/stream/v1/tts"))
            .and(body_partial_json(serde_json::json!({
                "appkey": "app-key",
                "token": "tok-1",
                "voice": "xiaoyun",
                "format": "mp3"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(vec![0xff, 0xfb, 0x90, 0x00]),
            )
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&server);
        let voice = VoiceSettings::new("xiaoyun").with_speed(0.0);
        for _ in 0..2 {
            let audio = provider
                .synthesize("你好。", &voice, &AudioSettings::default(), "default")
                .await
                .unwrap();
            assert_eq!(audio.audio_bytes, vec![0xff, 0xfb, 0x90, 0x00]);
            assert_eq!(audio.duration_ms, 0);
            assert_eq!(audio.word_count, 2);
        }
    }

    #[tokio::test]
    async fn test_invalid_token_is_retryable_and_dropped() {
        let server = MockServer::start().await;
        mount_token(&server, "tok-1", 2).await;
        Mock::given(method("POST"))
            .and(path("/stream/v1/tts"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "task_id": "t",
                "result": "",
                "status": 40_000_001,
                "message": "Gateway:ACCESS_DENIED:The token 'tok-1' is invalid!"
            })))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let voice = VoiceSettings::new("xiaoyun").with_speed(0.0);
        let err = provider
            .synthesize("你好。", &voice, &AudioSettings::default(), "default")
            .await
            .unwrap_err();
        assert!(matches!(err, TtsError::Authentication { retryable: true, .. }));
        assert!(err.is_transient());

        // Cache was dropped, so a second call fetches another token.
        let _ = provider
            .synthesize("你好。", &voice, &AudioSettings::default(), "default")
            .await;
    }

    #[tokio::test]
    async fn test_token_failure_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "RequestId": "req",
                "Message": "Specified access key is not found.",
                "Code": "InvalidAccessKeyId.NotFound"
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .synthesize(
                "你好。",
                &VoiceSettings::new("xiaoyun").with_speed(0.0),
                &AudioSettings::default(),
                "default",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TtsError::Authentication { retryable: false, .. }));
        assert!(err.to_string().contains("access key"));
    }

    #[tokio::test]
    async fn test_emotion_is_rejected() {
        let server = MockServer::start().await;
        let err = provider(&server)
            .synthesize(
                "你好。",
                &VoiceSettings::new("xiaoyun").with_speed(0.0).with_emotion("happy"),
                &AudioSettings::default(),
                "default",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TtsError::Validation { .. }));
    }
}
