//! Speech provider adapters for lectern.
//!
//! Every backend implements [`TtsProvider`]: one `synthesize` contract, a
//! static [`ProviderConfig`] catalog used for strict validation, and its own
//! authentication lifecycle. Providers are registered once at process start
//! into an immutable [`ProviderRegistry`] and looked up by name.
//!
//! | Provider     | Auth                                  | Audio payload |
//! |--------------|---------------------------------------|---------------|
//! | `minimax`    | Bearer API key                        | hex           |
//! | `volcengine` | App id + access token                 | base64        |
//! | `aliyun`     | Signed `CreateToken` → cached token   | raw bytes     |
//!
//! Adapters never retry: transport failures are classified into
//! [`TtsError`] and the caller decides the retry policy.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

mod config;
mod error;
mod http;
mod provider;
pub mod providers;
mod registry;
mod token;

// ============================================================================
// Public API
// ============================================================================

pub use config::{NumericRange, ProviderConfig, TextLimits, VoiceOption};
pub use error::{TtsError, TtsResult};
pub use http::HttpClientConfig;
pub use provider::{SynthesizedAudio, TtsProvider, count_words};
pub use providers::{
    AliyunConfig, AliyunProvider, MinimaxConfig, MinimaxProvider, VolcengineConfig,
    VolcengineProvider,
};
pub use registry::{ProviderRegistry, ProviderRegistryBuilder};
pub use token::{CachedToken, TokenCache};

// Silence unused dev-dependency warnings
#[cfg(test)]
use wiremock as _;
