//! Concrete provider adapters.
//!
//! | Provider     | Module           | Env vars                                                  |
//! |--------------|------------------|-----------------------------------------------------------|
//! | `minimax`    | [`minimax`]      | `MINIMAX_API_KEY`, `MINIMAX_GROUP_ID`                     |
//! | `volcengine` | [`volcengine`]   | `VOLCENGINE_APP_ID`, `VOLCENGINE_ACCESS_TOKEN`            |
//! | `aliyun`     | [`aliyun`]       | `ALIYUN_ACCESS_KEY_ID`, `ALIYUN_ACCESS_KEY_SECRET`, `ALIYUN_APP_KEY` |

pub mod aliyun;
pub mod minimax;
pub mod volcengine;

pub use aliyun::{AliyunConfig, AliyunProvider};
pub use minimax::{MinimaxConfig, MinimaxProvider};
pub use volcengine::{VolcengineConfig, VolcengineProvider};

/// Read a non-empty environment variable through `lookup`.
pub(crate) fn env_value(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
