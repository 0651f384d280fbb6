//! 凭证托管配置

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 凭证托管配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// 后台刷新周期（秒）
    ///
    /// 需要短于平台凭证的最短有效期（7200 秒），默认 55 分钟。
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// 强制刷新闸门的有效期（秒）
    ///
    /// 同一租户在该时间窗内最多触发一次强制刷新。
    #[serde(default = "default_retry_window_secs")]
    pub retry_window_secs: u64,

    /// 启动时清空所有已托管的租户
    #[serde(default)]
    pub always_clean_before_start: bool,

    /// 上游接口配置
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl CredentialConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn retry_window(&self) -> Duration {
        Duration::from_secs(self.retry_window_secs)
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            retry_window_secs: default_retry_window_secs(),
            always_clean_before_start: false,
            upstream: UpstreamConfig::default(),
        }
    }
}

/// 上游接口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// 公众号/小程序等接口前缀
    #[serde(default = "default_mp_base_url")]
    pub mp_base_url: String,

    /// 企业微信接口前缀
    #[serde(default = "default_work_base_url")]
    pub work_base_url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            mp_base_url: default_mp_base_url(),
            work_base_url: default_work_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_refresh_interval_secs() -> u64 {
    55 * 60
}

fn default_retry_window_secs() -> u64 {
    120
}

fn default_mp_base_url() -> String {
    "https://api.weixin.qq.com/cgi-bin".to_string()
}

fn default_work_base_url() -> String {
    "https://qyapi.weixin.qq.com/cgi-bin".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}
