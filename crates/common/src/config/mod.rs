//! 统一配置管理
//!
//! wxkeeper 所有配置项的定义、默认值都在这里统一管理，配置文件使用 TOML 格式。

pub mod bind;
pub mod credential;

pub use crate::config::bind::{BindConfig, HttpBindConfig};
pub use crate::config::credential::{CredentialConfig, UpstreamConfig};
use crate::error::ConfigError;
use crate::storage::{StorageBackend, StorageConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// wxkeeper 主配置结构体
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WxkeeperConfig {
    /// 服务实例名称
    ///
    /// 多实例共享同一存储时用于在日志中区分节点。
    pub name: String,

    /// 运行环境标识
    ///
    /// - "dev": 开发环境
    /// - "prod": 生产环境，启用额外的配置检查
    /// - "test": 测试环境
    pub env: String,

    /// 网络绑定配置
    #[serde(default)]
    pub bind: BindConfig,

    /// 存储后端配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 凭证托管配置
    #[serde(default)]
    pub credential: CredentialConfig,

    /// 可观测性配置
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// 可观测性配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ObservabilityConfig {
    /// 过滤级别
    ///
    /// 支持 EnvFilter 语法（如 "info,hyper=warn"）。默认值 "info"。
    #[serde(default = "default_filter_level")]
    pub filter_level: String,

    #[serde(default)]
    pub log: LogConfig,
}

/// 日志配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// 日志输出目标
    ///
    /// - "console": 仅输出到控制台（默认）
    /// - "file": 输出到文件
    #[serde(default = "default_log_output")]
    pub output: String,

    /// 日志轮转开关，output = "file" 时按天轮转
    #[serde(default)]
    pub rotate: bool,

    /// 日志文件目录，output = "file" 时有效
    #[serde(default = "default_log_path")]
    pub path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter_level: default_filter_level(),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: default_log_output(),
            rotate: false,
            path: default_log_path(),
        }
    }
}

fn default_log_output() -> String {
    "console".to_string()
}

fn default_log_path() -> String {
    "logs/".to_string()
}

fn default_filter_level() -> String {
    "info".to_string()
}

impl Default for WxkeeperConfig {
    fn default() -> Self {
        Self {
            name: "wxkeeper-default".to_string(),
            env: "dev".to_string(),
            bind: BindConfig::default(),
            storage: StorageConfig::default(),
            credential: CredentialConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl WxkeeperConfig {
    /// 返回日志配置引用
    pub fn log_config(&self) -> &LogConfig {
        &self.observability.log
    }

    /// 检查是否使用控制台日志输出
    pub fn is_console_logging(&self) -> bool {
        self.observability.log.output == "console"
    }

    /// 检查是否应该轮转日志
    pub fn should_rotate_logs(&self) -> bool {
        self.observability.log.output == "file" && self.observability.log.rotate
    }

    /// 获取日志过滤级别，优先使用 RUST_LOG
    pub fn get_filter_level(&self) -> String {
        std::env::var("RUST_LOG")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.observability.filter_level.clone())
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::FileNotFound {
                path: path_ref.display().to_string(),
            });
        }

        if !path_ref.is_file() {
            return Err(ConfigError::NotAFile {
                path: path_ref.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path_ref)?;
        Ok(Self::from_toml(&content)?)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 将配置序列化为 TOML 字符串
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// 验证配置有效性
    ///
    /// 以 "Warning:" 开头的条目为提示，不阻止启动。
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Instance name cannot be empty".to_string());
        }

        if !["dev", "prod", "test"].contains(&self.env.as_str()) {
            errors.push(format!(
                "Invalid environment '{}', must be one of: dev, prod, test",
                self.env
            ));
        }

        let main_level = self
            .observability
            .filter_level
            .split(',')
            .next()
            .unwrap_or("")
            .trim();
        if !["trace", "debug", "info", "warn", "error"].contains(&main_level) {
            errors.push(format!(
                "Invalid filter level '{}', must start with one of: trace, debug, info, warn, error",
                self.observability.filter_level
            ));
        }

        if !["console", "file"].contains(&self.observability.log.output.as_str()) {
            errors.push(format!(
                "Invalid log output '{}' (observability.log.output), must be 'console' or 'file'",
                self.observability.log.output
            ));
        }

        if self.bind.http.ip.parse::<std::net::IpAddr>().is_err() {
            errors.push(format!(
                "Invalid bind.http.ip '{}', must be a valid IP address",
                self.bind.http.ip
            ));
        }

        if self.storage.backend == StorageBackend::Redis && self.storage.redis.is_none() {
            errors.push(
                "Storage is configured to use Redis but storage.redis config is missing"
                    .to_string(),
            );
        }

        let credential = &self.credential;
        if credential.refresh_interval_secs == 0 {
            errors.push("credential.refresh_interval_secs must be greater than 0".to_string());
        } else if credential.refresh_interval_secs >= 7200 {
            errors.push(format!(
                "Warning: credential.refresh_interval_secs = {} is not shorter than the 7200s token lifetime",
                credential.refresh_interval_secs
            ));
        }

        if credential.retry_window_secs == 0 {
            errors.push("credential.retry_window_secs must be greater than 0".to_string());
        }

        for (field, url) in [
            ("credential.upstream.mp_base_url", &credential.upstream.mp_base_url),
            ("credential.upstream.work_base_url", &credential.upstream.work_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(format!(
                    "Invalid {field} '{url}', must start with http:// or https://"
                ));
            }
        }

        if credential.upstream.timeout_seconds == 0 {
            errors.push("credential.upstream.timeout_seconds must be greater than 0".to_string());
        }

        if self.env == "prod" {
            if self.storage.backend == StorageBackend::Memory {
                errors.push("Warning: Production environment should use a shared storage backend (storage.backend = \"redis\")".to_string());
            }

            if self.observability.log.output == "console" {
                errors.push("Warning: Production environment should use file logging (observability.log.output = \"file\")".to_string());
            }

            if self.credential.always_clean_before_start {
                errors.push("Warning: credential.always_clean_before_start removes every managed tenant at startup".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
