//! 存储后端配置
//!
//! 定义各种存储后端的配置结构

use serde::{Deserialize, Serialize};

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// 存储后端类型
    #[serde(default)]
    pub backend: StorageBackend,

    /// 部署级命名空间
    ///
    /// 非空时所有 key 会被加上 `{namespace}:` 前缀，
    /// 多套部署共享同一个 Redis 时用于隔离。
    #[serde(default)]
    pub namespace: String,

    /// Redis 配置（当 backend = "redis" 时必需）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisConfig>,
}

/// 存储后端类型枚举
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 进程内存储，仅适用于单实例
    #[default]
    Memory,
    /// Redis 内存数据库，支持多实例共享
    Redis,
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis 连接 URL
    ///
    /// 格式：redis://[username:password@]host[:port][/database]
    /// 示例：redis://localhost:6379/0
    pub url: String,

    /// 连接池大小
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// 超时时间（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_string(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_redis_pool_size() -> usize {
    20
}

fn default_timeout_ms() -> u64 {
    5000
}
