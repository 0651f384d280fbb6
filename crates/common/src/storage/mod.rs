//! 键值存储模块
//!
//! 凭证托管状态（租户列表、租户配置快照、重试闸门）全部通过此抽象持久化，
//! 支持多实例共享同一个后端。
//!
//! # 设计
//!
//! - `KvStorage` trait 定义统一的异步接口（字符串、集合、哈希三类原语）
//! - `MemoryStorage` 进程内实现，默认后端，也用于测试
//! - `RedisStorage` 基于 deadpool-redis 的实现（feature `backend-redis`）
//! - `NamespacedStorage` 为所有 key 加上部署级前缀
//! - 通过 `StorageConfig` 配置选择和初始化后端

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub mod backend;
pub mod config;
pub mod memory;
pub mod namespace;

#[cfg(feature = "backend-redis")]
pub mod redis;

use crate::error::StorageError;

pub use backend::KvStorage;
pub use config::{RedisConfig, StorageBackend, StorageConfig};
pub use memory::MemoryStorage;
pub use namespace::NamespacedStorage;

#[cfg(feature = "backend-redis")]
pub use self::redis::RedisStorage;

/// 存储操作结果类型
pub type StorageResult<T> = Result<T, StorageError>;

/// 哈希字段集合
pub type HashFields = HashMap<String, String>;

/// 从配置创建存储实例
///
/// 返回的实例已经包装了命名空间前缀（前缀为空时透传）。
///
/// # Errors
/// - 缺少对应后端的配置
/// - 后端连接失败
/// - 后端功能未启用（feature flag）
pub async fn open_storage(config: &StorageConfig) -> StorageResult<Arc<dyn KvStorage>> {
    let inner: Arc<dyn KvStorage> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),

        #[cfg(feature = "backend-redis")]
        StorageBackend::Redis => {
            let cfg = config.redis.as_ref().ok_or_else(|| StorageError::Connection {
                message: "Missing Redis config".into(),
            })?;
            Arc::new(RedisStorage::new(cfg).await?)
        }

        #[cfg(not(feature = "backend-redis"))]
        StorageBackend::Redis => {
            return Err(StorageError::Connection {
                message: "Redis backend not enabled. Compile with --features backend-redis"
                    .into(),
            });
        }
    };

    tracing::info!(
        "Storage opened: backend={}, namespace={:?}",
        inner.backend_name(),
        config.namespace
    );

    Ok(Arc::new(NamespacedStorage::new(inner, &config.namespace)))
}

/// 过期时间转换为秒，最小 1 秒
#[cfg_attr(not(feature = "backend-redis"), allow(dead_code))]
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_storage() {
        let config = StorageConfig::default();
        let storage = open_storage(&config).await.unwrap();
        assert_eq!(storage.backend_name(), "memory");

        storage.sadd("wx:1", &["a"]).await.unwrap();
        assert_eq!(storage.smembers("wx:1").await.unwrap(), vec!["a".to_string()]);
    }

    #[cfg(not(feature = "backend-redis"))]
    #[tokio::test]
    async fn test_redis_backend_disabled() {
        let config = StorageConfig {
            backend: StorageBackend::Redis,
            redis: Some(RedisConfig::default()),
            ..Default::default()
        };

        let result = open_storage(&config).await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Redis backend not enabled")
        );
    }

    #[test]
    fn test_ttl_seconds_floor() {
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(120)), 120);
    }
}
