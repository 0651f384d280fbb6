//! 命名空间包装
//!
//! 为底层存储的所有 key 加上部署级前缀

use super::{HashFields, KvStorage, StorageResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// 带前缀的存储包装
#[derive(Debug, Clone)]
pub struct NamespacedStorage {
    inner: Arc<dyn KvStorage>,
    prefix: String,
}

impl NamespacedStorage {
    /// 创建包装，`namespace` 为空时所有 key 原样透传
    pub fn new(inner: Arc<dyn KvStorage>, namespace: &str) -> Self {
        Self {
            inner,
            prefix: namespace.trim().to_string(),
        }
    }

    fn key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }
}

#[async_trait]
impl KvStorage for NamespacedStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(&self.key(key)).await
    }

    async fn del(&self, key: &str) -> StorageResult<()> {
        self.inner.del(&self.key(key)).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()> {
        self.inner.set_ex(&self.key(key), value, ttl).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<bool> {
        self.inner.set_nx(&self.key(key), value, ttl).await
    }

    async fn sadd(&self, key: &str, members: &[&str]) -> StorageResult<()> {
        self.inner.sadd(&self.key(key), members).await
    }

    async fn srem(&self, key: &str, members: &[&str]) -> StorageResult<()> {
        self.inner.srem(&self.key(key), members).await
    }

    async fn smembers(&self, key: &str) -> StorageResult<Vec<String>> {
        self.inner.smembers(&self.key(key)).await
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> StorageResult<()> {
        self.inner.hset(&self.key(key), fields).await
    }

    async fn hgetall(&self, key: &str) -> StorageResult<HashFields> {
        self.inner.hgetall(&self.key(key)).await
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StorageResult<i64> {
        self.inner.hincrby(&self.key(key), field, delta).await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_prefix_applied() {
        let inner = Arc::new(MemoryStorage::new());
        let storage = NamespacedStorage::new(inner.clone(), "prod");

        storage.sadd("wx:1", &["app"]).await.unwrap();

        assert_eq!(
            inner.smembers("prod:wx:1").await.unwrap(),
            vec!["app".to_string()]
        );
        assert!(inner.smembers("wx:1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_namespace_passthrough() {
        let inner = Arc::new(MemoryStorage::new());
        let storage = NamespacedStorage::new(inner.clone(), "  ");

        storage
            .hset("wx:2:app", &[("retry".to_string(), "0".to_string())])
            .await
            .unwrap();
        assert_eq!(inner.hgetall("wx:2:app").await.unwrap().len(), 1);
    }
}
