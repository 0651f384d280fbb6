//! Redis 存储后端实现
//!
//! 多实例部署共享同一个 Redis，`set_nx` 借助 `SET NX EX` 保证原子性

use super::config::RedisConfig;
use super::{HashFields, KvStorage, StorageResult, ttl_seconds};
use crate::error::StorageError;
use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

/// Redis 存储后端
#[derive(Clone)]
pub struct RedisStorage {
    pool: Pool,
    url: String,
}

impl std::fmt::Debug for RedisStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStorage").field("url", &self.url).finish()
    }
}

fn redis_err(context: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::backend("redis", format!("{context}: {e}"))
}

impl RedisStorage {
    /// 创建连接池并检查连通性
    pub async fn new(config: &RedisConfig) -> StorageResult<Self> {
        let mut cfg = Config::from_url(&config.url);
        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to create Redis pool: {e}"),
            })?;

        let mut conn = pool.get().await.map_err(|e| StorageError::Connection {
            message: format!("Failed to connect to Redis: {e}"),
        })?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut *conn)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Redis PING failed: {e}"),
            })?;

        info!(
            "Redis storage initialized: url={}, pool_size={}",
            config.url, config.pool_size
        );

        Ok(Self {
            pool,
            url: config.url.clone(),
        })
    }

    async fn conn(&self) -> StorageResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| redis_err("Failed to get Redis connection", e))
    }
}

#[async_trait]
impl KvStorage for RedisStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get(key)
            .await
            .map_err(|e| redis_err(&format!("GET {key} failed"), e))
    }

    async fn del(&self, key: &str) -> StorageResult<()> {
        let mut conn = self.conn().await?;
        let _: i64 = conn
            .del(key)
            .await
            .map_err(|e| redis_err(&format!("DEL {key} failed"), e))?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(key, value, ttl_seconds(ttl))
            .await
            .map_err(|e| redis_err(&format!("SETEX {key} failed"), e))?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<bool> {
        let mut conn = self.conn().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async(&mut *conn)
            .await
            .map_err(|e| redis_err(&format!("SET NX {key} failed"), e))?;
        Ok(reply.is_some())
    }

    async fn sadd(&self, key: &str, members: &[&str]) -> StorageResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let _: i64 = conn
            .sadd(key, members)
            .await
            .map_err(|e| redis_err(&format!("SADD {key} failed"), e))?;
        Ok(())
    }

    async fn srem(&self, key: &str, members: &[&str]) -> StorageResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let _: i64 = conn
            .srem(key, members)
            .await
            .map_err(|e| redis_err(&format!("SREM {key} failed"), e))?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> StorageResult<Vec<String>> {
        let mut conn = self.conn().await?;
        conn.smembers(key)
            .await
            .map_err(|e| redis_err(&format!("SMEMBERS {key} failed"), e))
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> StorageResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let _: () = conn
            .hset_multiple(key, fields)
            .await
            .map_err(|e| redis_err(&format!("HSET {key} failed"), e))?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> StorageResult<HashFields> {
        let mut conn = self.conn().await?;
        conn.hgetall(key)
            .await
            .map_err(|e| redis_err(&format!("HGETALL {key} failed"), e))
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StorageResult<i64> {
        let mut conn = self.conn().await?;
        conn.hincr(key, field, delta).await.map_err(|e| {
            if e.kind() == redis::ErrorKind::ResponseError {
                StorageError::NotAnInteger {
                    key: key.to_string(),
                    field: field.to_string(),
                }
            } else {
                redis_err(&format!("HINCRBY {key} failed"), e)
            }
        })
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
