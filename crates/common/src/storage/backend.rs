//! 键值存储后端抽象接口
//!
//! 定义了所有存储后端必须实现的统一异步接口，语义与 Redis 对应命令一致

use super::{HashFields, StorageResult};
use async_trait::async_trait;
use std::time::Duration;

/// 键值存储后端抽象接口
///
/// 所有存储后端（内存、Redis 以及调用方自定义实现）都需要实现此 trait。
/// `set_nx` 必须是原子操作：多个进程共享同一后端时，同一 key 在有效期内
/// 只能被一个调用方设置成功。
#[async_trait]
pub trait KvStorage: Send + Sync + std::fmt::Debug {
    /// 读取字符串值，不存在或已过期返回 `None`
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// 删除 key（任意类型），不存在时不报错
    async fn del(&self, key: &str) -> StorageResult<()>;

    /// 写入字符串值并设置过期时间
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()>;

    /// 仅当 key 不存在时写入，并设置过期时间
    ///
    /// # Returns
    /// * `Ok(true)` - 本次写入成功
    /// * `Ok(false)` - key 已存在
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<bool>;

    /// 向集合添加成员
    async fn sadd(&self, key: &str, members: &[&str]) -> StorageResult<()>;

    /// 从集合移除成员
    async fn srem(&self, key: &str, members: &[&str]) -> StorageResult<()>;

    /// 列出集合的全部成员
    async fn smembers(&self, key: &str) -> StorageResult<Vec<String>>;

    /// 写入哈希的多个字段
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> StorageResult<()>;

    /// 读取哈希的全部字段，不存在时返回空集合
    async fn hgetall(&self, key: &str) -> StorageResult<HashFields>;

    /// 原子递增哈希中的整数字段，返回递增后的值
    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StorageResult<i64>;

    /// 后端名称
    fn backend_name(&self) -> &'static str;
}
