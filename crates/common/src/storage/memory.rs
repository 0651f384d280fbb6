//! 进程内存储后端
//!
//! 单实例部署与测试使用。过期时间基于 `tokio::time::Instant`，
//! 测试中可以配合 `tokio::time::pause` 推进时间。

use super::{HashFields, KvStorage, StorageResult};
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct MemoryState {
    strings: HashMap<String, (String, Option<Instant>)>,
    sets: HashMap<String, BTreeSet<String>>,
    hashes: HashMap<String, HashFields>,
}

impl MemoryState {
    /// 清理已过期的字符串 key，返回 key 当前是否存活
    fn live_string(&mut self, key: &str) -> bool {
        let expired = match self.strings.get(key) {
            Some((_, Some(deadline))) => *deadline <= Instant::now(),
            Some((_, None)) => false,
            None => return false,
        };
        if expired {
            self.strings.remove(key);
        }
        !expired
    }

    /// 清理所有已过期的字符串 key
    fn purge_expired(&mut self) {
        let now = Instant::now();
        self.strings
            .retain(|_, (_, deadline)| deadline.is_none_or(|deadline| deadline > now));
    }
}

/// 内存存储后端
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStorage for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let mut state = self.state.lock().await;
        if !state.live_string(key) {
            return Ok(None);
        }
        Ok(state.strings.get(key).map(|(value, _)| value.clone()))
    }

    async fn del(&self, key: &str) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        state.strings.remove(key);
        state.sets.remove(key);
        state.hashes.remove(key);
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        state.purge_expired();
        state
            .strings
            .insert(key.to_string(), (value.to_string(), Some(Instant::now() + ttl)));
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<bool> {
        let mut state = self.state.lock().await;
        state.purge_expired();
        if state.strings.contains_key(key) {
            return Ok(false);
        }
        state
            .strings
            .insert(key.to_string(), (value.to_string(), Some(Instant::now() + ttl)));
        Ok(true)
    }

    async fn sadd(&self, key: &str, members: &[&str]) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        let set = state.sets.entry(key.to_string()).or_default();
        set.extend(members.iter().map(|m| m.to_string()));
        Ok(())
    }

    async fn srem(&self, key: &str, members: &[&str]) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        if let Some(set) = state.sets.get_mut(key) {
            for member in members {
                set.remove(*member);
            }
            if set.is_empty() {
                state.sets.remove(key);
            }
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> StorageResult<Vec<String>> {
        let state = self.state.lock().await;
        Ok(state
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        let hash = state.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> StorageResult<HashFields> {
        let state = self.state.lock().await;
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StorageResult<i64> {
        let mut state = self.state.lock().await;
        let hash = state.hashes.entry(key.to_string()).or_default();
        let current = match hash.get(field) {
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| StorageError::NotAnInteger {
                    key: key.to_string(),
                    field: field.to_string(),
                })?,
            None => 0,
        };
        let next = current + delta;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
