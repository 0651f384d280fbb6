//! 强制刷新限流
//!
//! 上游返回凭证失效类错误时，调用方可以请求一次强制刷新。闸门通过存储的
//! `SET NX EX` 实现，同一租户在时间窗内只放行一次，多实例共享存储时同样成立。

use crate::keys;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use wxkeeper_common::KvStorage;

/// 表示 access_token 无效或过期的上游 errcode
pub const TOKEN_INVALID_CODES: [i64; 4] = [
    40014, // 不合法的 access_token
    41001, // 缺少 access_token 参数
    42001, // access_token 超时
    42007, // 用户修改密码等导致 access_token 失效
];

const GATE_VALUE: &str = "retrying";

/// 强制刷新闸门
#[derive(Debug, Clone)]
pub struct RetryGovernor {
    storage: Arc<dyn KvStorage>,
    window: Duration,
}

impl RetryGovernor {
    pub fn new(storage: Arc<dyn KvStorage>, window: Duration) -> Self {
        Self { storage, window }
    }

    pub fn is_token_invalid(errcode: i64) -> bool {
        TOKEN_INVALID_CODES.contains(&errcode)
    }

    /// 尝试获取租户的刷新闸门
    ///
    /// 非凭证失效类 errcode 直接返回 `false` 且不访问存储；存储异常按未获取处理。
    pub async fn try_acquire(&self, appid: &str, errcode: i64) -> bool {
        if !Self::is_token_invalid(errcode) {
            return false;
        }

        match self
            .storage
            .set_nx(&keys::retry_gate(appid), GATE_VALUE, self.window)
            .await
        {
            Ok(true) => {
                debug!(
                    "Tenant {} granted forced refresh for errcode {}",
                    appid, errcode
                );
                true
            }
            Ok(false) => {
                debug!(
                    "Tenant {} forced refresh already granted within {:?}",
                    appid, self.window
                );
                false
            }
            Err(e) => {
                error!("Tenant {} retry gate unavailable: {}", appid, e);
                false
            }
        }
    }
}
