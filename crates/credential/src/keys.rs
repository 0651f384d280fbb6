//! 存储 key 布局
//!
//! 部署级命名空间由 `NamespacedStorage` 统一添加

/// 托管租户 ID 集合
pub const TENANT_LIST: &str = "wx:1";

/// 租户配置快照哈希
pub fn tenant_config(id: &str) -> String {
    format!("wx:2:{id}")
}

/// 强制刷新闸门
pub fn retry_gate(id: &str) -> String {
    format!("wx:3:{id}")
}

/// 快照中的重试计数字段
pub const RETRY_FIELD: &str = "retry";
