//! 租户配置快照
//!
//! 包含注册时提供的静态配置和获取到的凭证。持久化为扁平的字符串哈希，
//! 字段名与平台 SDK 的历史格式保持一致。

use super::{TenantCategory, TenantError, TicketType};
use crate::storage::HashFields;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// 租户配置
///
/// ## 字段说明
/// - `appid`: 租户 ID
/// - `secret`: 获取凭证使用的密钥（企业微信为 corpsecret）
/// - `main_appid`: 非空时凭证通过主账号获取
/// - `token` / `encoding_aes_key`: 推送消息的签名 token 与对称密钥
/// - `access_token`: 缓存的凭证，空串表示未获取或已失效
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantConfig {
    #[serde(rename = "app_type")]
    pub category: TenantCategory,
    pub appid: String,
    #[serde(rename = "app_secret")]
    pub secret: String,
    #[serde(default)]
    pub main_appid: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub encoding_aes_key: String,
    #[serde(default)]
    pub notify_uri: String,

    // 以下字段由凭证获取流程维护
    #[serde(default, skip_deserializing)]
    pub access_token: String,
    #[serde(default, skip_deserializing)]
    pub tickets: BTreeMap<TicketType, String>,
    #[serde(default = "Utc::now", skip_deserializing)]
    pub expire_time: DateTime<Utc>,
    #[serde(default, skip_deserializing)]
    pub retry: i64,
}

impl TenantConfig {
    pub fn new(category: TenantCategory, appid: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            category,
            appid: appid.into(),
            secret: secret.into(),
            main_appid: String::new(),
            token: String::new(),
            encoding_aes_key: String::new(),
            notify_uri: String::new(),
            access_token: String::new(),
            tickets: BTreeMap::new(),
            expire_time: Utc::now(),
            retry: 0,
        }
    }

    /// 委托主账号获取凭证
    pub fn with_main_appid(mut self, main_appid: impl Into<String>) -> Self {
        self.main_appid = main_appid.into();
        self
    }

    /// 设置推送消息相关配置
    pub fn with_webhook(
        mut self,
        token: impl Into<String>,
        encoding_aes_key: impl Into<String>,
        notify_uri: impl Into<String>,
    ) -> Self {
        self.token = token.into();
        self.encoding_aes_key = encoding_aes_key.into();
        self.notify_uri = notify_uri.into();
        self
    }

    /// 实际用于获取凭证的 ID
    pub fn effective_id(&self) -> &str {
        if self.main_appid.is_empty() {
            &self.appid
        } else {
            &self.main_appid
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_time < now
    }

    /// 清空凭证和所有票据
    pub fn clear_credentials(&mut self) {
        self.access_token.clear();
        self.tickets.clear();
    }

    /// 读取票据，不存在时返回空串
    pub fn ticket(&self, ticket_type: TicketType) -> &str {
        self.tickets
            .get(&ticket_type)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn set_ticket(&mut self, ticket_type: TicketType, value: impl Into<String>) {
        self.tickets.insert(ticket_type, value.into());
    }

    /// 序列化为哈希字段
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("app_type".to_string(), self.category.code().to_string()),
            ("appid".to_string(), self.appid.clone()),
            ("app_secret".to_string(), self.secret.clone()),
            ("main_appid".to_string(), self.main_appid.clone()),
            ("token".to_string(), self.token.clone()),
            ("encoding_aes_key".to_string(), self.encoding_aes_key.clone()),
            ("notify_uri".to_string(), self.notify_uri.clone()),
            ("access_token".to_string(), self.access_token.clone()),
        ];
        for ticket_type in TicketType::iter() {
            fields.push((
                ticket_type.field_name().to_string(),
                self.ticket(ticket_type).to_string(),
            ));
        }
        fields.push((
            "expire_time".to_string(),
            self.expire_time.to_rfc3339_opts(SecondsFormat::Millis, true),
        ));
        fields.push(("retry".to_string(), self.retry.to_string()));
        fields
    }

    /// 从哈希字段解析
    ///
    /// `id` 仅用于错误信息。缺少 `expire_time` 视为已过期，缺少 `retry` 视为 0。
    pub fn from_fields(id: &str, fields: &HashFields) -> Result<Self, TenantError> {
        let text = |name: &str| fields.get(name).cloned().unwrap_or_default();

        let code = fields
            .get("app_type")
            .ok_or_else(|| TenantError::parse(id, "missing app_type"))?;
        let category = code
            .parse::<u32>()
            .map(TenantCategory::from)
            .map_err(|_| TenantError::parse(id, format!("invalid app_type: {code}")))?;

        let expire_time = match fields.get("expire_time").filter(|v| !v.is_empty()) {
            Some(value) => DateTime::parse_from_rfc3339(value)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| TenantError::parse(id, format!("invalid expire_time {value}: {e}")))?,
            None => DateTime::<Utc>::UNIX_EPOCH,
        };

        let retry = match fields.get("retry").filter(|v| !v.is_empty()) {
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| TenantError::parse(id, format!("invalid retry: {value}")))?,
            None => 0,
        };

        let mut tickets = BTreeMap::new();
        for ticket_type in TicketType::iter() {
            if let Some(value) = fields.get(ticket_type.field_name()).filter(|v| !v.is_empty()) {
                tickets.insert(ticket_type, value.clone());
            }
        }

        Ok(Self {
            category,
            appid: text("appid"),
            secret: text("app_secret"),
            main_appid: text("main_appid"),
            token: text("token"),
            encoding_aes_key: text("encoding_aes_key"),
            notify_uri: text("notify_uri"),
            access_token: text("access_token"),
            tickets,
            expire_time,
            retry,
        })
    }
}
