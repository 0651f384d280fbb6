//! 租户注册校验

use super::{TenantCategory, TenantConfig};
use crate::error::ValidationError;

impl TenantConfig {
    /// 校验注册所需字段
    ///
    /// `appid`、`app_secret` 始终必填；支付类账号额外要求
    /// `token`、`encoding_aes_key`、`notify_uri`。
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();

        if self.appid.trim().is_empty() {
            missing.push("appid");
        }
        if self.secret.trim().is_empty() {
            missing.push("app_secret");
        }

        if self.category == TenantCategory::Pay {
            if self.token.trim().is_empty() {
                missing.push("token");
            }
            if self.encoding_aes_key.trim().is_empty() {
                missing.push("encoding_aes_key");
            }
            if self.notify_uri.trim().is_empty() {
                missing.push("notify_uri");
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Required {
                fields: missing.into_iter().map(String::from).collect(),
            })
        }
    }
}
