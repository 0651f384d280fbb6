//! 凭证托管错误定义

use msgcrypt::CryptoError;
use thiserror::Error;
use wxkeeper_common::{StorageError, TenantError, ValidationError};

#[derive(Error, Debug)]
pub enum CredentialError {
    /// 注册参数缺失或当前账号类别不支持该操作
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Tenant not found: {0}")]
    NotFound(String),

    /// 上游接口返回非零 errcode
    #[error("Upstream error {errcode}: {errmsg}")]
    Upstream { errcode: i64, errmsg: String },

    /// 网络或响应解析失败
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// 持久化的租户快照无法解析
    #[error("Malformed snapshot for tenant {id}: {message}")]
    Snapshot { id: String, message: String },

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<TenantError> for CredentialError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::ValidationError(e) => Self::Validation(e),
            TenantError::NotFound(id) => Self::NotFound(id),
            TenantError::ParseError { id, message } => Self::Snapshot { id, message },
        }
    }
}

impl CredentialError {
    /// 上游 errcode，非上游错误返回 `None`
    pub fn errcode(&self) -> Option<i64> {
        match self {
            Self::Upstream { errcode, .. } => Some(*errcode),
            _ => None,
        }
    }
}

pub type CredentialResult<T> = Result<T, CredentialError>;
