//! 加解密错误类型
//!
//! 这些错误都是确定性的认证失败，调用方不应重试

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Signature mismatch")]
    SignatureMismatch,

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Tenant mismatch: expected {expected}, got {actual}")]
    TenantMismatch { expected: String, actual: String },

    #[error("Invalid encoding key: {0}")]
    InvalidKey(String),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Cipher error: {0}")]
    Cipher(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
