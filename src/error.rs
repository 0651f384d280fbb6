//! 统一错误处理模型
//!
//! 提供主应用 wxkeeper 的顶层错误类型，以及 HTTP 接口的错误响应映射

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use credential::CredentialError;
use msgcrypt::CryptoError;
use serde_json::json;
use thiserror::Error;
use wxkeeper_common::{BaseError, ConfigError, StorageError};

/// 主应用的统一错误枚举
#[derive(Debug, Error)]
pub enum Error {
    // ========== 配置相关错误 ==========
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // ========== 基础库错误 ==========
    #[error("Base library error: {0}")]
    Base(Box<BaseError>),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // ========== 服务相关错误 ==========
    #[error("Credential service error: {0}")]
    Credential(#[from] CredentialError),

    // ========== 系统级错误 ==========
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task error: {0}")]
    Join(#[from] tokio::task::JoinError),

    // ========== 业务逻辑错误 ==========
    /// 服务启动失败
    #[error("Service startup failed: {message}")]
    ServiceStartup { message: String },

    /// 服务配置验证失败
    #[error("Service configuration validation failed: {message}")]
    ServiceValidation { message: String },

    // ========== 通用错误 ==========
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),

    #[error("Application error: {message}")]
    Custom { message: String },
}

impl From<BaseError> for Error {
    fn from(err: BaseError) -> Self {
        Error::Base(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }

    pub fn service_startup(message: impl Into<String>) -> Self {
        Self::ServiceStartup {
            message: message.into(),
        }
    }

    pub fn service_validation(message: impl Into<String>) -> Self {
        Self::ServiceValidation {
            message: message.into(),
        }
    }
}

/// HTTP 接口错误
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Crypto(e) | ApiError::Credential(CredentialError::Crypto(e)) => {
                crypto_status(e)
            }
            ApiError::Credential(CredentialError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "Tenant not found".to_string())
            }
            ApiError::Credential(CredentialError::Validation(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Credential(_) => {
                // 不向客户端暴露存储和上游细节
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

fn crypto_status(err: &CryptoError) -> (StatusCode, String) {
    match err {
        CryptoError::Xml(_) | CryptoError::Json(_) => {
            (StatusCode::BAD_REQUEST, "Invalid message envelope".to_string())
        }
        CryptoError::InvalidKey(_) => {
            tracing::error!("Tenant webhook key is invalid: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
        _ => {
            tracing::warn!("Rejected webhook message: {}", err);
            (
                StatusCode::UNAUTHORIZED,
                "Authentication failed".to_string(),
            )
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "error": error_message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wxkeeper_common::ValidationError;

    #[test]
    fn test_error_creation() {
        let err = Error::custom("test error");
        assert!(matches!(err, Error::Custom { .. }));
        assert_eq!(err.to_string(), "Application error: test error");

        let err = Error::service_startup("credential service: storage unavailable");
        assert!(matches!(err, Error::ServiceStartup { .. }));
        assert_eq!(
            err.to_string(),
            "Service startup failed: credential service: storage unavailable"
        );
    }

    #[test]
    fn test_api_error_status() {
        let cases = [
            (
                ApiError::Credential(CredentialError::NotFound("wx1".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Credential(
                    ValidationError::Required {
                        fields: vec!["appid".into()],
                    }
                    .into(),
                ),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Crypto(CryptoError::SignatureMismatch),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::Credential(CredentialError::Crypto(CryptoError::TenantMismatch {
                    expected: "a".into(),
                    actual: "b".into(),
                })),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::Crypto(CryptoError::Xml("missing Encrypt".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Credential(CredentialError::Snapshot {
                    id: "wx1".into(),
                    message: "bad retry".into(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
