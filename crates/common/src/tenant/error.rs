//! 租户错误类型定义

use crate::error::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TenantError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Tenant not found: {0}")]
    NotFound(String),

    #[error("Malformed snapshot for tenant {id}: {message}")]
    ParseError { id: String, message: String },
}

impl TenantError {
    pub fn parse(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            id: id.into(),
            message: message.into(),
        }
    }
}
