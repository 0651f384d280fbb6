//! 验证相关错误类型
//!
//! 定义租户注册、输入检查相关的错误

use thiserror::Error;

/// 验证相关错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 一个或多个必填字段缺失
    #[error("Required fields missing: {}", .fields.join(", "))]
    Required { fields: Vec<String> },

    #[error("Invalid format: {field}")]
    InvalidFormat { field: String },

    #[error("Operation not supported for {category}: {operation}")]
    Unsupported { category: String, operation: String },
}

impl ValidationError {
    /// 缺失字段列表
    pub fn missing_fields(&self) -> &[String] {
        match self {
            Self::Required { fields } => fields,
            _ => &[],
        }
    }
}
