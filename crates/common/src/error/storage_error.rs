//! 存储相关错误类型
//!
//! 定义所有与键值存储后端相关的错误

use thiserror::Error;

/// 存储相关错误
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error ({backend}): {message}")]
    Backend { backend: String, message: String },

    #[error("Storage connection error: {message}")]
    Connection { message: String },

    #[error("Hash field '{field}' of {key} is not an integer")]
    NotAnInteger { key: String, field: String },
}

impl StorageError {
    /// 创建后端错误
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }
}
