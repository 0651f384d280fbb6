//! wxkeeper 基础设施库
//!
//! 为凭证托管服务提供基础设施组件，包括配置、存储抽象、租户模型和错误类型

pub mod config;
pub mod error;
pub mod storage;
pub mod tenant;

// Re-export commonly used types for convenience
pub use config::WxkeeperConfig;
pub use error::{BaseError, ConfigError, Result, StorageError, ValidationError};
pub use storage::{KvStorage, MemoryStorage, NamespacedStorage, StorageBackend, StorageConfig};
pub use tenant::{TenantCategory, TenantConfig, TenantError, TicketType};
