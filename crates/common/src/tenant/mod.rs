//! 租户管理模块
//!
//! 一个租户对应一个上游平台账号，按照概念组织：
//! - `category.rs` - 账号类别与票据类型
//! - `model.rs` - 租户配置快照及其持久化格式
//! - `validation.rs` - 注册时的字段校验
//! - `error.rs` - 租户相关错误

pub mod category;
pub mod error;
pub mod model;
pub mod validation;

pub use category::{TenantCategory, TicketType};
pub use error::TenantError;
pub use model::TenantConfig;
