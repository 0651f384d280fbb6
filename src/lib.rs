//! # wxkeeper
//!
//! 多租户微信凭证托管服务：access_token/ticket 缓存、定时刷新与推送消息加解密

pub mod error;
pub mod http;

// Re-export commonly used types
pub use http::{AppState, create_router};
pub use wxkeeper_common::WxkeeperConfig;
