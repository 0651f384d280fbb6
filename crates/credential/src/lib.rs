//! 多租户凭证托管
//!
//! 为每个租户缓存 access_token 及其派生票据，过期时按需获取，
//! 后台定时提前刷新，并对上游返回的凭证失效错误做限流强制刷新。
//!
//! ## 组成
//! - [`CredentialService`]: 租户注册表和共享状态
//! - [`TenantContext`]: 单租户凭证入口
//! - [`AcquisitionStrategy`]: 按账号类别分派的获取流程
//! - [`RetryGovernor`]: 强制刷新闸门
//! - [`RefreshScheduler`]: 后台定时刷新

pub mod context;
pub mod error;
pub mod keys;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod strategy;
pub mod upstream;

pub use context::TenantContext;
pub use error::{CredentialError, CredentialResult};
pub use retry::{RetryGovernor, TOKEN_INVALID_CODES};
pub use scheduler::RefreshScheduler;
pub use service::{CredentialService, RefreshReport};
pub use strategy::{AcquireOutcome, AcquisitionStrategy};
pub use upstream::{ApiStatus, Grant, UpstreamClient};
