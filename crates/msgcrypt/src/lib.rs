//! 微信推送消息加解密
//!
//! 平台推送到回调地址的消息使用 AES-256-CBC 加密并带 SHA-1 签名，
//! 被动回复同样需要加密后返回。本 crate 提供：
//!
//! - [`MessageCrypto`] 按租户构造的加解密器（加密、解密、回调地址校验）
//! - [`EncryptedEnvelope`] / [`InboundEnvelope`] JSON 与 XML 两种线上格式
//! - [`digest`] HMAC-SHA256 辅助函数

pub mod crypto;
pub mod digest;
pub mod envelope;
pub mod error;

pub use crypto::MessageCrypto;
pub use envelope::{EncryptedEnvelope, InboundEnvelope};
pub use error::{CryptoError, CryptoResult};
