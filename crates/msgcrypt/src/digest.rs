//! HMAC-SHA256 辅助函数
//!
//! 小程序会话签名等场景使用，Base64 输出为 URL 安全字符集并保留补齐

use crate::error::{CryptoError, CryptoResult};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 计算原始 HMAC-SHA256 摘要
pub fn hmac_sha256(key: &str, data: &str) -> CryptoResult<Vec<u8>> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// 十六进制输出
pub fn hmac_sha256_hex(key: &str, data: &str) -> CryptoResult<String> {
    hmac_sha256(key, data).map(hex::encode)
}

/// URL 安全 Base64 输出
pub fn hmac_sha256_base64(key: &str, data: &str) -> CryptoResult<String> {
    hmac_sha256(key, data).map(|digest| URL_SAFE.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4231 test case 2
    const KEY: &str = "Jefe";
    const DATA: &str = "what do ya want for nothing?";
    const EXPECTED_HEX: &str = "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843";

    #[test]
    fn test_hmac_hex_matches_rfc4231() {
        assert_eq!(hmac_sha256_hex(KEY, DATA).unwrap(), EXPECTED_HEX);
        assert_eq!(hmac_sha256(KEY, DATA).unwrap().len(), 32);
    }

    #[test]
    fn test_hmac_base64_is_url_safe_padded() {
        let encoded = hmac_sha256_base64(KEY, DATA).unwrap();
        let raw = hex::decode(EXPECTED_HEX).unwrap();
        assert_eq!(encoded, URL_SAFE.encode(raw));
        assert!(encoded.ends_with('='));
        assert!(!encoded.contains('+') && !encoded.contains('/'));
    }

    #[test]
    fn test_empty_key_allowed() {
        assert!(hmac_sha256("", "data").is_ok());
    }
}
