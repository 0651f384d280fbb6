//! 推送消息加解密器
//!
//! 明文帧格式：16 字节随机串 ‖ 4 字节大端消息长度 ‖ 消息 ‖ 租户 ID，
//! 按 32 字节补齐（PKCS#7）后使用 AES-256-CBC 加密，IV 取密钥前 16 字节。
//! 签名为 `token`、`timestamp`、`nonce`、密文四者字典序排序拼接后的 SHA-1 十六进制值。

use crate::envelope::{EncryptedEnvelope, InboundEnvelope};
use crate::error::{CryptoError, CryptoResult};
use aes::Aes256;
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use cipher::block_padding::NoPadding;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;
use tracing::debug;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const RANDOM_LEN: usize = 16;
const HEADER_LEN: usize = RANDOM_LEN + 4;
/// 补齐块大小，与平台 SDK 一致使用 32 而非 AES 块大小
const PAD_BLOCK: usize = 32;

/// 允许末位字符带非零填充位，平台下发的 EncodingAESKey 常见这种情况
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// 单个租户的消息加解密器
#[derive(Clone)]
pub struct MessageCrypto {
    token: String,
    key: [u8; KEY_LEN],
    appid: String,
}

impl std::fmt::Debug for MessageCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCrypto")
            .field("appid", &self.appid)
            .finish()
    }
}

impl MessageCrypto {
    /// 创建加解密器
    ///
    /// # Arguments
    /// * `token` - 回调配置中的签名 token
    /// * `encoding_aes_key` - 43 位 EncodingAESKey
    /// * `appid` - 解密后校验的租户 ID，为空时不校验
    pub fn new(token: &str, encoding_aes_key: &str, appid: &str) -> CryptoResult<Self> {
        let decoded = LENIENT_BASE64
            .decode(format!("{encoding_aes_key}="))
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let key: [u8; KEY_LEN] = decoded.try_into().map_err(|raw: Vec<u8>| {
            CryptoError::InvalidKey(format!(
                "expected {KEY_LEN} bytes after decoding, got {}",
                raw.len()
            ))
        })?;

        Ok(Self {
            token: token.to_string(),
            key,
            appid: appid.to_string(),
        })
    }

    pub fn appid(&self) -> &str {
        &self.appid
    }

    /// 计算消息签名
    pub fn signature(&self, timestamp: &str, nonce: &str, encrypted: &str) -> String {
        let mut parts = [self.token.as_str(), timestamp, nonce, encrypted];
        parts.sort_unstable();

        let mut hasher = Sha1::new();
        for part in parts {
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// 加密被动回复消息
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        timestamp: &str,
        nonce: &str,
    ) -> CryptoResult<EncryptedEnvelope> {
        let msg_len = u32::try_from(plaintext.len())
            .map_err(|_| CryptoError::MalformedFrame("plaintext exceeds 4 GiB".to_string()))?;

        let mut frame =
            Vec::with_capacity(HEADER_LEN + plaintext.len() + self.appid.len() + PAD_BLOCK);
        frame.extend(
            rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(RANDOM_LEN),
        );
        frame.extend_from_slice(&msg_len.to_be_bytes());
        frame.extend_from_slice(plaintext);
        frame.extend_from_slice(self.appid.as_bytes());
        pkcs7_pad(&mut frame);

        let encryptor = Aes256CbcEnc::new_from_slices(&self.key, &self.key[..IV_LEN])
            .map_err(|_| CryptoError::Cipher("invalid key or iv length".to_string()))?;
        let frame_len = frame.len();
        let ciphertext = encryptor
            .encrypt_padded_mut::<NoPadding>(&mut frame, frame_len)
            .map_err(|_| CryptoError::Cipher("frame is not block aligned".to_string()))?;

        let encrypted = LENIENT_BASE64.encode(ciphertext);
        let signature = self.signature(timestamp, nonce, &encrypted);

        Ok(EncryptedEnvelope {
            encrypt: encrypted,
            signature,
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
        })
    }

    /// 校验签名并解密推送消息
    pub fn decrypt(
        &self,
        signature: &str,
        timestamp: &str,
        nonce: &str,
        encrypted: &str,
    ) -> CryptoResult<Vec<u8>> {
        self.verify_signature(signature, timestamp, nonce, encrypted)?;

        let mut buffer = LENIENT_BASE64.decode(encrypted)?;
        if buffer.is_empty() || buffer.len() % PAD_BLOCK != 0 {
            return Err(CryptoError::MalformedFrame(format!(
                "ciphertext length {} is not a positive multiple of {PAD_BLOCK}",
                buffer.len()
            )));
        }

        let decryptor = Aes256CbcDec::new_from_slices(&self.key, &self.key[..IV_LEN])
            .map_err(|_| CryptoError::Cipher("invalid key or iv length".to_string()))?;
        let decrypted = decryptor
            .decrypt_padded_mut::<NoPadding>(&mut buffer)
            .map_err(|_| CryptoError::Cipher("ciphertext is not block aligned".to_string()))?;

        let frame = pkcs7_unpad(decrypted)?;
        let (message, embedded_appid) = parse_frame(frame)?;

        if !self.appid.is_empty() && embedded_appid != self.appid.as_bytes() {
            let actual = String::from_utf8_lossy(embedded_appid).into_owned();
            debug!(
                "Embedded appid mismatch: expected={}, actual={}",
                self.appid, actual
            );
            return Err(CryptoError::TenantMismatch {
                expected: self.appid.clone(),
                actual,
            });
        }

        Ok(message.to_vec())
    }

    /// 解密已解析的推送信封
    pub fn decrypt_envelope(
        &self,
        signature: &str,
        timestamp: &str,
        nonce: &str,
        envelope: &InboundEnvelope,
    ) -> CryptoResult<Vec<u8>> {
        self.decrypt(signature, timestamp, nonce, &envelope.encrypt)
    }

    /// 直接解密 XML 推送正文
    pub fn decrypt_xml(
        &self,
        signature: &str,
        timestamp: &str,
        nonce: &str,
        body: &str,
    ) -> CryptoResult<Vec<u8>> {
        let envelope = InboundEnvelope::from_xml(body)?;
        self.decrypt_envelope(signature, timestamp, nonce, &envelope)
    }

    /// 回调地址校验
    ///
    /// 对 `echostr` 执行与消息解密相同的流程，返回需要原样回显的明文
    pub fn verify_url(
        &self,
        signature: &str,
        timestamp: &str,
        nonce: &str,
        echostr: &str,
    ) -> CryptoResult<Vec<u8>> {
        self.decrypt(signature, timestamp, nonce, echostr)
    }

    fn verify_signature(
        &self,
        signature: &str,
        timestamp: &str,
        nonce: &str,
        encrypted: &str,
    ) -> CryptoResult<()> {
        let expected = self.signature(timestamp, nonce, encrypted);
        if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            Ok(())
        } else {
            Err(CryptoError::SignatureMismatch)
        }
    }
}

fn pkcs7_pad(frame: &mut Vec<u8>) {
    let pad = PAD_BLOCK - frame.len() % PAD_BLOCK;
    frame.resize(frame.len() + pad, pad as u8);
}

/// 按最后一个字节去除补齐，不校验补齐字节是否一致
fn pkcs7_unpad(buffer: &[u8]) -> CryptoResult<&[u8]> {
    let pad = buffer.last().copied().unwrap_or_default() as usize;
    if pad == 0 || pad > buffer.len() {
        return Err(CryptoError::MalformedFrame(format!(
            "invalid padding length {pad}"
        )));
    }
    Ok(&buffer[..buffer.len() - pad])
}

/// 拆分明文帧，返回 (消息, 租户 ID)
fn parse_frame(frame: &[u8]) -> CryptoResult<(&[u8], &[u8])> {
    if frame.len() < HEADER_LEN {
        return Err(CryptoError::MalformedFrame(format!(
            "frame length {} is shorter than {HEADER_LEN}",
            frame.len()
        )));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&frame[RANDOM_LEN..HEADER_LEN]);
    let msg_len = u32::from_be_bytes(len_bytes) as usize;

    let body = &frame[HEADER_LEN..];
    if body.len() < msg_len {
        return Err(CryptoError::MalformedFrame(format!(
            "declared message length {msg_len} exceeds frame body {}",
            body.len()
        )));
    }

    Ok(body.split_at(msg_len))
}
