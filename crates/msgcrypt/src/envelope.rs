//! 加密消息的线上格式
//!
//! 被动回复支持 JSON 与 XML 两种格式；推送消息中的 `ToUserName`、`AgentID`
//! 只用于解密后的校验，租户由调用方的路由确定。

use crate::error::{CryptoError, CryptoResult};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};

/// 加密后的被动回复
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// Base64 密文
    pub encrypt: String,
    /// 十六进制签名
    #[serde(rename = "msgsignature")]
    pub signature: String,
    pub timestamp: String,
    pub nonce: String,
}

impl EncryptedEnvelope {
    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 渲染为 XML 回复
    ///
    /// ```xml
    /// <xml>
    ///   <Encrypt><![CDATA[...]]></Encrypt>
    ///   <MsgSignature><![CDATA[...]]></MsgSignature>
    ///   <TimeStamp>1409304348</TimeStamp>
    ///   <Nonce><![CDATA[...]]></Nonce>
    /// </xml>
    /// ```
    pub fn to_xml(&self) -> CryptoResult<String> {
        let mut writer = Writer::new(Vec::new());

        emit(&mut writer, Event::Start(BytesStart::new("xml")))?;
        write_cdata(&mut writer, "Encrypt", &self.encrypt)?;
        write_cdata(&mut writer, "MsgSignature", &self.signature)?;
        emit(&mut writer, Event::Start(BytesStart::new("TimeStamp")))?;
        emit(&mut writer, Event::Text(BytesText::new(&self.timestamp)))?;
        emit(&mut writer, Event::End(BytesEnd::new("TimeStamp")))?;
        write_cdata(&mut writer, "Nonce", &self.nonce)?;
        emit(&mut writer, Event::End(BytesEnd::new("xml")))?;

        String::from_utf8(writer.into_inner()).map_err(|e| CryptoError::Xml(e.to_string()))
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> CryptoResult<()> {
    writer
        .write_event(event)
        .map_err(|e| CryptoError::Xml(e.to_string()))
}

fn write_cdata(writer: &mut Writer<Vec<u8>>, tag: &str, value: &str) -> CryptoResult<()> {
    emit(writer, Event::Start(BytesStart::new(tag)))?;
    // CDATA 内不能出现 "]]>"，此时退化为转义文本
    if value.contains("]]>") {
        emit(writer, Event::Text(BytesText::new(value)))?;
    } else {
        emit(writer, Event::CData(BytesCData::new(value)))?;
    }
    emit(writer, Event::End(BytesEnd::new(tag)))
}

/// 平台推送的加密消息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "tousername", alias = "ToUserName", default)]
    pub to_user_name: String,
    #[serde(alias = "Encrypt")]
    pub encrypt: String,
    #[serde(
        rename = "agentid",
        alias = "AgentID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub agent_id: Option<String>,
}

impl InboundEnvelope {
    pub fn from_json(body: &str) -> CryptoResult<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// 解析 XML 推送正文，只读取顶层的 `ToUserName`、`Encrypt`、`AgentID`
    pub fn from_xml(body: &str) -> CryptoResult<Self> {
        let mut reader = Reader::from_str(body);
        reader.config_mut().trim_text(true);

        let mut envelope = InboundEnvelope::default();
        let mut depth = 0usize;
        let mut current = String::new();
        let mut seen_encrypt = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| CryptoError::Xml(e.to_string()))?;
            match event {
                Event::Start(e) => {
                    depth += 1;
                    current = String::from_utf8_lossy(e.local_name().into_inner()).into_owned();
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    current.clear();
                }
                Event::Text(t) if depth == 2 => {
                    let text = t
                        .unescape()
                        .map_err(|e| CryptoError::Xml(e.to_string()))?
                        .into_owned();
                    seen_encrypt |= envelope.assign(&current, text);
                }
                Event::CData(c) if depth == 2 => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    seen_encrypt |= envelope.assign(&current, text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_encrypt {
            return Err(CryptoError::Xml("missing Encrypt element".to_string()));
        }
        Ok(envelope)
    }

    /// 写入字段，返回是否写入了 `Encrypt`
    fn assign(&mut self, tag: &str, text: String) -> bool {
        match tag {
            "ToUserName" => self.to_user_name.push_str(&text),
            "Encrypt" => {
                self.encrypt.push_str(&text);
                return true;
            }
            "AgentID" => self.agent_id.get_or_insert_with(String::new).push_str(&text),
            _ => {}
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedEnvelope {
        EncryptedEnvelope {
            encrypt: "ZW5jcnlwdGVk".to_string(),
            signature: "abc123".to_string(),
            timestamp: "1409304348".to_string(),
            nonce: "xxxxxx".to_string(),
        }
    }

    #[test]
    fn test_json_field_names() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["encrypt"], "ZW5jcnlwdGVk");
        assert_eq!(value["msgsignature"], "abc123");
        assert_eq!(value["timestamp"], "1409304348");
        assert_eq!(value["nonce"], "xxxxxx");
    }

    #[test]
    fn test_xml_rendering() {
        let xml = sample().to_xml().unwrap();
        assert_eq!(
            xml,
            "<xml><Encrypt><![CDATA[ZW5jcnlwdGVk]]></Encrypt>\
             <MsgSignature><![CDATA[abc123]]></MsgSignature>\
             <TimeStamp>1409304348</TimeStamp>\
             <Nonce><![CDATA[xxxxxx]]></Nonce></xml>"
        );
    }

    #[test]
    fn test_parse_inbound_xml() {
        let body = r#"<xml>
            <ToUserName><![CDATA[wx5823bf96d3bd56c7]]></ToUserName>
            <Encrypt><![CDATA[RypEvHKD8QQKFhvQ6QleEB4J58tiPdvo]]></Encrypt>
            <AgentID><![CDATA[218]]></AgentID>
        </xml>"#;
        let envelope = InboundEnvelope::from_xml(body).unwrap();
        assert_eq!(envelope.to_user_name, "wx5823bf96d3bd56c7");
        assert_eq!(envelope.encrypt, "RypEvHKD8QQKFhvQ6QleEB4J58tiPdvo");
        assert_eq!(envelope.agent_id.as_deref(), Some("218"));
    }

    #[test]
    fn test_parse_inbound_xml_plain_text() {
        let body = "<xml><ToUserName>gh_1</ToUserName><Encrypt>abc+/=</Encrypt></xml>";
        let envelope = InboundEnvelope::from_xml(body).unwrap();
        assert_eq!(envelope.encrypt, "abc+/=");
        assert!(envelope.agent_id.is_none());
    }

    #[test]
    fn test_parse_inbound_xml_missing_encrypt() {
        let body = "<xml><ToUserName>gh_1</ToUserName></xml>";
        assert!(matches!(
            InboundEnvelope::from_xml(body),
            Err(CryptoError::Xml(_))
        ));
    }

    #[test]
    fn test_parse_inbound_json() {
        let envelope =
            InboundEnvelope::from_json(r#"{"ToUserName":"gh_1","Encrypt":"abc"}"#).unwrap();
        assert_eq!(envelope.to_user_name, "gh_1");
        assert_eq!(envelope.encrypt, "abc");

        let envelope =
            InboundEnvelope::from_json(r#"{"tousername":"gh_1","encrypt":"abc","agentid":"7"}"#)
                .unwrap();
        assert_eq!(envelope.agent_id.as_deref(), Some("7"));
    }
}
