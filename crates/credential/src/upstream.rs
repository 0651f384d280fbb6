//! 上游凭证接口客户端
//!
//! 所有接口都是 GET + 查询参数，响应体携带 `errcode`/`errmsg`，
//! `errcode` 非零视为业务失败。

use crate::error::{CredentialError, CredentialResult};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use wxkeeper_common::TicketType;
use wxkeeper_common::config::UpstreamConfig;

/// 上游响应中的业务状态
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl ApiStatus {
    /// `errcode` 非零时转换为上游错误
    pub fn check(&self) -> CredentialResult<()> {
        if self.errcode == 0 {
            Ok(())
        } else {
            Err(CredentialError::Upstream {
                errcode: self.errcode,
                errmsg: self.errmsg.clone(),
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(flatten)]
    status: ApiStatus,
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TicketResponse {
    #[serde(flatten)]
    status: ApiStatus,
    #[serde(default)]
    ticket: String,
    #[serde(default)]
    expires_in: i64,
}

/// 获取到的凭证或票据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub value: String,
    /// 有效期（秒）
    pub expires_in: i64,
}

/// 上游接口客户端
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    mp_base_url: String,
    work_base_url: String,
}

impl UpstreamClient {
    /// 创建客户端，超时时间即单次获取的最长阻塞时间
    pub fn new(config: &UpstreamConfig) -> CredentialResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            mp_base_url: config.mp_base_url.trim_end_matches('/').to_string(),
            work_base_url: config.work_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 公众号/小程序 client_credential 方式获取 access_token
    pub async fn mp_token(&self, appid: &str, secret: &str) -> CredentialResult<Grant> {
        let url = format!("{}/token", self.mp_base_url);
        let resp: TokenResponse = self
            .get(
                &url,
                &[
                    ("grant_type", "client_credential"),
                    ("appid", appid),
                    ("secret", secret),
                ],
            )
            .await?;
        resp.status.check()?;
        Ok(Grant {
            value: resp.access_token,
            expires_in: resp.expires_in,
        })
    }

    /// 公众号票据（jsapi / wx_card）
    pub async fn mp_ticket(
        &self,
        access_token: &str,
        ticket_type: TicketType,
    ) -> CredentialResult<Grant> {
        let url = format!("{}/ticket/getticket", self.mp_base_url);
        let resp: TicketResponse = self
            .get(
                &url,
                &[("access_token", access_token), ("type", ticket_type.as_ref())],
            )
            .await?;
        resp.status.check()?;
        Ok(Grant {
            value: resp.ticket,
            expires_in: resp.expires_in,
        })
    }

    /// 企业微信 corpid/corpsecret 方式获取 access_token
    pub async fn work_token(&self, corpid: &str, corpsecret: &str) -> CredentialResult<Grant> {
        let url = format!("{}/gettoken", self.work_base_url);
        let resp: TokenResponse = self
            .get(&url, &[("corpid", corpid), ("corpsecret", corpsecret)])
            .await?;
        resp.status.check()?;
        Ok(Grant {
            value: resp.access_token,
            expires_in: resp.expires_in,
        })
    }

    /// 企业微信应用级票据
    pub async fn work_ticket(&self, access_token: &str) -> CredentialResult<Grant> {
        let url = format!("{}/ticket/get", self.work_base_url);
        let resp: TicketResponse = self
            .get(
                &url,
                &[
                    ("access_token", access_token),
                    ("type", TicketType::AgentConfig.as_ref()),
                ],
            )
            .await?;
        resp.status.check()?;
        Ok(Grant {
            value: resp.ticket,
            expires_in: resp.expires_in,
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> CredentialResult<T> {
        debug!("Requesting upstream endpoint {}", url);
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}
