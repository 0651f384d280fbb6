//! 单租户凭证上下文
//!
//! `TenantContext` 是调用方获取 access_token / ticket 的入口。缓存为空或已过期时
//! 在租户级互斥锁内按需获取，拿到锁后重新读取持久化快照做二次校验，
//! 多个调用方同时发现过期时只触发一次上游请求。

use crate::error::CredentialResult;
use crate::keys;
use crate::service::CredentialService;
use crate::strategy::{AcquireOutcome, AcquisitionStrategy};
use chrono::{DateTime, Utc};
use msgcrypt::MessageCrypto;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use wxkeeper_common::{TenantCategory, TenantConfig, TicketType, ValidationError};

/// 单租户凭证上下文
///
/// 克隆后共享同一份内存快照
#[derive(Debug, Clone)]
pub struct TenantContext {
    service: CredentialService,
    appid: String,
    config: Arc<RwLock<TenantConfig>>,
}

impl TenantContext {
    pub(crate) fn new(service: CredentialService, config: TenantConfig) -> Self {
        Self {
            service,
            appid: config.appid.clone(),
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn appid(&self) -> &str {
        &self.appid
    }

    pub async fn category(&self) -> TenantCategory {
        self.config.read().await.category
    }

    /// 当前内存快照的副本
    pub async fn snapshot(&self) -> TenantConfig {
        self.config.read().await.clone()
    }

    pub async fn expire_time(&self) -> DateTime<Utc> {
        self.config.read().await.expire_time
    }

    /// 当前 access_token
    ///
    /// 缓存有效时直接返回；否则同步获取一次。获取失败返回空串，
    /// 调用方依赖上游接口自身的 errcode 判断并调用 [`Self::try_force_refresh`]。
    pub async fn current_token(&self) -> String {
        {
            let mut config = self.config.write().await;
            if config.is_expired(Utc::now()) {
                config.clear_credentials();
            }
            if !config.access_token.is_empty() {
                return config.access_token.clone();
            }
        }
        self.acquire(false).await
    }

    /// 读取票据，必要时先获取 access_token
    pub async fn ticket(&self, ticket_type: TicketType) -> String {
        self.current_token().await;
        self.config.read().await.ticket(ticket_type).to_string()
    }

    /// 忽略缓存，立即重新获取
    pub async fn force_refresh(&self) {
        self.acquire(true).await;
    }

    /// 上游返回凭证失效类 errcode 时请求一次强制刷新
    ///
    /// 返回是否实际执行了刷新。同一租户在限流窗口内最多刷新一次，
    /// 多个实例共享存储时同样成立。
    pub async fn try_force_refresh(&self, errcode: i64) -> bool {
        if !self
            .service
            .inner
            .governor
            .try_acquire(&self.appid, errcode)
            .await
        {
            return false;
        }

        info!(
            "Tenant {} forcing access_token refresh after errcode {}",
            self.appid, errcode
        );
        self.force_refresh().await;
        true
    }

    /// 携带 access_token 调用上游接口
    ///
    /// 调用返回凭证失效类 errcode 且获得刷新许可时，用新凭证重试一次。
    pub async fn call_with_token<T, F, Fut>(&self, call: F) -> CredentialResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = CredentialResult<T>>,
    {
        let err = match call(self.current_token().await).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match err.errcode() {
            Some(errcode) if self.try_force_refresh(errcode).await => {
                debug!("Tenant {} retrying call with refreshed token", self.appid);
                call(self.current_token().await).await
            }
            _ => Err(err),
        }
    }

    /// 推送消息加解密器
    ///
    /// 使用实际获取凭证的 ID 校验解密结果，仅能接收推送的账号类别可用。
    pub async fn message_crypto(&self) -> CredentialResult<MessageCrypto> {
        let config = self.config.read().await;
        if !config.category.receives_webhook() {
            return Err(ValidationError::Unsupported {
                category: config.category.to_string(),
                operation: "message_crypto".to_string(),
            }
            .into());
        }
        Ok(MessageCrypto::new(
            &config.token,
            &config.encoding_aes_key,
            config.effective_id(),
        )?)
    }

    /// 在租户级互斥锁内获取凭证，返回获取后的 access_token
    ///
    /// 持久化失败只记录日志；上游失败只累加重试计数，原有凭证保持不变。
    async fn acquire(&self, force: bool) -> String {
        let lock = self.service.tenant_lock(&self.appid).await;
        let _tenant_guard = lock.lock().await;

        let mut config = match self.service.read_snapshot(&self.appid).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                warn!(
                    "Tenant {} is no longer registered, skipping acquisition",
                    self.appid
                );
                return self.config.read().await.access_token.clone();
            }
            Err(e) => {
                error!(
                    "Failed to reload tenant {} snapshot, using cached copy: {}",
                    self.appid, e
                );
                self.config.read().await.clone()
            }
        };

        if config.is_expired(Utc::now()) {
            config.clear_credentials();
        }
        if !force && !config.access_token.is_empty() {
            debug!("Tenant {} access_token acquired by another caller", self.appid);
            let token = config.access_token.clone();
            *self.config.write().await = config;
            return token;
        }

        let mut fresh = config.clone();
        fresh.clear_credentials();
        let outcome = AcquisitionStrategy::for_category(fresh.category)
            .acquire(&self.service.inner.upstream, &mut fresh)
            .await;

        let _registry_guard = self.service.inner.registry_lock.lock().await;
        let storage = &self.service.inner.storage;

        // 等待上游期间租户可能已被移除，此时不再写回快照
        match storage.hgetall(&keys::tenant_config(&self.appid)).await {
            Ok(fields) if fields.is_empty() => {
                warn!(
                    "Tenant {} was removed during acquisition, discarding result",
                    self.appid
                );
                return self.config.read().await.access_token.clone();
            }
            Ok(_) => {}
            Err(e) => error!(
                "Failed to confirm tenant {} is still registered: {}",
                self.appid, e
            ),
        }

        let next = match outcome {
            AcquireOutcome::Acquired => {
                if let Err(e) = storage
                    .hset(&keys::tenant_config(&self.appid), &fresh.to_fields())
                    .await
                {
                    error!("Failed to persist tenant {} credentials: {}", self.appid, e);
                }
                fresh
            }
            AcquireOutcome::Failed => {
                match storage
                    .hincrby(&keys::tenant_config(&self.appid), keys::RETRY_FIELD, 1)
                    .await
                {
                    Ok(retry) => config.retry = retry,
                    Err(e) => {
                        error!(
                            "Failed to record retry for tenant {}: {}",
                            self.appid, e
                        );
                        config.retry += 1;
                    }
                }
                config
            }
            AcquireOutcome::Skipped => config,
        };

        let token = next.access_token.clone();
        *self.config.write().await = next;
        token
    }
}

