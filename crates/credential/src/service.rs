//! 凭证托管服务
//!
//! 持有存储、上游客户端和两级锁：
//! - 进程级互斥锁：串行化租户集合变更和每次获取的最终持久化
//! - 租户级互斥锁：同一租户同时最多一个获取流程

use crate::context::TenantContext;
use crate::error::{CredentialError, CredentialResult};
use crate::keys;
use crate::retry::RetryGovernor;
use crate::scheduler::RefreshScheduler;
use crate::upstream::UpstreamClient;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use wxkeeper_common::config::CredentialConfig;
use wxkeeper_common::{KvStorage, TenantConfig};

/// 一次全量刷新的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// 完成强制刷新的租户
    pub refreshed: Vec<String>,
    /// 加载失败被跳过的租户
    pub failed: Vec<String>,
}

pub(crate) struct ServiceInner {
    pub(crate) storage: Arc<dyn KvStorage>,
    pub(crate) upstream: UpstreamClient,
    pub(crate) governor: RetryGovernor,
    pub(crate) config: CredentialConfig,
    /// 进程级互斥锁
    pub(crate) registry_lock: Mutex<()>,
    tenant_locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

/// 凭证托管服务
///
/// 克隆开销很小，所有克隆共享同一份状态
#[derive(Clone)]
pub struct CredentialService {
    pub(crate) inner: Arc<ServiceInner>,
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("storage", &self.inner.storage.backend_name())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl CredentialService {
    pub fn new(storage: Arc<dyn KvStorage>, config: CredentialConfig) -> CredentialResult<Self> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let governor = RetryGovernor::new(storage.clone(), config.retry_window());

        Ok(Self {
            inner: Arc::new(ServiceInner {
                storage,
                upstream,
                governor,
                config,
                registry_lock: Mutex::new(()),
                tenant_locks: RwLock::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &CredentialConfig {
        &self.inner.config
    }

    /// 注册并托管租户
    ///
    /// 校验失败时返回缺失字段；注册后同步尝试一次获取，获取失败不影响注册结果。
    pub async fn register(&self, mut config: TenantConfig) -> CredentialResult<TenantContext> {
        config.validate()?;

        config.clear_credentials();
        config.retry = 0;
        config.expire_time = Utc::now();
        let appid = config.appid.clone();

        {
            let _guard = self.inner.registry_lock.lock().await;
            self.inner
                .storage
                .sadd(keys::TENANT_LIST, &[appid.as_str()])
                .await?;
            self.inner
                .storage
                .hset(&keys::tenant_config(&appid), &config.to_fields())
                .await?;
        }
        info!(
            "Tenant {} registered (category={})",
            appid, config.category
        );

        let context = self.load(&appid).await?;
        context.current_token().await;
        Ok(context)
    }

    /// 加载租户上下文
    pub async fn load(&self, appid: &str) -> CredentialResult<TenantContext> {
        let config = {
            let _guard = self.inner.registry_lock.lock().await;
            self.read_snapshot(appid).await?
        };

        match config {
            Some(config) => Ok(TenantContext::new(self.clone(), config)),
            None => Err(CredentialError::NotFound(appid.to_string())),
        }
    }

    /// 停止托管租户，未注册的 ID 直接返回
    pub async fn remove(&self, appid: &str) -> CredentialResult<()> {
        {
            let _guard = self.inner.registry_lock.lock().await;
            debug!("Removing tenant {}", appid);
            self.inner.storage.srem(keys::TENANT_LIST, &[appid]).await?;
            self.inner
                .storage
                .del(&keys::tenant_config(appid))
                .await?;
            self.inner.storage.del(&keys::retry_gate(appid)).await?;
        }
        self.inner.tenant_locks.write().await.remove(appid);
        Ok(())
    }

    /// 当前托管的租户 ID
    pub async fn list_ids(&self) -> CredentialResult<Vec<String>> {
        let _guard = self.inner.registry_lock.lock().await;
        Ok(self.inner.storage.smembers(keys::TENANT_LIST).await?)
    }

    /// 启动时的一次性处理
    ///
    /// 配置了 `always_clean_before_start` 时移除所有托管租户，否则在后台立即刷新一轮。
    pub async fn startup(&self) -> CredentialResult<()> {
        if self.inner.config.always_clean_before_start {
            let ids = self.list_ids().await?;
            for appid in &ids {
                self.remove(appid).await?;
            }
            info!("Removed {} managed tenants before start", ids.len());
        } else {
            let service = self.clone();
            tokio::spawn(async move {
                let report = service.refresh_all().await;
                info!(
                    "Startup refresh finished: refreshed={}, failed={}",
                    report.refreshed.len(),
                    report.failed.len()
                );
            });
        }
        Ok(())
    }

    /// 对所有托管租户执行一次强制刷新
    ///
    /// 单个租户加载失败只记录日志，不影响其他租户。
    pub async fn refresh_all(&self) -> RefreshReport {
        let mut report = RefreshReport::default();

        let ids = match self.list_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Failed to list managed tenants: {}", e);
                return report;
            }
        };

        for appid in ids {
            match self.load(&appid).await {
                Ok(context) => {
                    debug!("Refreshing access_token for tenant {}", appid);
                    context.force_refresh().await;
                    report.refreshed.push(appid);
                }
                Err(e) => {
                    error!("Failed to load tenant {}: {}", appid, e);
                    report.failed.push(appid);
                }
            }
        }

        debug!("Managed tenants refreshed");
        report
    }

    /// 启动后台定时刷新
    pub fn spawn_scheduler(&self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        RefreshScheduler::new(self.clone(), self.inner.config.refresh_interval()).spawn(shutdown)
    }

    /// 读取持久化快照，不存在时返回 `None`
    pub(crate) async fn read_snapshot(&self, appid: &str) -> CredentialResult<Option<TenantConfig>> {
        let fields = self
            .inner
            .storage
            .hgetall(&keys::tenant_config(appid))
            .await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(TenantConfig::from_fields(appid, &fields)?))
    }

    /// 租户级互斥锁
    pub(crate) async fn tenant_lock(&self, appid: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.inner.tenant_locks.read().await.get(appid) {
            return lock.clone();
        }
        self.inner
            .tenant_locks
            .write()
            .await
            .entry(appid.to_string())
            .or_default()
            .clone()
    }
}
