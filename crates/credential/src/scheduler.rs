//! 后台定时刷新
//!
//! 按固定周期对所有托管租户执行强制刷新，周期应短于凭证的最短有效期。
//! 刷新任务异常退出时由外层循环重新拉起。

use crate::service::{CredentialService, RefreshReport};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// 定时刷新任务
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    service: CredentialService,
    period: Duration,
}

impl RefreshScheduler {
    pub fn new(service: CredentialService, period: Duration) -> Self {
        Self { service, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 执行一轮刷新
    pub async fn tick(&self) -> RefreshReport {
        let report = self.service.refresh_all().await;
        info!(
            "Scheduled refresh finished: refreshed={}, failed={}",
            report.refreshed.len(),
            report.failed.len()
        );
        report
    }

    /// 启动后台任务，收到关闭信号后退出
    ///
    /// 第一轮在一个周期后执行；启动时的即时刷新由 [`CredentialService::startup`] 负责。
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Refresh scheduler started with period {:?}", self.period);

            loop {
                let worker = self.clone().spawn_worker();
                let abort_handle = worker.abort_handle();

                tokio::select! {
                    result = worker => {
                        match result {
                            Err(e) if e.is_panic() => {
                                error!("Refresh worker panicked, restarting: {}", e);
                            }
                            Err(e) => {
                                warn!("Refresh worker cancelled, restarting: {}", e);
                            }
                            Ok(()) => {
                                warn!("Refresh worker exited unexpectedly, restarting");
                            }
                        }
                    }
                    _ = shutdown.recv() => {
                        abort_handle.abort();
                        info!("Refresh scheduler received shutdown signal");
                        break;
                    }
                }
            }
        })
    }

    fn spawn_worker(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                debug!("Refresh scheduler tick");
                self.tick().await;
            }
        })
    }
}
