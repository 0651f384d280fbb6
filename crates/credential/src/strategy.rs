//! 按账号类别选择凭证获取流程

use crate::upstream::{Grant, UpstreamClient};
use chrono::{Duration, Utc};
use tracing::{debug, error};
use wxkeeper_common::{TenantCategory, TenantConfig, TicketType};

/// 凭证获取策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionStrategy {
    /// client_credential 获取 access_token，成功后依次获取票据
    Mp { tickets: &'static [TicketType] },
    /// 企业微信 gettoken，成功后获取应用级票据
    Work,
    /// 凭证由其他途径维护，不自动获取，按获取失败计数
    Manual,
    /// 未知类别
    Unsupported,
}

/// 单次获取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// 获取到新的 access_token
    Acquired,
    /// 未拿到 access_token，只记录重试次数
    Failed,
    /// 未知类别，不做任何处理
    Skipped,
}

impl AcquisitionStrategy {
    pub fn for_category(category: TenantCategory) -> Self {
        match category {
            TenantCategory::MpServe => Self::Mp {
                tickets: &[TicketType::Js, TicketType::Card],
            },
            TenantCategory::MpSubscribe => Self::Mp {
                tickets: &[TicketType::Js],
            },
            TenantCategory::App | TenantCategory::MiniApp => Self::Mp { tickets: &[] },
            TenantCategory::Work => Self::Work,
            TenantCategory::MiniGame
            | TenantCategory::Open
            | TenantCategory::Video
            | TenantCategory::Store
            | TenantCategory::Pay => Self::Manual,
            TenantCategory::Unknown(_) => Self::Unsupported,
        }
    }

    /// 执行获取并写入 `config`
    ///
    /// access_token 获取失败时跳过所有票据；票据失败只记录日志，不影响 access_token。
    pub async fn acquire(&self, upstream: &UpstreamClient, config: &mut TenantConfig) -> AcquireOutcome {
        let appid = config.appid.clone();
        let effective_id = config.effective_id().to_string();

        let token = match self {
            Self::Manual => {
                debug!(
                    "Tenant {} ({}) manages credentials externally, nothing to acquire",
                    appid, config.category
                );
                return AcquireOutcome::Failed;
            }
            Self::Unsupported => {
                error!(
                    "Unknown app type {} for tenant {}, skipping acquisition",
                    config.category.code(),
                    appid
                );
                return AcquireOutcome::Skipped;
            }
            Self::Mp { .. } => upstream.mp_token(&effective_id, &config.secret).await,
            Self::Work => upstream.work_token(&effective_id, &config.secret).await,
        };

        let grant = match token {
            Ok(grant) if !grant.value.is_empty() => grant,
            Ok(_) => {
                error!(
                    "Tenant {} request access_token via {} returned an empty token",
                    appid, effective_id
                );
                return AcquireOutcome::Failed;
            }
            Err(e) => {
                error!(
                    "Tenant {} request access_token via {} failed: {}",
                    appid, effective_id, e
                );
                return AcquireOutcome::Failed;
            }
        };

        apply_token(config, grant);

        match self {
            Self::Mp { tickets } => {
                for ticket_type in tickets.iter().copied() {
                    match upstream.mp_ticket(&config.access_token, ticket_type).await {
                        Ok(ticket) => config.set_ticket(ticket_type, ticket.value),
                        Err(e) => error!(
                            "Tenant {} request {} ticket failed: {}",
                            appid, ticket_type, e
                        ),
                    }
                }
            }
            Self::Work => match upstream.work_ticket(&config.access_token).await {
                Ok(ticket) => config.set_ticket(TicketType::AgentConfig, ticket.value),
                Err(e) => error!(
                    "Tenant {} request {} ticket failed: {}",
                    appid,
                    TicketType::AgentConfig,
                    e
                ),
            },
            Self::Manual | Self::Unsupported => {}
        }

        debug!(
            "Tenant {} acquired access_token, expires at {}",
            appid, config.expire_time
        );
        AcquireOutcome::Acquired
    }
}

fn apply_token(config: &mut TenantConfig, grant: Grant) {
    config.access_token = grant.value;
    config.expire_time = Utc::now() + Duration::seconds(grant.expires_in);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_table() {
        assert_eq!(
            AcquisitionStrategy::for_category(TenantCategory::MpServe),
            AcquisitionStrategy::Mp {
                tickets: &[TicketType::Js, TicketType::Card]
            }
        );
        assert_eq!(
            AcquisitionStrategy::for_category(TenantCategory::MpSubscribe),
            AcquisitionStrategy::Mp {
                tickets: &[TicketType::Js]
            }
        );
        assert_eq!(
            AcquisitionStrategy::for_category(TenantCategory::MiniApp),
            AcquisitionStrategy::Mp { tickets: &[] }
        );
        assert_eq!(
            AcquisitionStrategy::for_category(TenantCategory::Work),
            AcquisitionStrategy::Work
        );
        for category in [
            TenantCategory::MiniGame,
            TenantCategory::Open,
            TenantCategory::Video,
            TenantCategory::Store,
            TenantCategory::Pay,
        ] {
            assert_eq!(
                AcquisitionStrategy::for_category(category),
                AcquisitionStrategy::Manual
            );
        }
        assert_eq!(
            AcquisitionStrategy::for_category(TenantCategory::Unknown(99)),
            AcquisitionStrategy::Unsupported
        );
    }

    #[test]
    fn test_apply_token_sets_expiry() {
        let mut config = TenantConfig::new(TenantCategory::App, "wx1", "s");
        let before = Utc::now();
        apply_token(
            &mut config,
            Grant {
                value: "AT".into(),
                expires_in: 7200,
            },
        );
        assert_eq!(config.access_token, "AT");
        assert!(config.expire_time >= before + Duration::seconds(7200));
        assert!(!config.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn test_manual_categories_fail_without_network() {
        let upstream = UpstreamClient::new(&Default::default()).unwrap();
        let mut config = TenantConfig::new(TenantCategory::Pay, "mch1", "key");
        let outcome = AcquisitionStrategy::for_category(config.category)
            .acquire(&upstream, &mut config)
            .await;
        assert_eq!(outcome, AcquireOutcome::Failed);
        assert!(config.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_category_is_skipped() {
        let upstream = UpstreamClient::new(&Default::default()).unwrap();
        let mut config = TenantConfig::new(TenantCategory::Unknown(42), "acct", "s");
        let outcome = AcquisitionStrategy::for_category(config.category)
            .acquire(&upstream, &mut config)
            .await;
        assert_eq!(outcome, AcquireOutcome::Skipped);
    }
}
