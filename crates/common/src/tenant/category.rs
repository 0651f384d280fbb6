//! 账号类别与票据类型

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// 账号类别
///
/// 序列化为平台使用的数字编码，未知编码保留原值并在获取凭证时跳过。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum TenantCategory {
    /// 服务号
    MpServe,
    /// 订阅号
    MpSubscribe,
    /// 企业微信
    Work,
    /// 移动/网站应用
    App,
    /// 小程序
    MiniApp,
    /// 小游戏
    MiniGame,
    /// 开放平台
    Open,
    /// 视频号
    Video,
    /// 小店
    Store,
    /// 支付
    Pay,
    Unknown(u32),
}

impl TenantCategory {
    /// 全部已知类别
    pub const KNOWN: [TenantCategory; 10] = [
        Self::MpServe,
        Self::MpSubscribe,
        Self::Work,
        Self::App,
        Self::MiniApp,
        Self::MiniGame,
        Self::Open,
        Self::Video,
        Self::Store,
        Self::Pay,
    ];

    pub fn code(&self) -> u32 {
        match self {
            Self::MpServe => 1,
            Self::MpSubscribe => 2,
            Self::Work => 3,
            Self::App => 4,
            Self::MiniApp => 5,
            Self::MiniGame => 6,
            Self::Open => 7,
            Self::Video => 8,
            Self::Store => 9,
            Self::Pay => 10,
            Self::Unknown(code) => *code,
        }
    }

    /// 是否可以接收平台推送的加密消息
    pub fn receives_webhook(&self) -> bool {
        matches!(
            self,
            Self::MpServe | Self::MpSubscribe | Self::Work | Self::MiniApp
        )
    }
}

impl From<u32> for TenantCategory {
    fn from(code: u32) -> Self {
        match code {
            1 => Self::MpServe,
            2 => Self::MpSubscribe,
            3 => Self::Work,
            4 => Self::App,
            5 => Self::MiniApp,
            6 => Self::MiniGame,
            7 => Self::Open,
            8 => Self::Video,
            9 => Self::Store,
            10 => Self::Pay,
            other => Self::Unknown(other),
        }
    }
}

impl From<TenantCategory> for u32 {
    fn from(category: TenantCategory) -> Self {
        category.code()
    }
}

impl fmt::Display for TenantCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MpServe => "mp_serve",
            Self::MpSubscribe => "mp_subscribe",
            Self::Work => "work",
            Self::App => "app",
            Self::MiniApp => "mini_app",
            Self::MiniGame => "mini_game",
            Self::Open => "open",
            Self::Video => "video",
            Self::Store => "store",
            Self::Pay => "pay",
            Self::Unknown(code) => return write!(f, "unknown({code})"),
        };
        f.write_str(name)
    }
}

/// 票据类型
///
/// `Display` 输出上游接口的 `type` 参数值
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum TicketType {
    /// JS-SDK 签名票据
    #[strum(serialize = "jsapi")]
    #[serde(rename = "jsapi")]
    Js,
    /// 卡券票据
    #[strum(serialize = "wx_card")]
    #[serde(rename = "wx_card")]
    Card,
    /// 企业微信应用级票据
    #[strum(serialize = "agent_config")]
    #[serde(rename = "agent_config")]
    AgentConfig,
}

impl TicketType {
    /// 快照中的字段名
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Js => "js_ticket",
            Self::Card => "card_ticket",
            Self::AgentConfig => "agent_ticket",
        }
    }
}
