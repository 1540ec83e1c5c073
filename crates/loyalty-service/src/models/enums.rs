//! 订单状态枚举
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 本地订单状态
///
/// 状态流转：NEW → PROCESSING → (INVALID | PROCESSED)，后两者为终态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 已登记，尚未得到积分计算系统的答复
    #[default]
    New,
    /// 积分计算系统已受理，仍在计算
    Processing,
    /// 不计积分（终态）
    Invalid,
    /// 已计算积分（终态）
    Processed,
}

impl OrderStatus {
    /// 是否仍需轮询
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::New | Self::Processing)
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }
}

/// 积分计算系统返回的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    /// 已登记，未开始计算
    Registered,
    /// 拒绝计算
    Invalid,
    /// 计算中
    Processing,
    /// 计算完成
    Processed,
}

impl AccrualStatus {
    /// 映射为本地订单状态
    ///
    /// REGISTERED 与 PROCESSING 对本地而言都是“处理中”
    pub fn to_order_status(self) -> OrderStatus {
        match self {
            Self::Registered | Self::Processing => OrderStatus::Processing,
            Self::Invalid => OrderStatus::Invalid,
            Self::Processed => OrderStatus::Processed,
        }
    }
}
