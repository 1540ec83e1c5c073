//! 余额与提现实体定义

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 用户余额
///
/// `withdrawn` 是独立维护的累计提现额，不由流水重新汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Balance {
    pub current: Decimal,
    pub withdrawn: Decimal,
}

/// 提现记录（只写一次）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Withdrawal {
    pub user_id: i64,
    /// 抵扣的订单号，只作标签使用，不要求存在或唯一
    pub order_number: String,
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}
