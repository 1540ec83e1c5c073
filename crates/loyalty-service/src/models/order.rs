//! 订单相关实体定义

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{AccrualStatus, OrderStatus};

/// 订单
///
/// 订单号全局唯一，首个提交者永久持有
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub number: String,
    pub user_id: i64,
    pub status: OrderStatus,
    /// 计入的积分，未处理或不计积分时为 0
    pub accrual: Decimal,
    pub uploaded_at: DateTime<Utc>,
}

impl Order {
    /// 新登记的订单
    pub fn new(number: impl Into<String>, user_id: i64, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            number: number.into(),
            user_id,
            status: OrderStatus::New,
            accrual: Decimal::ZERO,
            uploaded_at,
        }
    }

    /// 判定一次裁定会对该订单产生的影响
    ///
    /// 终态订单不再变化；进入 PROCESSED 且积分为正时才需要入账
    pub fn verdict_outcome(&self, status: OrderStatus, accrual: Decimal) -> VerdictOutcome {
        if self.status.is_terminal() {
            return VerdictOutcome::AlreadyFinal;
        }
        if self.status == status && self.accrual == accrual {
            return VerdictOutcome::Unchanged;
        }
        let credited = if status == OrderStatus::Processed && accrual > Decimal::ZERO {
            accrual
        } else {
            Decimal::ZERO
        };
        VerdictOutcome::Applied { credited }
    }
}

/// 积分计算系统对单个订单的裁定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualVerdict {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Decimal>,
}

/// 订单提交结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 新登记
    Accepted,
    /// 同一用户重复提交
    AlreadySubmitted,
}

/// 裁定应用结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictOutcome {
    /// 订单已是终态，未做任何修改
    AlreadyFinal,
    /// 状态与积分均未变化
    Unchanged,
    /// 已写入新状态，`credited` 为本次入账金额
    Applied { credited: Decimal },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with(status: OrderStatus) -> Order {
        let mut order = Order::new("12345678903", 1, Utc::now());
        order.status = status;
        order
    }

    #[test]
    fn test_new_order_defaults() {
        let order = Order::new("79927398713", 7, Utc::now());
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.accrual, Decimal::ZERO);
    }

    #[test]
    fn test_terminal_order_is_final() {
        let accrual = Decimal::new(10, 0);
        for status in [OrderStatus::Invalid, OrderStatus::Processed] {
            assert_eq!(
                order_with(status).verdict_outcome(OrderStatus::Processed, accrual),
                VerdictOutcome::AlreadyFinal
            );
        }
    }

    #[test]
    fn test_same_state_is_unchanged() {
        assert_eq!(
            order_with(OrderStatus::Processing)
                .verdict_outcome(OrderStatus::Processing, Decimal::ZERO),
            VerdictOutcome::Unchanged
        );
    }

    #[test]
    fn test_processed_credits_accrual() {
        let accrual = Decimal::new(50050, 2);
        assert_eq!(
            order_with(OrderStatus::New).verdict_outcome(OrderStatus::Processed, accrual),
            VerdictOutcome::Applied { credited: accrual }
        );
        assert_eq!(
            order_with(OrderStatus::New).verdict_outcome(OrderStatus::Processing, Decimal::ZERO),
            VerdictOutcome::Applied {
                credited: Decimal::ZERO
            }
        );
        assert_eq!(
            order_with(OrderStatus::Processing).verdict_outcome(OrderStatus::Invalid, Decimal::ZERO),
            VerdictOutcome::Applied {
                credited: Decimal::ZERO
            }
        );
    }

    #[test]
    fn test_verdict_deserialize_without_accrual() {
        let verdict: AccrualVerdict =
            serde_json::from_str(r#"{"order":"12345678903","status":"PROCESSING"}"#).unwrap();
        assert_eq!(verdict.status, AccrualStatus::Processing);
        assert_eq!(verdict.accrual, None);

        let verdict: AccrualVerdict =
            serde_json::from_str(r#"{"order":"12345678903","status":"PROCESSED","accrual":500.5}"#)
                .unwrap();
        assert_eq!(verdict.accrual, Some(Decimal::new(5005, 1)));
    }
}
