//! 订单服务
//!
//! 负责订单登记与状态机推进。订单号校验严格先于任何查询或写入；
//! 状态只由裁定应用推进，终态之后不再变化。

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::error::{LoyaltyError, Result};
use crate::models::{Order, OrderStatus, SubmitOutcome, VerdictOutcome};
use crate::repository::OrderRepositoryTrait;
use crate::validation::{ensure_valid_order_number, round_money};
use loyalty_shared::observability::metrics;

pub struct OrderService<OR>
where
    OR: OrderRepositoryTrait + ?Sized,
{
    order_repo: Arc<OR>,
}

impl<OR> OrderService<OR>
where
    OR: OrderRepositoryTrait + ?Sized,
{
    pub fn new(order_repo: Arc<OR>) -> Self {
        Self { order_repo }
    }

    /// 登记订单
    ///
    /// - 订单号不合法：InvalidFormat / InvalidIdentifier，不做任何查询
    /// - 同一用户已登记：AlreadySubmitted
    /// - 其他用户已登记：IdentifierConflict
    #[instrument(skip(self))]
    pub async fn submit_order(&self, user_id: i64, number: &str) -> Result<SubmitOutcome> {
        let number = number.trim();
        if let Err(e) = ensure_valid_order_number(number) {
            metrics::record_order_submission("invalid");
            return Err(e);
        }

        let outcome = match self.order_repo.find_order(number).await? {
            Some(existing) => Self::classify_existing(&existing, user_id),
            None => {
                let order = Order::new(number, user_id, Utc::now());
                if self.order_repo.create_order(&order).await? {
                    info!(order = %number, "订单已登记");
                    Ok(SubmitOutcome::Accepted)
                } else {
                    // 并发提交抢先写入，重新读取后按归属判定
                    let existing = self.order_repo.find_order(number).await?.ok_or_else(|| {
                        LoyaltyError::Internal(format!("订单 {} 插入冲突后读取不到", number))
                    })?;
                    Self::classify_existing(&existing, user_id)
                }
            }
        };

        metrics::record_order_submission(submission_label(&outcome));

        outcome
    }

    fn classify_existing(existing: &Order, user_id: i64) -> Result<SubmitOutcome> {
        if existing.user_id == user_id {
            Ok(SubmitOutcome::AlreadySubmitted)
        } else {
            warn!(order = %existing.number, "订单号已被其他用户登记");
            Err(LoyaltyError::IdentifierConflict(existing.number.clone()))
        }
    }

    /// 用户的全部订单，按登记时间升序
    pub async fn list_orders(&self, user_id: i64) -> Result<Vec<Order>> {
        self.order_repo.list_orders_by_user(user_id).await
    }

    /// 应用积分计算系统的裁定
    ///
    /// INVALID 强制积分为 0，PROCESSED 的积分舍入到分；
    /// 进入 PROCESSED 且积分为正时在同一事务内入账
    #[instrument(skip(self))]
    pub async fn apply_verdict(
        &self,
        number: &str,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<VerdictOutcome> {
        if accrual < Decimal::ZERO {
            return Err(LoyaltyError::Validation(format!(
                "订单 {} 的积分不能为负: {}",
                number, accrual
            )));
        }

        // 积分计算系统可能给出超过两位小数的积分，入库前统一舍入到分
        let accrual = match status {
            OrderStatus::Processed => round_money(accrual),
            _ => Decimal::ZERO,
        };

        let outcome = self
            .order_repo
            .apply_verdict(number, status, accrual)
            .await?;

        if let VerdictOutcome::Applied { credited } = outcome {
            info!(order = %number, status = status.as_str(), %credited, "订单状态已更新");
            if credited > Decimal::ZERO {
                metrics::record_accrual_credit(
                    rust_decimal::prelude::ToPrimitive::to_f64(&credited).unwrap_or_default(),
                );
            }
        }

        Ok(outcome)
    }

    /// 所有待轮询订单，按登记时间升序
    pub async fn list_pending(&self) -> Result<Vec<Order>> {
        self.order_repo.list_pending_orders().await
    }
}

/// 订单提交结果的指标标签
fn submission_label(outcome: &Result<SubmitOutcome>) -> &'static str {
    match outcome {
        Ok(SubmitOutcome::Accepted) => "accepted",
        Ok(SubmitOutcome::AlreadySubmitted) => "duplicate",
        Err(LoyaltyError::IdentifierConflict(_)) => "conflict",
        Err(_) => "error",
    }
}
