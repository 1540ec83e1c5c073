//! 余额服务
//!
//! 入账与提现都是对用户余额行的单次原子操作；提现成功时同时累加已提现额并写入流水。

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::error::{LoyaltyError, Result};
use crate::models::{Balance, Withdrawal};
use crate::repository::BalanceRepositoryTrait;
use crate::validation::{ensure_money_precision, ensure_valid_order_number};
use loyalty_shared::observability::metrics;

pub struct BalanceService<BR>
where
    BR: BalanceRepositoryTrait + ?Sized,
{
    balance_repo: Arc<BR>,
}

impl<BR> BalanceService<BR>
where
    BR: BalanceRepositoryTrait + ?Sized,
{
    pub fn new(balance_repo: Arc<BR>) -> Self {
        Self { balance_repo }
    }

    /// 查询余额，无记录时返回零
    pub async fn get_balance(&self, user_id: i64) -> Result<Balance> {
        self.balance_repo.get_balance(user_id).await
    }

    /// 入账
    ///
    /// 不按订单去重，调用方通过终态转换保证每个订单只入账一次
    #[instrument(skip(self))]
    pub async fn credit(&self, user_id: i64, amount: Decimal) -> Result<Balance> {
        if amount < Decimal::ZERO {
            return Err(LoyaltyError::InvalidAmount(format!(
                "入账金额不能为负: {}",
                amount
            )));
        }
        ensure_money_precision(amount)?;
        self.balance_repo.adjust_balance(user_id, amount).await
    }

    /// 提现
    ///
    /// 校验顺序：抵扣订单号 → 金额（正数且不超过两位小数）→ 余额；
    /// 余额不足时不写入任何数据
    #[instrument(skip(self))]
    pub async fn withdraw(&self, user_id: i64, order_ref: &str, sum: Decimal) -> Result<Balance> {
        let order_ref = order_ref.trim();
        if let Err(e) = ensure_valid_order_number(order_ref) {
            metrics::record_withdrawal("invalid");
            return Err(e);
        }
        if sum <= Decimal::ZERO {
            metrics::record_withdrawal("invalid");
            return Err(LoyaltyError::InvalidAmount(format!(
                "提现金额必须大于 0: {}",
                sum
            )));
        }
        if let Err(e) = ensure_money_precision(sum) {
            metrics::record_withdrawal("invalid");
            return Err(e);
        }

        let withdrawal = Withdrawal {
            user_id,
            order_number: order_ref.to_string(),
            sum,
            processed_at: Utc::now(),
        };

        match self.balance_repo.withdraw(&withdrawal).await {
            Ok(balance) => {
                metrics::record_withdrawal("success");
                info!(order = %order_ref, %sum, "提现成功");
                Ok(balance)
            }
            Err(e @ LoyaltyError::InsufficientFunds { .. }) => {
                metrics::record_withdrawal("insufficient_funds");
                warn!(order = %order_ref, error = %e, "余额不足");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// 提现流水，按处理时间升序
    pub async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        self.balance_repo.list_withdrawals(user_id).await
    }
}
