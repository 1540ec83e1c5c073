//! 单轮对账
//!
//! 按登记时间顺序查询所有待处理订单，把裁定应用到本地。
//! 收到限流响应时立即结束本轮，并记录 `next_allowed_tick_at`，
//! 冷却结束前的所有轮次都不会访问积分计算系统。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::client::{AccrualClient, AccrualResponse};
use super::clock::Clock;
use crate::error::{LoyaltyError, Result};
use crate::models::{AccrualStatus, AccrualVerdict, Order, OrderStatus, VerdictOutcome};
use crate::repository::OrderRepositoryTrait;
use crate::service::OrderService;
use loyalty_shared::observability::metrics;

/// 单轮对账结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// 本轮开始时的待处理订单数
    pub pending: usize,
    /// 状态被更新的订单数
    pub applied: usize,
    /// 裁定未带来变化的订单数
    pub unchanged: usize,
    /// 查询或应用失败的订单数（下一轮重试）
    pub failed: usize,
    /// 未登记或非预期响应的订单数
    pub skipped: usize,
    /// 处于冷却期，本轮未查询
    pub cooling_down: bool,
    /// 本轮因限流提前结束
    pub rate_limited: bool,
    /// 本轮因关闭信号提前结束
    pub interrupted: bool,
    /// 读取待处理订单失败
    pub store_error: bool,
}

impl TickReport {
    fn cooling_down() -> Self {
        Self {
            cooling_down: true,
            ..Default::default()
        }
    }
}

pub struct Reconciler<OR>
where
    OR: OrderRepositoryTrait + ?Sized,
{
    orders: Arc<OrderService<OR>>,
    client: Arc<dyn AccrualClient>,
    clock: Arc<dyn Clock>,
    /// 429 未携带 Retry-After 时的冷却时长
    cooldown: Duration,
    /// 冷却截止时间，之前不允许发起任何查询
    next_allowed_tick_at: Option<DateTime<Utc>>,
}

impl<OR> Reconciler<OR>
where
    OR: OrderRepositoryTrait + ?Sized,
{
    pub fn new(
        orders: Arc<OrderService<OR>>,
        client: Arc<dyn AccrualClient>,
        clock: Arc<dyn Clock>,
        cooldown: Duration,
    ) -> Self {
        Self {
            orders,
            client,
            clock,
            cooldown,
            next_allowed_tick_at: None,
        }
    }

    pub fn next_allowed_tick_at(&self) -> Option<DateTime<Utc>> {
        self.next_allowed_tick_at
    }

    /// 当前是否允许发起查询
    pub fn ready(&self, now: DateTime<Utc>) -> bool {
        self.next_allowed_tick_at.is_none_or(|at| now >= at)
    }

    /// 距离冷却结束的时长，不在冷却中时返回 None
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.next_allowed_tick_at
            .filter(|at| *at > now)
            .and_then(|at| (at - now).to_std().ok())
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// 执行一轮对账
    pub async fn run_tick(&mut self, shutdown: &watch::Receiver<bool>) -> TickReport {
        let now = self.clock.now();
        if !self.ready(now) {
            debug!(next_allowed_tick_at = ?self.next_allowed_tick_at, "冷却中，跳过本轮");
            return TickReport::cooling_down();
        }
        self.next_allowed_tick_at = None;

        let pending = match self.orders.list_pending().await {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "读取待处理订单失败");
                return TickReport {
                    store_error: true,
                    ..Default::default()
                };
            }
        };

        metrics::set_pending_orders(pending.len());
        let mut report = TickReport {
            pending: pending.len(),
            ..Default::default()
        };

        for order in &pending {
            if *shutdown.borrow() {
                info!("收到关闭信号，放弃本轮剩余订单");
                report.interrupted = true;
                break;
            }

            match self.client.fetch(&order.number).await {
                Err(e) => {
                    metrics::record_accrual_poll("error");
                    warn!(order = %order.number, error = %e, "查询积分计算系统失败");
                    report.failed += 1;
                }
                Ok(AccrualResponse::RateLimited { retry_after }) => {
                    metrics::record_accrual_poll("rate_limited");
                    metrics::record_accrual_cooldown();
                    let until = self.cooldown_until(self.clock.now(), retry_after);
                    warn!(order = %order.number, next_allowed_tick_at = %until, "积分计算系统限流，进入冷却");
                    self.next_allowed_tick_at = Some(until);
                    report.rate_limited = true;
                    break;
                }
                Ok(AccrualResponse::Verdict(verdict)) => {
                    metrics::record_accrual_poll("verdict");
                    match self.apply(order, verdict).await {
                        Ok(VerdictOutcome::Applied { .. }) => report.applied += 1,
                        Ok(_) => report.unchanged += 1,
                        Err(e) => {
                            warn!(order = %order.number, error = %e, "应用裁定失败");
                            report.failed += 1;
                        }
                    }
                }
                Ok(AccrualResponse::NotRegistered) => {
                    metrics::record_accrual_poll("not_registered");
                    debug!(order = %order.number, "订单未在积分计算系统登记");
                    report.skipped += 1;
                }
                Ok(AccrualResponse::Unexpected { status }) => {
                    metrics::record_accrual_poll("unexpected");
                    warn!(order = %order.number, status, "积分计算系统返回非预期状态码");
                    report.skipped += 1;
                }
            }
        }

        if report.applied > 0 || report.failed > 0 || report.rate_limited {
            info!(?report, "对账轮次结束");
        }

        report
    }

    fn cooldown_until(&self, now: DateTime<Utc>, retry_after: Option<Duration>) -> DateTime<Utc> {
        let fallback = chrono::Duration::from_std(self.cooldown).unwrap_or(chrono::Duration::MAX);
        let wait = retry_after
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .unwrap_or(fallback);
        now.checked_add_signed(wait)
            .or_else(|| now.checked_add_signed(fallback))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn apply(&self, order: &Order, verdict: AccrualVerdict) -> Result<VerdictOutcome> {
        if verdict.order != order.number {
            return Err(LoyaltyError::Accrual(format!(
                "裁定订单号 {} 与请求订单号 {} 不一致",
                verdict.order, order.number
            )));
        }

        let status = verdict.status.to_order_status();
        let accrual = match verdict.status {
            AccrualStatus::Processed => verdict.accrual.unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        };

        if status == OrderStatus::Processing && order.status == OrderStatus::Processing {
            return Ok(VerdictOutcome::Unchanged);
        }

        self.orders.apply_verdict(&order.number, status, accrual).await
    }
}
