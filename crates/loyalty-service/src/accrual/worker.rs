//! 积分对账 Worker
//!
//! 以固定间隔驱动对账；冷却期内改为睡到冷却结束。
//! 单个订单或存储的错误只记录日志，Worker 只在收到关闭信号时退出。

use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use super::reconciler::{Reconciler, TickReport};
use crate::repository::OrderRepositoryTrait;
use loyalty_shared::observability::metrics;

pub struct AccrualWorker<OR>
where
    OR: OrderRepositoryTrait + ?Sized,
{
    reconciler: Reconciler<OR>,
    poll_interval: Duration,
}

impl<OR> AccrualWorker<OR>
where
    OR: OrderRepositoryTrait + ?Sized,
{
    pub fn new(reconciler: Reconciler<OR>, poll_interval: Duration) -> Self {
        Self {
            reconciler,
            poll_interval,
        }
    }

    /// 下一轮之前的等待时长
    fn next_wait(&self) -> Duration {
        let now = self.reconciler.clock().now();
        self.reconciler
            .cooldown_remaining(now)
            .unwrap_or(self.poll_interval)
    }

    /// 主循环：持续对账直到收到关闭信号
    ///
    /// 返回最后一轮的结果
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> TickReport {
        info!(poll_interval = ?self.poll_interval, "AccrualWorker 已启动");

        let mut last = TickReport::default();
        loop {
            if *shutdown.borrow() {
                break;
            }

            last = self.reconciler.run_tick(&shutdown).await;
            metrics::set_worker_last_run("accrual_worker");

            let wait = self.next_wait();
            tokio::select! {
                // 偏向关闭信号，保证收到关闭时能尽快退出
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("AccrualWorker 已停止");
        last
    }
}
