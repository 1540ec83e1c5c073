//! 积分对账
//!
//! 轮询积分计算系统，把裁定同步到本地订单：
//! - `client`: 积分计算系统的 HTTP 客户端
//! - `clock`: 可注入的时钟
//! - `reconciler`: 单轮对账逻辑与限流冷却状态
//! - `worker`: 按固定间隔驱动对账的后台任务

mod client;
mod clock;
mod reconciler;
mod worker;

pub use client::{AccrualClient, AccrualResponse, HttpAccrualClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use reconciler::{Reconciler, TickReport};
pub use worker::AccrualWorker;

#[cfg(test)]
pub use client::MockAccrualClient;
