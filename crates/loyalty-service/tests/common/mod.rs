//! 集成测试公共工具

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use loyalty_service::accrual::{AccrualClient, AccrualResponse, Clock};
use loyalty_service::error::{LoyaltyError, Result};
use loyalty_service::models::{AccrualStatus, AccrualVerdict};
use loyalty_service::repository::MemoryStore;
use loyalty_service::service::{BalanceService, OrderService};

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

pub fn verdict(order: &str, status: AccrualStatus, accrual: Option<&str>) -> AccrualResponse {
    AccrualResponse::Verdict(AccrualVerdict {
        order: order.to_string(),
        status,
        accrual: accrual.map(dec),
    })
}

/// 按订单号预设响应序列的积分计算系统
///
/// 每个订单号的响应按顺序消费，最后一个响应会一直重复；
/// 未预设的订单号返回 204
#[derive(Default)]
pub struct ScriptedAccrual {
    scripts: Mutex<HashMap<String, VecDeque<AccrualResponse>>>,
    calls: Mutex<Vec<(String, tokio::time::Instant)>>,
}

impl ScriptedAccrual {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, number: &str, responses: Vec<AccrualResponse>) {
        self.scripts
            .lock()
            .insert(number.to_string(), responses.into());
    }

    /// 已查询过的订单号，按查询顺序
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(String, tokio::time::Instant)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AccrualClient for ScriptedAccrual {
    async fn fetch(&self, number: &str) -> Result<AccrualResponse> {
        self.calls
            .lock()
            .push((number.to_string(), tokio::time::Instant::now()));

        let mut scripts = self.scripts.lock();
        let Some(queue) = scripts.get_mut(number) else {
            return Ok(AccrualResponse::NotRegistered);
        };

        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.ok_or_else(|| LoyaltyError::Accrual(format!("{} 未预设响应", number)))
    }
}

/// 跟随 tokio 虚拟时间前进的时钟，配合 `start_paused` 使用
pub struct TokioClock {
    base: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed()).unwrap_or_default();
        self.base + elapsed
    }
}

pub struct Services {
    pub store: Arc<MemoryStore>,
    pub orders: Arc<OrderService<MemoryStore>>,
    pub balances: Arc<BalanceService<MemoryStore>>,
}

pub fn services() -> Services {
    let store = Arc::new(MemoryStore::new());
    Services {
        orders: Arc::new(OrderService::new(store.clone())),
        balances: Arc::new(BalanceService::new(store.clone())),
        store,
    }
}
