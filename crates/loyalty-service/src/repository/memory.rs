//! 内存存储
//!
//! 同时实现订单、余额、用户三个仓储接口，适用于测试和本地开发。
//! 所有数据放在同一把锁后，跨实体操作（裁定 + 入账、扣款 + 记账）天然原子。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use super::traits::{BalanceRepositoryTrait, OrderRepositoryTrait, UserRepositoryTrait};
use crate::error::{LoyaltyError, Result};
use crate::models::{Balance, Order, OrderStatus, User, VerdictOutcome, Withdrawal};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    next_user_id: i64,
    orders: HashMap<String, Order>,
    balances: HashMap<i64, Balance>,
    withdrawals: Vec<Withdrawal>,
}

impl Inner {
    fn credit(&mut self, user_id: i64, amount: Decimal) -> Balance {
        let balance = self.balances.entry(user_id).or_default();
        balance.current += amount;
        balance.clone()
    }
}

/// 内存仓储
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订单总数
    pub fn order_count(&self) -> usize {
        self.inner.lock().orders.len()
    }
}

fn sorted_orders(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| {
        a.uploaded_at
            .cmp(&b.uploaded_at)
            .then_with(|| a.number.cmp(&b.number))
    });
    orders
}

#[async_trait]
impl OrderRepositoryTrait for MemoryStore {
    async fn create_order(&self, order: &Order) -> Result<bool> {
        let mut inner = self.inner.lock();
        if inner.orders.contains_key(&order.number) {
            return Ok(false);
        }
        inner.orders.insert(order.number.clone(), order.clone());
        Ok(true)
    }

    async fn find_order(&self, number: &str) -> Result<Option<Order>> {
        Ok(self.inner.lock().orders.get(number).cloned())
    }

    async fn list_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>> {
        let orders = self
            .inner
            .lock()
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        Ok(sorted_orders(orders))
    }

    async fn list_pending_orders(&self) -> Result<Vec<Order>> {
        let orders = self
            .inner
            .lock()
            .orders
            .values()
            .filter(|o| o.status.is_pending())
            .cloned()
            .collect();
        Ok(sorted_orders(orders))
    }

    async fn apply_verdict(
        &self,
        number: &str,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<VerdictOutcome> {
        let mut inner = self.inner.lock();

        let order = inner
            .orders
            .get_mut(number)
            .ok_or_else(|| LoyaltyError::NotFound(format!("订单 {}", number)))?;

        let outcome = order.verdict_outcome(status, accrual);
        if let VerdictOutcome::Applied { credited } = outcome {
            order.status = status;
            order.accrual = accrual;
            let user_id = order.user_id;
            if credited > Decimal::ZERO {
                inner.credit(user_id, credited);
            }
        }

        Ok(outcome)
    }

    async fn upsert_order(&self, order: &Order) -> Result<()> {
        self.inner
            .lock()
            .orders
            .insert(order.number.clone(), order.clone());
        Ok(())
    }
}

#[async_trait]
impl BalanceRepositoryTrait for MemoryStore {
    async fn get_balance(&self, user_id: i64) -> Result<Balance> {
        Ok(self
            .inner
            .lock()
            .balances
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn adjust_balance(&self, user_id: i64, delta: Decimal) -> Result<Balance> {
        let mut inner = self.inner.lock();
        let available = inner
            .balances
            .get(&user_id)
            .map(|b| b.current)
            .unwrap_or_default();

        if available + delta < Decimal::ZERO {
            return Err(LoyaltyError::InsufficientFunds {
                required: -delta,
                available,
            });
        }

        Ok(inner.credit(user_id, delta))
    }

    async fn withdraw(&self, withdrawal: &Withdrawal) -> Result<Balance> {
        let mut inner = self.inner.lock();
        let balance = inner.balances.entry(withdrawal.user_id).or_default();

        if balance.current < withdrawal.sum {
            return Err(LoyaltyError::InsufficientFunds {
                required: withdrawal.sum,
                available: balance.current,
            });
        }

        balance.current -= withdrawal.sum;
        balance.withdrawn += withdrawal.sum;
        let snapshot = balance.clone();
        inner.withdrawals.push(withdrawal.clone());

        Ok(snapshot)
    }

    async fn record_withdrawal(&self, withdrawal: &Withdrawal) -> Result<()> {
        self.inner.lock().withdrawals.push(withdrawal.clone());
        Ok(())
    }

    async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        let mut withdrawals: Vec<Withdrawal> = self
            .inner
            .lock()
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        // 稳定排序，同一时刻的记录保持写入顺序
        withdrawals.sort_by_key(|w| w.processed_at);
        Ok(withdrawals)
    }
}

#[async_trait]
impl UserRepositoryTrait for MemoryStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<Option<User>> {
        let mut inner = self.inner.lock();
        if inner.users.contains_key(login) {
            return Ok(None);
        }

        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        inner.users.insert(login.to_string(), user.clone());

        Ok(Some(user))
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        Ok(self.inner.lock().users.get(login).cloned())
    }
}
