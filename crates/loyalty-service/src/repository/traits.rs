//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{Balance, Order, OrderStatus, User, VerdictOutcome, Withdrawal};

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    /// 插入新订单，订单号已存在时不写入并返回 false
    async fn create_order(&self, order: &Order) -> Result<bool>;
    async fn find_order(&self, number: &str) -> Result<Option<Order>>;
    /// 按 uploaded_at 升序
    async fn list_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>>;
    /// 所有 NEW/PROCESSING 订单，按 uploaded_at 升序
    async fn list_pending_orders(&self) -> Result<Vec<Order>>;
    /// 原子地应用裁定，进入 PROCESSED 时在同一事务内为订单所有者入账
    async fn apply_verdict(
        &self,
        number: &str,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<VerdictOutcome>;
    /// 按订单号整体写入（不存在则创建）
    async fn upsert_order(&self, order: &Order) -> Result<()>;
}

/// 余额仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceRepositoryTrait: Send + Sync {
    /// 无记录时返回零余额
    async fn get_balance(&self, user_id: i64) -> Result<Balance>;
    /// 原子地调整当前余额，结果为负时返回 InsufficientFunds
    async fn adjust_balance(&self, user_id: i64, delta: Decimal) -> Result<Balance>;
    /// 原子地扣减余额、累加已提现额并写入提现记录
    async fn withdraw(&self, withdrawal: &Withdrawal) -> Result<Balance>;
    /// 仅写入提现记录，不改动余额
    async fn record_withdrawal(&self, withdrawal: &Withdrawal) -> Result<()>;
    /// 按 processed_at 升序
    async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>>;
}

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// 创建用户，登录名已存在时返回 None
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<Option<User>>;
    async fn find_by_login(&self, login: &str) -> Result<Option<User>>;
}
