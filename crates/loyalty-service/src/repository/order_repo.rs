//! 订单仓储
//!
//! 订单号为主键，插入冲突时不覆盖；裁定应用时对订单行加锁，
//! 并在同一事务内完成入账，保证每个订单至多入账一次

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;

use super::balance_repo::PgBalanceRepository;
use super::traits::OrderRepositoryTrait;
use crate::error::{LoyaltyError, Result};
use crate::models::{Order, OrderStatus, VerdictOutcome};

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepositoryTrait for PgOrderRepository {
    async fn create_order(&self, order: &Order) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (number, user_id, status, accrual, uploaded_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (number) DO NOTHING
            "#,
        )
        .bind(&order.number)
        .bind(order.user_id)
        .bind(order.status)
        .bind(order.accrual)
        .bind(order.uploaded_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_order(&self, number: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT number, user_id, status, accrual, uploaded_at
            FROM orders
            WHERE number = $1
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn list_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT number, user_id, status, accrual, uploaded_at
            FROM orders
            WHERE user_id = $1
            ORDER BY uploaded_at ASC, number ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn list_pending_orders(&self) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT number, user_id, status, accrual, uploaded_at
            FROM orders
            WHERE status IN ('NEW', 'PROCESSING')
            ORDER BY uploaded_at ASC, number ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn apply_verdict(
        &self,
        number: &str,
        status: OrderStatus,
        accrual: Decimal,
    ) -> Result<VerdictOutcome> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT number, user_id, status, accrual, uploaded_at
            FROM orders
            WHERE number = $1
            FOR UPDATE
            "#,
        )
        .bind(number)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LoyaltyError::NotFound(format!("订单 {}", number)))?;

        let outcome = order.verdict_outcome(status, accrual);
        let VerdictOutcome::Applied { credited } = outcome else {
            debug!(order = %number, ?outcome, "裁定未改变订单");
            tx.rollback().await?;
            return Ok(outcome);
        };

        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, accrual = $3, updated_at = NOW()
            WHERE number = $1
            "#,
        )
        .bind(number)
        .bind(status)
        .bind(accrual)
        .execute(&mut *tx)
        .await?;

        if credited > Decimal::ZERO {
            PgBalanceRepository::credit_in_tx(&mut tx, order.user_id, credited).await?;
        }

        tx.commit().await?;

        Ok(outcome)
    }

    async fn upsert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (number, user_id, status, accrual, uploaded_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (number) DO UPDATE
                SET user_id = EXCLUDED.user_id,
                    status = EXCLUDED.status,
                    accrual = EXCLUDED.accrual,
                    uploaded_at = EXCLUDED.uploaded_at,
                    updated_at = NOW()
            "#,
        )
        .bind(&order.number)
        .bind(order.user_id)
        .bind(order.status)
        .bind(order.accrual)
        .bind(order.uploaded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
