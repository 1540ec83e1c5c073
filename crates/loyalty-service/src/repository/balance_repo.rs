//! 余额仓储
//!
//! 余额行按用户惰性创建；入账使用 upsert，扣款使用带条件的 UPDATE，
//! 均为单条语句的原子操作

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use super::traits::BalanceRepositoryTrait;
use crate::error::{LoyaltyError, Result};
use crate::models::{Balance, Withdrawal};

pub struct PgBalanceRepository {
    pool: PgPool,
}

impl PgBalanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中读取余额
    pub async fn get_in_tx(conn: &mut PgConnection, user_id: i64) -> Result<Balance> {
        let balance = sqlx::query_as::<_, Balance>(
            "SELECT current, withdrawn FROM balances WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(balance.unwrap_or_default())
    }

    /// 在事务中入账（amount 必须非负）
    pub async fn credit_in_tx(
        conn: &mut PgConnection,
        user_id: i64,
        amount: Decimal,
    ) -> Result<Balance> {
        let balance = sqlx::query_as::<_, Balance>(
            r#"
            INSERT INTO balances (user_id, current, withdrawn, updated_at)
            VALUES ($1, $2, 0, NOW())
            ON CONFLICT (user_id) DO UPDATE
                SET current = balances.current + EXCLUDED.current,
                    updated_at = NOW()
            RETURNING current, withdrawn
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(conn)
        .await?;

        Ok(balance)
    }

    /// 在事务中写入提现记录
    pub async fn record_withdrawal_in_tx(
        conn: &mut PgConnection,
        withdrawal: &Withdrawal,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO withdrawals (user_id, order_number, sum, processed_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(withdrawal.user_id)
        .bind(&withdrawal.order_number)
        .bind(withdrawal.sum)
        .bind(withdrawal.processed_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl BalanceRepositoryTrait for PgBalanceRepository {
    async fn get_balance(&self, user_id: i64) -> Result<Balance> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in_tx(&mut conn, user_id).await
    }

    async fn adjust_balance(&self, user_id: i64, delta: Decimal) -> Result<Balance> {
        let mut conn = self.pool.acquire().await?;

        if delta >= Decimal::ZERO {
            return Self::credit_in_tx(&mut conn, user_id, delta).await;
        }

        let updated = sqlx::query_as::<_, Balance>(
            r#"
            UPDATE balances
            SET current = current + $2, updated_at = NOW()
            WHERE user_id = $1 AND current + $2 >= 0
            RETURNING current, withdrawn
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await?;

        match updated {
            Some(balance) => Ok(balance),
            None => {
                let available = Self::get_in_tx(&mut conn, user_id).await?.current;
                Err(LoyaltyError::InsufficientFunds {
                    required: -delta,
                    available,
                })
            }
        }
    }

    async fn withdraw(&self, withdrawal: &Withdrawal) -> Result<Balance> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Balance>(
            r#"
            UPDATE balances
            SET current = current - $2,
                withdrawn = withdrawn + $2,
                updated_at = NOW()
            WHERE user_id = $1 AND current >= $2
            RETURNING current, withdrawn
            "#,
        )
        .bind(withdrawal.user_id)
        .bind(withdrawal.sum)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(balance) = updated else {
            let available = Self::get_in_tx(&mut tx, withdrawal.user_id).await?.current;
            tx.rollback().await?;
            return Err(LoyaltyError::InsufficientFunds {
                required: withdrawal.sum,
                available,
            });
        };

        Self::record_withdrawal_in_tx(&mut tx, withdrawal).await?;
        tx.commit().await?;

        Ok(balance)
    }

    async fn record_withdrawal(&self, withdrawal: &Withdrawal) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::record_withdrawal_in_tx(&mut conn, withdrawal).await
    }

    async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        let withdrawals = sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT user_id, order_number, sum, processed_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY processed_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(withdrawals)
    }
}
