//! 数据库连接管理模块
//!
//! 启动阶段按退避策略建立 PostgreSQL 连接池并执行嵌入的迁移；
//! 运行期为就绪探针提供带延迟的连通性检查。

use std::time::{Duration, Instant};

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::{Result, SharedError};
use crate::retry::{RetryPolicy, retry_with_policy};

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// 按配置构造连接池参数
fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
}

impl Database {
    /// 创建数据库连接池（单次尝试）
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = pool_options(config).connect(&config.url).await?;
        info!(
            max_connections = config.max_connections,
            "Database connection pool created"
        );
        Ok(Self { pool })
    }

    /// 创建连接池，连接类故障按策略退避重试
    ///
    /// 容器编排下数据库往往晚于服务就绪
    pub async fn connect_with_retry(config: &DatabaseConfig, policy: &RetryPolicy) -> Result<Self> {
        retry_with_policy(policy, "database_connect", SharedError::is_retryable, || {
            Self::connect(config)
        })
        .await
    }

    /// 基于已有连接池构造
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 执行嵌入的迁移，已执行过的版本会被跳过
    #[instrument(skip_all)]
    pub async fn migrate(&self, migrator: &Migrator) -> Result<()> {
        migrator.run(&self.pool).await?;
        info!(known_migrations = migrator.iter().count(), "Database migrations applied");
        Ok(())
    }

    /// 获取连接池引用
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 连通性检查，返回往返延迟
    pub async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(start.elapsed())
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_options_follow_config() {
        let config = DatabaseConfig {
            max_connections: 4,
            min_connections: 1,
            connect_timeout_seconds: 3,
            idle_timeout_seconds: 120,
            ..Default::default()
        };
        let options = pool_options(&config);

        assert_eq!(options.get_max_connections(), 4);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(3));
        assert_eq!(options.get_idle_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_min_connections_capped_by_max() {
        let config = DatabaseConfig {
            max_connections: 2,
            min_connections: 8,
            ..Default::default()
        };
        assert_eq!(pool_options(&config).get_min_connections(), 2);
    }

    #[tokio::test]
    #[ignore] // 需要数据库连接
    async fn test_database_connection() {
        let db = Database::connect(&DatabaseConfig::default()).await.unwrap();
        db.ping().await.unwrap();
    }
}
