//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use loyalty_shared::database::Database;

use crate::auth::JwtManager;
use crate::repository::{
    BalanceRepositoryTrait, MemoryStore, OrderRepositoryTrait, PgBalanceRepository,
    PgOrderRepository, PgUserRepository, UserRepositoryTrait,
};
use crate::service::{AuthService, BalanceService, OrderService};

/// Axum 应用共享状态
///
/// 服务通过 trait 对象持有仓储，PostgreSQL 与内存实现可以互换
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService<dyn OrderRepositoryTrait>>,
    pub balances: Arc<BalanceService<dyn BalanceRepositoryTrait>>,
    pub auth: Arc<AuthService<dyn UserRepositoryTrait>>,
    pub jwt_manager: JwtManager,
    /// 就绪探针使用，内存模式下为 None
    pub database: Option<Database>,
}

impl AppState {
    /// 基于 PostgreSQL 构建
    pub fn with_postgres(db: Database, jwt_manager: JwtManager) -> Self {
        let pool = db.pool().clone();
        let order_repo: Arc<dyn OrderRepositoryTrait> =
            Arc::new(PgOrderRepository::new(pool.clone()));
        let balance_repo: Arc<dyn BalanceRepositoryTrait> =
            Arc::new(PgBalanceRepository::new(pool.clone()));
        let user_repo: Arc<dyn UserRepositoryTrait> = Arc::new(PgUserRepository::new(pool));

        Self {
            orders: Arc::new(OrderService::new(order_repo)),
            balances: Arc::new(BalanceService::new(balance_repo)),
            auth: Arc::new(AuthService::new(user_repo, jwt_manager.clone())),
            jwt_manager,
            database: Some(db),
        }
    }

    /// 基于内存存储构建
    ///
    /// 使用最低 bcrypt 强度，仅用于测试和本地调试
    pub fn in_memory(store: Arc<MemoryStore>, jwt_manager: JwtManager) -> Self {
        let order_repo: Arc<dyn OrderRepositoryTrait> = store.clone();
        let balance_repo: Arc<dyn BalanceRepositoryTrait> = store.clone();
        let user_repo: Arc<dyn UserRepositoryTrait> = store;

        Self {
            orders: Arc::new(OrderService::new(order_repo)),
            balances: Arc::new(BalanceService::new(balance_repo)),
            auth: Arc::new(AuthService::new(user_repo, jwt_manager.clone()).with_bcrypt_cost(4)),
            jwt_manager,
            database: None,
        }
    }
}
