//! 业务服务层
//!
//! 服务只依赖仓储 trait，既可以接 PostgreSQL 实现，也可以接内存实现

mod auth_service;
mod balance_service;
mod order_service;

pub use auth_service::AuthService;
pub use balance_service::BalanceService;
pub use order_service::OrderService;
