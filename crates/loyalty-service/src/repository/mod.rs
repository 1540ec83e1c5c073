//! 数据库仓储层
//!
//! 提供订单、余额、用户的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 需要原子性的复合操作（裁定 + 入账、扣款 + 记账）在仓储内部以单个事务完成
//! - 定义 trait 接口以支持 mock 测试和内存实现

mod balance_repo;
mod memory;
mod order_repo;
mod traits;
mod user_repo;

pub use balance_repo::PgBalanceRepository;
pub use memory::MemoryStore;
pub use order_repo::PgOrderRepository;
pub use traits::*;
pub use user_repo::PgUserRepository;

/// 嵌入的数据库迁移
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
