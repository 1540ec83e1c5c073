//! 积分服务领域模型

pub mod balance;
pub mod enums;
pub mod order;
pub mod user;

pub use balance::{Balance, Withdrawal};
pub use enums::{AccrualStatus, OrderStatus};
pub use order::{AccrualVerdict, Order, SubmitOutcome, VerdictOutcome};
pub use user::User;
