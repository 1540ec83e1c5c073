//! 积分服务
//!
//! 用户登记订单号，由外部积分计算系统异步裁定是否计入积分，
//! 用户再以积分抵扣后续订单。核心是订单状态机、对账轮询循环以及余额一致性规则。

pub mod accrual;
pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
pub mod validation;

pub use error::{LoyaltyError, Result};
