//! HTTP 处理器

pub mod auth;
pub mod balance;
pub mod health;
pub mod orders;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{LoyaltyError, Result};

/// 解析并校验 JSON 请求体，任何格式问题都映射为 400
pub(crate) fn validated_json<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let Json(body) = payload.map_err(|e| LoyaltyError::Validation(e.body_text()))?;
    body.validate()?;
    Ok(body)
}
