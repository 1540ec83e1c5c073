//! 订单登记与查询

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::dto::OrderResponse;
use crate::error::{LoyaltyError, Result};
use crate::middleware::CurrentUser;
use crate::models::SubmitOutcome;
use crate::state::AppState;

/// POST /api/user/orders
///
/// 请求体为纯文本订单号：202 新登记，200 本人重复提交
pub async fn submit_order(
    State(state): State<AppState>,
    user: CurrentUser,
    body: String,
) -> Result<StatusCode> {
    let number = body.trim();
    if number.is_empty() {
        return Err(LoyaltyError::Validation("订单号不能为空".to_string()));
    }

    match state.orders.submit_order(user.id, number).await? {
        SubmitOutcome::Accepted => Ok(StatusCode::ACCEPTED),
        SubmitOutcome::AlreadySubmitted => Ok(StatusCode::OK),
    }
}

/// GET /api/user/orders
///
/// 没有订单时返回 204
pub async fn list_orders(State(state): State<AppState>, user: CurrentUser) -> Result<Response> {
    let orders = state.orders.list_orders(user.id).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(Json(body).into_response())
}
