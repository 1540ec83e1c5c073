//! 余额与提现

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::validated_json;
use crate::dto::{BalanceResponse, WithdrawRequest, WithdrawalResponse};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// GET /api/user/balance
pub async fn get_balance(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<BalanceResponse>> {
    let balance = state.balances.get_balance(user.id).await?;
    Ok(Json(balance.into()))
}

/// POST /api/user/balance/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: std::result::Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let req = validated_json(payload)?;
    state
        .balances
        .withdraw(user.id, &req.order, req.sum)
        .await?;
    Ok(StatusCode::OK)
}

/// GET /api/user/withdrawals
///
/// 没有提现记录时返回 204
pub async fn list_withdrawals(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response> {
    let withdrawals = state.balances.list_withdrawals(user.id).await?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<WithdrawalResponse> = withdrawals
        .into_iter()
        .map(WithdrawalResponse::from)
        .collect();
    Ok(Json(body).into_response())
}
