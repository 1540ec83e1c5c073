//! 注册与登录
//!
//! 成功时通过 `Authorization` 响应头和 `jwt` Cookie 同时下发 Token

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use super::validated_json;
use crate::dto::CredentialsRequest;
use crate::error::Result;
use crate::middleware::AUTH_COOKIE;
use crate::state::AppState;

fn issue_session(jar: CookieJar, token: String) -> impl IntoResponse {
    let bearer = format!("Bearer {}", token);
    let cookie = Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .build();
    (StatusCode::OK, jar.add(cookie), [(header::AUTHORIZATION, bearer)])
}

/// POST /api/user/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let req = validated_json(payload)?;
    let token = state.auth.register(&req.login, &req.password).await?;
    Ok(issue_session(jar, token))
}

/// POST /api/user/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let req = validated_json(payload)?;
    let token = state.auth.login(&req.login, &req.password).await?;
    Ok(issue_session(jar, token))
}
