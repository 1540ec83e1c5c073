//! JWT 认证中间件
//!
//! Token 可以来自 `Authorization: Bearer` 头，也可以来自 `jwt` Cookie，
//! 验证通过后将 Claims 注入请求扩展

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    extract::cookie::CookieJar,
    typed_header::TypedHeaderRejection,
    headers::{Authorization, authorization::Bearer},
};

use crate::auth::Claims;
use crate::error::LoyaltyError;
use crate::state::AppState;

/// 存放会话 Token 的 Cookie 名
pub const AUTH_COOKIE: &str = "jwt";

/// 认证中间件
///
/// 优先使用 Bearer 头，其次使用 Cookie；两者都没有时返回 401
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer
        .ok()
        .map(|TypedHeader(Authorization(b))| b.token().to_string())
        .or_else(|| jar.get(AUTH_COOKIE).map(|c| c.value().to_string()));

    let Some(token) = token else {
        return LoyaltyError::Unauthorized("缺少认证 Token".to_string()).into_response();
    };

    match state.jwt_manager.verify_token(&token) {
        Ok(claims) => {
            // 将 Claims 注入请求扩展，供后续处理器使用
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// 当前登录用户
///
/// 只能用于挂载了认证中间件的路由
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub login: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = LoyaltyError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .ok_or_else(|| LoyaltyError::Unauthorized("未登录".to_string()))?;

        Ok(Self {
            id: claims.user_id()?,
            login: claims.login.clone(),
        })
    }
}
