//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use loyalty_shared::observability::middleware as obs_middleware;
use tower_http::timeout::TimeoutLayer;

use crate::{handlers, middleware::auth_middleware, middleware::security_headers, state::AppState};

/// 构建认证相关的路由（公开路由，无需认证）
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
}

/// 构建需要登录的用户路由
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            post(handlers::orders::submit_order).get(handlers::orders::list_orders),
        )
        .route("/balance", get(handlers::balance::get_balance))
        .route("/balance/withdraw", post(handlers::balance::withdraw))
        .route("/withdrawals", get(handlers::balance::list_withdrawals))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// `/api/user` 下的全部路由
pub fn api_routes(state: AppState) -> Router<AppState> {
    auth_routes().merge(user_routes(state))
}

/// 请求处理超时，超时返回 408
fn timeout_layer(request_timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout)
}

/// 构建完整应用
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .nest("/api/user", api_routes(state.clone()))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .layer(timeout_layer(request_timeout))
        .layer(middleware::from_fn(security_headers))
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
