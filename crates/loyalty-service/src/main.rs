//! 积分服务
//!
//! 提供用户注册登录、订单登记、余额与提现 REST API，
//! 并在后台与积分计算系统对账。

use std::sync::Arc;
use std::time::Duration;

use loyalty_service::{
    accrual::{AccrualWorker, HttpAccrualClient, Reconciler, SystemClock},
    auth::{JwtConfig, JwtManager},
    repository::MIGRATOR,
    routes,
    state::AppState,
};
use loyalty_shared::{
    config::{AppConfig, DEFAULT_JWT_SECRET},
    database::Database,
    observability,
    retry::RetryPolicy,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("loyalty-service")?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting loyalty-service on {}", config.server_addr());

    // 签名密钥：生产环境必须显式注入
    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        if config.is_production() {
            anyhow::bail!("JWT_SECRET must be set in production environment");
        }
        warn!("Using default JWT secret - set JWT_SECRET for production");
    }
    let jwt_manager = JwtManager::new(JwtConfig::from(&config.auth));

    // 启动阶段数据库可能尚未就绪，按指数退避重试
    let db = Database::connect_with_retry(&config.database, &RetryPolicy::default()).await?;
    db.migrate(&MIGRATOR).await?;

    let state = AppState::with_postgres(db.clone(), jwt_manager);

    // 积分对账 Worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler = Reconciler::new(
        state.orders.clone(),
        Arc::new(HttpAccrualClient::new(&config.accrual)?),
        Arc::new(SystemClock),
        Duration::from_secs(config.accrual.cooldown_secs),
    );
    let worker = AccrualWorker::new(
        reconciler,
        Duration::from_secs(config.accrual.poll_interval_secs),
    );
    let worker_handle = tokio::spawn(worker.run(shutdown_rx));

    let app = routes::build_router(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 通知 Worker 放弃本轮剩余订单并退出
    let _ = shutdown_tx.send(true);
    match worker_handle.await {
        Ok(report) => info!(?report, "AccrualWorker exited"),
        Err(e) => error!(error = %e, "AccrualWorker task failed"),
    }

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
