//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册指标描述，出现在 /metrics 的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "orders_submitted_total",
        "Order submissions by outcome"
    );
    metrics::describe_counter!(
        "accrual_polls_total",
        "Accrual authority queries by outcome"
    );
    metrics::describe_counter!(
        "accrual_credited_total",
        "Total points credited from processed orders"
    );
    metrics::describe_counter!(
        "accrual_cooldowns_total",
        "Number of times the authority throttled the reconciliation loop"
    );
    metrics::describe_gauge!("accrual_pending_orders", "Orders awaiting a final verdict");
    metrics::describe_counter!("withdrawals_total", "Withdrawals by outcome");
    metrics::describe_gauge!(
        "worker_last_run_timestamp",
        "Unix timestamp of the last completed worker run"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录订单提交结果（accepted / already_submitted / conflict / invalid）
#[inline]
pub fn record_order_submission(outcome: &str) {
    metrics::counter!("orders_submitted_total", "outcome" => outcome.to_string()).increment(1);
}

/// 记录一次积分计算系统查询结果
#[inline]
pub fn record_accrual_poll(outcome: &str) {
    metrics::counter!("accrual_polls_total", "outcome" => outcome.to_string()).increment(1);
}

/// 记录入账积分
#[inline]
pub fn record_accrual_credit(amount: f64) {
    metrics::counter!("accrual_credited_total").increment(amount.max(0.0).round() as u64);
}

/// 记录一次限流冷却
#[inline]
pub fn record_accrual_cooldown() {
    metrics::counter!("accrual_cooldowns_total").increment(1);
}

/// 更新待处理订单数
#[inline]
pub fn set_pending_orders(count: usize) {
    metrics::gauge!("accrual_pending_orders").set(count as f64);
}

/// 记录提现结果（success / insufficient_funds / invalid）
#[inline]
pub fn record_withdrawal(outcome: &str) {
    metrics::counter!("withdrawals_total", "outcome" => outcome.to_string()).increment(1);
}

/// 记录 Worker 最近一次运行时间
#[inline]
pub fn set_worker_last_run(worker: &str) {
    metrics::gauge!("worker_last_run_timestamp", "worker" => worker.to_string())
        .set(chrono::Utc::now().timestamp() as f64);
}
