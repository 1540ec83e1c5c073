//! 健康检查

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::warn;

use crate::state::AppState;

const SERVICE_NAME: &str = "loyalty-service";

/// 存活探针：服务进程正常即返回 ok
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查数据库连接是否可用
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match &state.database {
        Some(db) => match db.ping().await {
            Ok(latency) => json!({ "status": "ok", "latency_ms": latency.as_millis() as u64 }),
            Err(e) => {
                warn!(error = %e, "数据库就绪检查失败");
                json!({ "status": "fail" })
            }
        },
        None => json!({ "status": "ok", "backend": "memory" }),
    };

    let db_ok = database["status"] == "ok";
    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_ok { "ok" } else { "degraded" },
            "service": SERVICE_NAME,
            "checks": { "database": database }
        })),
    )
}
