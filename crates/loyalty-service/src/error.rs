//! 积分服务错误类型定义

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde_json::json;

/// 积分服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum LoyaltyError {
    // 订单号校验
    #[error("订单号格式错误: {0}")]
    InvalidFormat(String),
    #[error("订单号校验和不合法: {0}")]
    InvalidIdentifier(String),

    // 业务错误
    #[error("订单号已被其他用户登记: {0}")]
    IdentifierConflict(String),
    #[error("余额不足: 需要 {required}, 可用 {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },
    #[error("金额不合法: {0}")]
    InvalidAmount(String),
    #[error("资源不存在: {0}")]
    NotFound(String),

    // 认证错误
    #[error("登录名已被占用: {0}")]
    LoginTaken(String),
    #[error("用户名或密码错误")]
    InvalidCredentials,
    #[error("未授权: {0}")]
    Unauthorized(String),

    // 请求校验
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 积分计算系统
    #[error("积分计算系统限流: {0}")]
    RateLimited(String),
    #[error("积分计算系统调用失败: {0}")]
    Accrual(String),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl LoyaltyError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidFormat(_) | Self::InvalidIdentifier(_) | Self::InvalidAmount(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::IdentifierConflict(_) | Self::LoginTaken(_) => StatusCode::CONFLICT,
            Self::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidCredentials | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Accrual(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "INVALID_FORMAT",
            Self::InvalidIdentifier(_) => "INVALID_ORDER_NUMBER",
            Self::IdentifierConflict(_) => "ORDER_NUMBER_CONFLICT",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::LoginTaken(_) => "LOGIN_TAKEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::Accrual(_) => "ACCRUAL_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 判断是否为可重试的错误
    ///
    /// 只有暂时性故障（外部系统、连接池）值得由轮询循环在下一轮重试
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Accrual(_) => true,
            Self::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }

    /// 判断是否为业务错误（同步返回给调用方，不重试）
    pub fn is_business_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat(_)
                | Self::InvalidIdentifier(_)
                | Self::IdentifierConflict(_)
                | Self::InsufficientFunds { .. }
                | Self::InvalidAmount(_)
                | Self::LoginTaken(_)
                | Self::InvalidCredentials
        )
    }
}

impl IntoResponse for LoyaltyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for LoyaltyError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, LoyaltyError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_status_code_mapping() {
        let cases: Vec<(LoyaltyError, StatusCode)> = vec![
            (
                LoyaltyError::InvalidFormat("abc".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LoyaltyError::InvalidIdentifier("79927398710".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LoyaltyError::IdentifierConflict("79927398713".into()),
                StatusCode::CONFLICT,
            ),
            (
                LoyaltyError::InsufficientFunds {
                    required: dec("10"),
                    available: dec("1"),
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (LoyaltyError::LoginTaken("alice".into()), StatusCode::CONFLICT),
            (LoyaltyError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (
                LoyaltyError::Unauthorized("missing".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                LoyaltyError::Validation("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                LoyaltyError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "{:?}", err);
        }
    }

    #[test]
    fn test_retryable_and_business_classification() {
        assert!(LoyaltyError::Accrual("timeout".into()).is_retryable());
        assert!(LoyaltyError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!LoyaltyError::Database(sqlx::Error::RowNotFound).is_retryable());
        assert!(!LoyaltyError::InvalidIdentifier("1".into()).is_retryable());

        assert!(LoyaltyError::IdentifierConflict("1".into()).is_business_error());
        assert!(!LoyaltyError::Accrual("x".into()).is_business_error());
    }

    #[tokio::test]
    async fn test_system_error_hides_details() {
        let response =
            LoyaltyError::Internal("connection string leaked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("leaked"));
    }
}
