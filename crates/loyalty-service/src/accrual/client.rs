//! 积分计算系统客户端
//!
//! `GET {base_url}/api/orders/{number}`：
//! - 200：返回裁定 JSON
//! - 204：订单未在积分计算系统登记
//! - 429：限流，可能携带 Retry-After（秒）
//! - 其他状态码：非致命，交由调用方记录

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use tracing::debug;

use crate::error::{LoyaltyError, Result};
use crate::models::AccrualVerdict;
use loyalty_shared::config::AccrualConfig;

/// 单次查询的结果
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualResponse {
    Verdict(AccrualVerdict),
    NotRegistered,
    RateLimited { retry_after: Option<Duration> },
    Unexpected { status: u16 },
}

/// 积分计算系统接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccrualClient: Send + Sync {
    /// 查询单个订单；传输失败或响应体无法解析时返回 `Err(Accrual)`
    async fn fetch(&self, number: &str) -> Result<AccrualResponse>;
}

/// 基于 reqwest 的实现
pub struct HttpAccrualClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAccrualClient {
    pub fn new(config: &AccrualConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LoyaltyError::Internal(format!("构建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn order_url(&self, number: &str) -> String {
        format!("{}/api/orders/{}", self.base_url, number)
    }
}

/// 解析 Retry-After 秒数，HTTP 日期格式不支持，按缺失处理
fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl AccrualClient for HttpAccrualClient {
    async fn fetch(&self, number: &str) -> Result<AccrualResponse> {
        let response = self
            .http
            .get(self.order_url(number))
            .send()
            .await
            .map_err(|e| LoyaltyError::Accrual(format!("请求订单 {} 失败: {}", number, e)))?;

        let status = response.status();
        debug!(order = %number, status = status.as_u16(), "积分计算系统响应");

        match status {
            StatusCode::OK => {
                let verdict = response.json::<AccrualVerdict>().await.map_err(|e| {
                    LoyaltyError::Accrual(format!("解析订单 {} 的裁定失败: {}", number, e))
                })?;
                Ok(AccrualResponse::Verdict(verdict))
            }
            StatusCode::NO_CONTENT => Ok(AccrualResponse::NotRegistered),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = parse_retry_after(
                    response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                );
                Ok(AccrualResponse::RateLimited { retry_after })
            }
            other => Ok(AccrualResponse::Unexpected {
                status: other.as_u16(),
            }),
        }
    }
}
