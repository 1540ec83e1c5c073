//! HTTP 安全头

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const SECURITY_HEADERS: [(&str, &str); 3] = [
    // 禁止浏览器猜测 Content-Type
    ("x-content-type-options", "nosniff"),
    // 禁止页面被嵌入 iframe
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "0"),
];

/// 为所有响应注入 HTTP 安全头
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    response
}
