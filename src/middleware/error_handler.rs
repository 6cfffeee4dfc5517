use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, header},
    middleware::Next,
    response::Response,
};
use tracing::{error, info, warn};

use crate::error::AppError;

/// 错误响应体最多读取的字节数
const MAX_LOGGED_BODY: usize = 1024;

/// 按错误类型记录失败的请求。
///
/// 处理函数返回的 `AppError` 直接从响应 extensions 取出；
/// 其余 5xx（例如框架自身的拒绝）才去读响应体。
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    if let Some(err) = response.extensions().get::<AppError>() {
        log_app_error(&method, &path, err);
        return response;
    }

    if !response.status().is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_LOGGED_BODY).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    error!(
        "Server error on {} {} - Status: {}, Body: {}",
        method,
        path,
        parts.status,
        String::from_utf8_lossy(&bytes)
    );

    // 重置body以便重新构建响应
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}

fn log_app_error(method: &Method, path: &str, err: &AppError) {
    match err {
        AppError::InternalServerError => {
            error!("{} {} failed: {}", method, path, err);
        }
        AppError::UpstreamHttp { status, .. } => {
            error!("{} {} upstream returned {}: {}", method, path, status, err);
        }
        AppError::UpstreamRpc(message) => {
            warn!("{} {} upstream rpc error: {}", method, path, message);
        }
        AppError::IpRateLimited | AppError::WalletRateLimited => {
            warn!("{} {} rejected: {}", method, path, err);
        }
        AppError::Validation(message) => {
            info!("{} {} invalid request: {}", method, path, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware::from_fn, response::IntoResponse, routing::get};
    use tower::ServiceExt;

    async fn plain_failure() -> Response {
        (axum::http::StatusCode::BAD_GATEWAY, "upstream gone").into_response()
    }

    async fn typed_failure() -> Result<(), AppError> {
        Err(AppError::Validation("Method is required"))
    }

    fn app() -> Router {
        Router::new()
            .route("/plain", get(plain_failure))
            .route("/typed", get(typed_failure))
            .layer(from_fn(log_errors))
    }

    #[tokio::test]
    async fn untyped_server_error_body_is_preserved() {
        let response = app()
            .oneshot(Request::builder().uri("/plain").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::BAD_GATEWAY);
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"upstream gone");
    }

    #[tokio::test]
    async fn typed_error_passes_through_untouched() {
        let response = app()
            .oneshot(Request::builder().uri("/typed").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<AppError>().is_some());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"error":"Method is required"}"#);
    }
}
