use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// 代理接口的错误类型，统一转换为 `{"error": ...}` 响应体。
///
/// 转换后的响应在 extensions 中带一份错误本身，供日志中间件分类记录。
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("Rate limit exceeded for your IP")]
    IpRateLimited,
    #[error("Rate limit exceeded for this wallet")]
    WalletRateLimited,
    #[error("Helius API error: {status_text}")]
    UpstreamHttp {
        status: StatusCode,
        status_text: String,
    },
    #[error("{0}")]
    UpstreamRpc(String),
    #[error("Internal server error")]
    InternalServerError,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::UpstreamRpc(_) => StatusCode::BAD_REQUEST,
            AppError::IpRateLimited | AppError::WalletRateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::UpstreamHttp { status, .. } => *status,
            AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        let mut response = (self.status(), body).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// 服务启动阶段的错误
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("failed to create Redis client: {0}")]
    Redis(#[from] redis::RedisError),
}
