use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, error};

use crate::error::{AppError, StartupError};
use crate::models::{RpcRequest, RpcResponse};

/// `getAssetsByOwner` 每页条数
const ASSETS_PAGE_LIMIT: u32 = 100;

/// 持有 API 密钥的上游 JSON-RPC 客户端，密钥只在服务端使用
#[derive(Clone)]
pub struct HeliusClient {
    http: reqwest::Client,
    rpc_url: String,
    api_key: String,
    verbose: bool,
}

impl HeliusClient {
    pub fn new(
        rpc_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, StartupError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            rpc_url: rpc_url.into(),
            api_key: api_key.into(),
            verbose: false,
        })
    }

    /// 开发环境下输出请求细节
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// 转发一次 JSON-RPC 调用。
    ///
    /// 非 2xx 状态原样返回上游状态码；响应体带 `error` 时返回 400；
    /// 网络或解析失败统一视为内部错误。
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, AppError> {
        let request = RpcRequest::new(method, params);

        let response = self
            .http
            .post(&self.rpc_url)
            .query(&[("api-key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Error sending {} to Helius: {}", method, e);
                AppError::InternalServerError
            })?;

        let status = response.status();
        if self.verbose {
            debug!("Helius response for {}: {}", method, status);
        }

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or_default().to_string();
            if self.verbose {
                error!("Helius API error: {} {}", status.as_u16(), status_text);
            }
            return Err(AppError::UpstreamHttp {
                status,
                status_text,
            });
        }

        let data: RpcResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Helius response for {}: {}", method, e);
            AppError::InternalServerError
        })?;

        if let Some(message) = data.error_message() {
            if self.verbose {
                error!("Helius API returned an error: {:?}", data.error);
            }
            return Err(AppError::UpstreamRpc(message));
        }

        Ok(data.result.unwrap_or(Value::Null))
    }

    /// 钱包持有的同质化代币，不含 SOL 余额
    pub async fn get_assets_by_owner(&self, owner_address: &str) -> Result<Value, AppError> {
        let params = json!({
            "ownerAddress": owner_address,
            "page": 1,
            "limit": ASSETS_PAGE_LIMIT,
            "options": {
                "showFungible": true,
                "showNativeBalance": false,
            },
        });
        self.call("getAssetsByOwner", Some(params)).await
    }

    pub async fn get_block_height(&self) -> Result<Value, AppError> {
        self.call("getBlockHeight", Some(json!([]))).await
    }
}
