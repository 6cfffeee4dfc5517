use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::cache::{DEFAULT_CACHE_TTL, KeyValueStore, TtlCache, tokens_key};
use crate::clock::{Clock, SystemClock};
use crate::models::{Asset, RpcResponse};

use super::market::{
    MarketAsset, MarketQuotes, SimulatedQuotes, filter_owned_tokens, token_market_data,
};
use super::portfolio::Portfolio;

/// 区块高度获取失败时的兜底基数
pub const FALLBACK_BLOCK_HEIGHT_BASE: u64 = 1_040_000;
/// 兜底值上加的随机偏移范围
pub const FALLBACK_BLOCK_HEIGHT_JITTER: u64 = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP error! Status: {status}, {body}")]
    Status { status: StatusCode, body: String },
    #[error("{0}")]
    Api(String),
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

/// 调用后端代理接口的客户端，代币列表按钱包缓存
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    cache: TtlCache,
    quotes: Arc<dyn MarketQuotes>,
}

impl ApiClient {
    /// `base_url` 指向代理接口前缀，例如 `http://localhost:3000/api`
    pub fn new(base_url: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(base_url, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        base_url: impl Into<String>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: TtlCache::new(store, clock, DEFAULT_CACHE_TTL),
            quotes: Arc::new(SimulatedQuotes),
        }
    }

    pub fn quotes(mut self, quotes: Arc<dyn MarketQuotes>) -> Self {
        self.quotes = quotes;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = self.cache.with_ttl(ttl);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// 解析代理接口的 `{result}` / `{error}` 响应
    async fn read_result(response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        let data: RpcResponse = serde_json::from_slice(&response.bytes().await?)?;
        // 代理返回字符串错误，上游透传的是对象
        if let Some(message) = data.error_message() {
            let message = data
                .error
                .as_ref()
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(message);
            error!("API error: {}", message);
            return Err(ClientError::Api(message));
        }

        Ok(data.result.unwrap_or(Value::Null))
    }

    async fn get_backend(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ClientError> {
        let url = self.endpoint(path);
        debug!("Calling backend API: {}", url);

        let response = self.http.get(&url).query(query).send().await?;
        Self::read_result(response).await.inspect_err(|e| {
            error!("Error in API call to {}: {}", url, e);
        })
    }

    /// 通过 `/helius` 转发任意 RPC 方法
    pub async fn rpc_call(
        &self,
        method: &str,
        params: Value,
        wallet_address: Option<&str>,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint("helius");
        let mut body = json!({ "method": method, "params": params });
        if let Some(wallet) = wallet_address {
            body["walletAddress"] = Value::String(wallet.to_string());
        }
        debug!("Calling backend API: {} {}", url, method);

        let response = self.http.post(&url).json(&body).send().await?;
        Self::read_result(response).await.inspect_err(|e| {
            error!("Error in API call to {}: {}", url, e);
        })
    }

    /// 读缓存，未命中时请求后端并写回缓存；错误原样返回
    pub async fn fetch_tokens_by_owner(
        &self,
        owner_address: &str,
    ) -> Result<Vec<Asset>, ClientError> {
        info!("Fetching tokens for wallet: {}", owner_address);
        let key = tokens_key(owner_address);

        let mut result = match self.cache.get(&key).filter(|v| !v.is_null()) {
            Some(cached) => cached,
            None => {
                let fresh = self
                    .get_backend("helius/assets", &[("owner", owner_address)])
                    .await?;
                self.cache.set(&key, &fresh);
                fresh
            }
        };

        let items = match result.get_mut("items").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };

        let assets = items.into_iter().filter_map(|item| {
            serde_json::from_value::<Asset>(item)
                .inspect_err(|e| warn!("Skipping malformed asset: {}", e))
                .ok()
        });

        let tokens = filter_owned_tokens(assets);
        debug!("Filtered tokens (non-zero balance, excluding SOL): {}", tokens.len());
        Ok(tokens)
    }

    /// 钱包持有的代币（不含 SOL 和零余额），出错时返回空列表
    pub async fn get_tokens_by_owner(&self, owner_address: &str) -> Vec<Asset> {
        self.fetch_tokens_by_owner(owner_address)
            .await
            .unwrap_or_else(|e| {
                error!("Error fetching tokens: {}", e);
                Vec::new()
            })
    }

    /// 删除该钱包的缓存
    pub fn clear_cache(&self, owner_address: &str) {
        self.cache.remove(&tokens_key(owner_address));
        info!("Cache cleared for wallet: {}", owner_address);
    }

    /// 强制刷新：先删缓存再请求
    pub async fn refresh_tokens_by_owner(&self, owner_address: &str) -> Vec<Asset> {
        self.clear_cache(owner_address);
        self.get_tokens_by_owner(owner_address).await
    }

    pub fn get_token_market_data(&self, tokens: &[Asset]) -> Vec<MarketAsset> {
        token_market_data(tokens, self.quotes.as_ref())
    }

    /// 当前区块高度，失败时返回兜底值
    pub async fn get_current_block_height(&self) -> u64 {
        let fetched = self
            .get_backend("helius/blockheight", &[])
            .await
            .and_then(|v| {
                v.as_u64()
                    .ok_or_else(|| ClientError::Api(format!("unexpected block height: {}", v)))
            });

        match fetched {
            Ok(height) => height,
            Err(e) => {
                error!("Error getting current block height: {}", e);
                FALLBACK_BLOCK_HEIGHT_BASE
                    + rand::thread_rng().gen_range(0..FALLBACK_BLOCK_HEIGHT_JITTER)
            }
        }
    }

    /// 仪表盘所需的资产汇总
    pub async fn load_portfolio(&self, owner_address: &str, force_refresh: bool) -> Portfolio {
        if force_refresh {
            self.clear_cache(owner_address);
        }

        match self.fetch_tokens_by_owner(owner_address).await {
            Ok(tokens) => Portfolio::from_assets(self.get_token_market_data(&tokens)),
            Err(e) => {
                error!("Error fetching assets: {}", e);
                Portfolio::failed()
            }
        }
    }
}
