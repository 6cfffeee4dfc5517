use axum::{
    body::Bytes,
    extract::{Json, Query, State},
};
use tracing::{debug, error, info, warn};

use crate::{
    AppState,
    error::AppError,
    models::{ProxyRequest, ProxyResponse},
};

use super::model::AssetsQuery;

/// 通用 JSON-RPC 代理。
///
/// IP 限流已在中间件完成；这里依次做钱包限流、参数校验、转发。
pub async fn rpc_proxy(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ProxyResponse>, AppError> {
    let req: ProxyRequest = serde_json::from_slice(&body).map_err(|e| {
        error!("Error in Helius API proxy: invalid request body: {}", e);
        AppError::InternalServerError
    })?;

    // 带钱包地址时按钱包限流
    if let Some(wallet) = req.wallet_key() {
        if !state.wallet_limiter.check(&wallet).await {
            warn!("Wallet rate limit exceeded: {}", wallet);
            return Err(AppError::WalletRateLimited);
        }
    }

    let method = req
        .method_name()
        .ok_or(AppError::Validation("Method is required"))?;

    if state.config.is_development() {
        debug!(
            "Helius API request: method={}, params={:?}, wallet={:?}",
            method, req.params, req.wallet_address
        );
    }

    let result = state.upstream.call(&method, req.params).await?;
    Ok(Json(ProxyResponse { result }))
}

pub async fn get_assets(
    State(state): State<AppState>,
    Query(query): Query<AssetsQuery>,
) -> Result<Json<ProxyResponse>, AppError> {
    let owner = query
        .owner
        .as_deref()
        .filter(|o| !o.is_empty())
        .ok_or(AppError::Validation("Owner address is required"))?;

    if state.config.is_development() {
        debug!("Getting assets for wallet: {}", owner);
    }

    let result = state.upstream.get_assets_by_owner(owner).await?;
    info!("Helius API request successful for getAssetsByOwner");
    Ok(Json(ProxyResponse { result }))
}

pub async fn get_block_height(
    State(state): State<AppState>,
) -> Result<Json<ProxyResponse>, AppError> {
    if state.config.is_development() {
        debug!("Getting current block height");
    }

    let result = state.upstream.get_block_height().await?;
    Ok(Json(ProxyResponse { result }))
}
