use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::{
    AppState,
    config::normalize_base_uri,
    middleware::{ip_rate_limit, log_errors},
    routes::{health, helius},
};

// 只有通用 RPC 代理接口需要 IP 限流
fn rpc_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/helius", post(helius::rpc_proxy))
        .route_layer(from_fn_with_state(state.clone(), ip_rate_limit))
}

fn query_routes() -> Router<AppState> {
    Router::new()
        .route("/helius/assets", get(helius::get_assets))
        .route("/helius/blockheight", get(helius::get_block_height))
        .route("/ping", get(health::ping))
}

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let api = Router::new().merge(query_routes()).merge(rpc_routes(&state));

    // axum 不允许在根路径 nest，前缀为空时直接合并
    let base = normalize_base_uri(&state.config.api_base_uri);
    let router = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&base, api)
    }
    .layer(from_fn(log_errors));

    // 开发模式下允许跨域
    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    router.with_state(state)
}
