#![allow(dead_code)]

use std::sync::Arc;

use ash_backend::{AppState, clock::ManualClock, config::Config, router::create_router};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::Value;
use wiremock::MockServer;

pub const TEST_API_KEY: &str = "test-key";

pub fn test_config(upstream: &MockServer) -> Config {
    Config {
        helius_api_key: TEST_API_KEY.to_string(),
        helius_rpc_url: format!("{}/", upstream.uri()),
        ..Config::default()
    }
}

pub fn test_app(config: Config, clock: Arc<ManualClock>) -> Router {
    let state = AppState::new(config, clock).expect("state");
    create_router(state)
}

pub fn rpc_request(ip: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/helius")
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Serves the router on an ephemeral port and returns its base URL.
pub async fn spawn_app(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
