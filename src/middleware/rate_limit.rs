use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;

use crate::{AppState, clock::Clock, error::AppError};

/// 无法识别来源 IP 时使用的标识
pub const UNKNOWN_IP: &str = "unknown-ip";

/// 单个标识在当前窗口内的计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    /// 窗口结束时间（毫秒时间戳）
    pub window_reset_at: i64,
}

pub type RateLimitStore = HashMap<String, RateLimitEntry>;

/// 固定窗口计数。
///
/// 没有记录或当前时间已超过 `window_reset_at` 时重置为 1 并放行；
/// 否则计数加一，计数不超过 `max_requests` 时放行。被拒绝的请求同样计数。
pub fn check_rate_limit(
    identifier: &str,
    store: &mut RateLimitStore,
    max_requests: u32,
    window: Duration,
    now: i64,
) -> bool {
    if let Some(entry) = store.get_mut(identifier) {
        if now <= entry.window_reset_at {
            entry.count = entry.count.saturating_add(1);
            return entry.count <= max_requests;
        }
    }

    store.insert(
        identifier.to_string(),
        RateLimitEntry {
            count: 1,
            window_reset_at: now + window.as_millis() as i64,
        },
    );
    true
}

enum Backend {
    Memory(Mutex<RateLimitStore>),
    Redis(Arc<redis::Client>),
}

pub struct RateLimiter {
    scope: &'static str,
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    backend: Backend,
}

impl RateLimiter {
    pub fn new(
        scope: &'static str,
        max_requests: u32,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scope,
            max_requests,
            window,
            clock,
            backend: Backend::Memory(Mutex::new(RateLimitStore::new())),
        }
    }

    /// 多实例部署时共享计数
    pub fn with_redis(
        scope: &'static str,
        max_requests: u32,
        window: Duration,
        clock: Arc<dyn Clock>,
        redis: redis::Client,
    ) -> Self {
        Self {
            scope,
            max_requests,
            window,
            clock,
            backend: Backend::Redis(Arc::new(redis)),
        }
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn check(&self, identifier: &str) -> bool {
        match &self.backend {
            Backend::Memory(store) => {
                let now = self.clock.now_millis();
                check_rate_limit(
                    identifier,
                    &mut lock(store),
                    self.max_requests,
                    self.window,
                    now,
                )
            }
            Backend::Redis(client) => match self.check_redis(client, identifier).await {
                Ok(allowed) => allowed,
                Err(e) => {
                    // Redis 不可用时放行，只记录告警
                    tracing::warn!("Rate limit check for {} failed open: {}", self.scope, e);
                    true
                }
            },
        }
    }

    async fn check_redis(
        &self,
        client: &redis::Client,
        identifier: &str,
    ) -> Result<bool, redis::RedisError> {
        let key = format!("rate_limit:{}:{}", self.scope, identifier);
        let mut conn = client.get_multiplexed_async_connection().await?;

        // INCR 与 PTTL 放在同一个事务里，计数和剩余时间来自同一时刻
        let (count, ttl): (u32, i64) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .pttl(&key)
            .query_async(&mut conn)
            .await?;

        // 没有过期时间的键（首次计数，或上次设置失败）在这里补上，
        // 否则计数永远不会回到 1
        if needs_window_expiry(ttl) {
            let _: () = conn.pexpire(&key, self.window.as_millis() as i64).await?;
        }

        Ok(count <= self.max_requests)
    }

    /// 当前窗口内的记录（Redis 后端始终返回 `None`）
    pub fn entry(&self, identifier: &str) -> Option<RateLimitEntry> {
        match &self.backend {
            Backend::Memory(store) => lock(store).get(identifier).copied(),
            Backend::Redis(_) => None,
        }
    }

    /// 清理已过期窗口，返回清理数量
    pub fn purge_expired(&self) -> usize {
        match &self.backend {
            Backend::Memory(store) => {
                let now = self.clock.now_millis();
                let mut store = lock(store);
                let before = store.len();
                store.retain(|_, entry| now <= entry.window_reset_at);
                before - store.len()
            }
            Backend::Redis(_) => 0,
        }
    }
}

/// `PTTL` 返回 -1 表示键存在但没有过期时间
fn needs_window_expiry(pttl: i64) -> bool {
    pttl < 0
}

fn lock(store: &Mutex<RateLimitStore>) -> MutexGuard<'_, RateLimitStore> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 取 `x-forwarded-for` 中第一个非空地址
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}

pub async fn ip_rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(req.headers());

    if !state.ip_limiter.check(&ip).await {
        tracing::warn!("IP rate limit exceeded: {}", ip);
        return AppError::IpRateLimited.into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use axum::http::HeaderValue;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn allows_up_to_max_then_rejects() {
        let mut store = RateLimitStore::new();
        for _ in 0..5 {
            assert!(check_rate_limit("1.2.3.4", &mut store, 5, WINDOW, 0));
        }
        assert!(!check_rate_limit("1.2.3.4", &mut store, 5, WINDOW, 0));
    }

    #[test]
    fn rejected_calls_keep_counting() {
        let mut store = RateLimitStore::new();
        for _ in 0..10 {
            check_rate_limit("wallet", &mut store, 2, WINDOW, 100);
        }
        assert_eq!(store["wallet"].count, 10);
    }

    #[test]
    fn window_reset_sets_count_to_one() {
        let mut store = RateLimitStore::new();
        for _ in 0..50 {
            check_rate_limit("ip", &mut store, 3, WINDOW, 0);
        }
        let reset_at = store["ip"].window_reset_at;
        assert_eq!(reset_at, 60_000);

        // 边界时刻仍属于旧窗口
        assert!(!check_rate_limit("ip", &mut store, 3, WINDOW, reset_at));

        assert!(check_rate_limit("ip", &mut store, 3, WINDOW, reset_at + 1));
        assert_eq!(
            store["ip"],
            RateLimitEntry {
                count: 1,
                window_reset_at: reset_at + 1 + 60_000,
            }
        );
    }

    #[test]
    fn identifiers_are_independent() {
        let mut store = RateLimitStore::new();
        assert!(check_rate_limit("a", &mut store, 1, WINDOW, 0));
        assert!(!check_rate_limit("a", &mut store, 1, WINDOW, 0));
        assert!(check_rate_limit("b", &mut store, 1, WINDOW, 0));
    }

    #[tokio::test]
    async fn limiter_uses_injected_clock() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::new("ip", 2, WINDOW, clock.clone());

        assert!(limiter.check("x").await);
        assert!(limiter.check("x").await);
        assert!(!limiter.check("x").await);

        clock.advance(WINDOW + Duration::from_millis(1));
        assert!(limiter.check("x").await);
        assert_eq!(limiter.entry("x").map(|e| e.count), Some(1));
    }

    #[tokio::test]
    async fn purge_drops_only_stale_entries() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::new("wallet", 30, WINDOW, clock.clone());

        limiter.check("old").await;
        clock.advance(Duration::from_secs(30));
        limiter.check("new").await;
        clock.advance(Duration::from_secs(31));

        assert_eq!(limiter.purge_expired(), 1);
        assert!(limiter.entry("old").is_none());
        assert!(limiter.entry("new").is_some());
    }

    #[test]
    fn keys_without_ttl_get_a_window() {
        assert!(needs_window_expiry(-1));
        assert!(needs_window_expiry(-2));
        assert!(!needs_window_expiry(0));
        assert!(!needs_window_expiry(59_000));
    }

    #[tokio::test]
    async fn unreachable_redis_fails_open() {
        let client = redis::Client::open("redis://127.0.0.1:1/").unwrap();
        let limiter = RateLimiter::with_redis(
            "ip",
            1,
            WINDOW,
            Arc::new(ManualClock::new(0)),
            client,
        );

        for _ in 0..3 {
            assert!(limiter.check("203.0.113.9").await);
        }
        assert!(limiter.entry("203.0.113.9").is_none());
        assert_eq!(limiter.purge_expired(), 0);
    }

    #[test]
    fn client_ip_takes_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), UNKNOWN_IP);

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }
}
