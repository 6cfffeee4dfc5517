use std::sync::Arc;

use clock::Clock;
use config::Config;
use error::StartupError;
use middleware::RateLimiter;
use upstream::HeliusClient;

pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
pub mod upstream;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub upstream: HeliusClient,
    pub ip_limiter: Arc<RateLimiter>,
    pub wallet_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Result<Self, StartupError> {
        let upstream = HeliusClient::new(
            config.helius_rpc_url.clone(),
            config.helius_api_key.clone(),
            config.upstream_timeout(),
        )?
        .verbose(config.is_development());

        let window = config.rate_limit_window();
        let (ip_limiter, wallet_limiter) = match &config.redis_url {
            Some(url) => {
                let redis = redis::Client::open(url.as_str())?;
                (
                    RateLimiter::with_redis(
                        "ip",
                        config.rate_limit_ip_requests,
                        window,
                        clock.clone(),
                        redis.clone(),
                    ),
                    RateLimiter::with_redis(
                        "wallet",
                        config.rate_limit_wallet_requests,
                        window,
                        clock,
                        redis,
                    ),
                )
            }
            None => (
                RateLimiter::new("ip", config.rate_limit_ip_requests, window, clock.clone()),
                RateLimiter::new("wallet", config.rate_limit_wallet_requests, window, clock),
            ),
        };

        Ok(Self {
            config,
            upstream,
            ip_limiter: Arc::new(ip_limiter),
            wallet_limiter: Arc::new(wallet_limiter),
        })
    }
}
