use std::env;
use std::time::Duration;

/// 上游 Helius RPC 默认地址
pub const DEFAULT_HELIUS_RPC_URL: &str = "https://mainnet.helius-rpc.com/";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub helius_api_key: String,
    pub helius_rpc_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_ip_requests: u32,
    pub rate_limit_wallet_requests: u32,
    pub redis_url: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
    pub app_env: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            helius_api_key: String::new(),
            helius_rpc_url: DEFAULT_HELIUS_RPC_URL.to_string(),
            server_host: "::".to_string(),
            server_port: 3000,
            api_base_uri: "/api".to_string(),
            rate_limit_window_secs: 60,
            rate_limit_ip_requests: 60,
            rate_limit_wallet_requests: 30,
            redis_url: None,
            upstream_timeout_secs: None,
            app_env: "production".to_string(),
        }
    }
}

/// 统一成 `/api` 这样的形式：有前导 `/`，无结尾 `/`；根路径返回空串
pub fn normalize_base_uri(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源构建配置，缺失或无法解析的值回退到默认值
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // 两个变量名都接受，先找到的非空值生效
        let helius_api_key = non_empty("HELIUS_API_KEY")
            .or_else(|| non_empty("NEXT_PUBLIC_HELIUS_API_KEY"))
            .unwrap_or_default();

        Config {
            helius_api_key,
            helius_rpc_url: non_empty("HELIUS_RPC_URL").unwrap_or(defaults.helius_rpc_url),
            server_host: non_empty("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: non_empty("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            api_base_uri: non_empty("API_BASE_URI")
                .map(|v| normalize_base_uri(&v))
                .unwrap_or(defaults.api_base_uri),
            rate_limit_window_secs: non_empty("RATE_LIMIT_WINDOW")
                .and_then(|v| v.trim_end_matches('s').parse().ok())
                .unwrap_or(defaults.rate_limit_window_secs),
            rate_limit_ip_requests: non_empty("RATE_LIMIT_IP_REQUESTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_ip_requests),
            rate_limit_wallet_requests: non_empty("RATE_LIMIT_WALLET_REQUESTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_wallet_requests),
            redis_url: non_empty("REDIS_URL"),
            upstream_timeout_secs: non_empty("UPSTREAM_TIMEOUT_SECS").and_then(|v| v.parse().ok()),
            app_env: non_empty("APP_ENV").unwrap_or(defaults.app_env),
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.upstream_timeout_secs.map(Duration::from_secs)
    }

    pub fn is_development(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("development")
    }

    /// 隐藏密钥后的上游地址，仅用于日志
    pub fn masked_rpc_url(&self) -> String {
        let key = if self.helius_api_key.is_empty() {
            ""
        } else {
            "MASKED"
        };
        format!("{}?api-key={}", self.helius_rpc_url, key)
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "Helius API key length: {}, empty: {}",
            self.helius_api_key.len(),
            self.helius_api_key.is_empty()
        );
        if self.helius_api_key.is_empty() {
            tracing::warn!("No Helius API key found in HELIUS_API_KEY or NEXT_PUBLIC_HELIUS_API_KEY");
        } else {
            let prefix: String = self.helius_api_key.chars().take(4).collect();
            tracing::info!("Helius API key first 4 chars: {}", prefix);
        }
        tracing::info!("RPC URL: {}", self.masked_rpc_url());
        tracing::info!("APP_ENV: {}", self.app_env);
        tracing::info!(
            "Rate limits: {} req/ip, {} req/wallet per {}s (backend: {})",
            self.rate_limit_ip_requests,
            self.rate_limit_wallet_requests,
            self.rate_limit_window_secs,
            if self.redis_url.is_some() { "redis" } else { "memory" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.helius_api_key, "");
        assert_eq!(config.rate_limit_ip_requests, 60);
        assert_eq!(config.rate_limit_wallet_requests, 30);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
        assert!(config.redis_url.is_none());
        assert!(!config.is_development());
    }

    #[test]
    fn primary_key_name_wins_over_public_one() {
        let config = Config::from_lookup(lookup_from(&[
            ("HELIUS_API_KEY", "server-key"),
            ("NEXT_PUBLIC_HELIUS_API_KEY", "public-key"),
        ]));
        assert_eq!(config.helius_api_key, "server-key");

        let config =
            Config::from_lookup(lookup_from(&[("NEXT_PUBLIC_HELIUS_API_KEY", "public-key")]));
        assert_eq!(config.helius_api_key, "public-key");
    }

    #[test]
    fn base_uri_is_normalized() {
        let base = |v: &str| Config::from_lookup(lookup_from(&[("API_BASE_URI", v)])).api_base_uri;
        assert_eq!(base("/api"), "/api");
        assert_eq!(base("api"), "/api");
        assert_eq!(base("/v1/proxy/"), "/v1/proxy");
        assert_eq!(base("/"), "");
        assert_eq!(base("//"), "");
    }

    #[test]
    fn masked_url_never_contains_key() {
        let config = Config {
            helius_api_key: "abcd1234secret".into(),
            ..Config::default()
        };
        let masked = config.masked_rpc_url();
        assert!(!masked.contains("abcd1234secret"));
        assert!(masked.ends_with("api-key=MASKED"));
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("SERVER_PORT", "not-a-port"),
            ("RATE_LIMIT_WINDOW", "90s"),
            ("APP_ENV", "Development"),
        ]));
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.rate_limit_window_secs, 90);
        assert!(config.is_development());
    }
}
