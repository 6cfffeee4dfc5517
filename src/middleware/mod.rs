mod error_handler;
mod rate_limit;

pub use error_handler::log_errors;
pub use rate_limit::{
    RateLimitEntry, RateLimitStore, RateLimiter, UNKNOWN_IP, check_rate_limit, client_ip,
    ip_rate_limit,
};
