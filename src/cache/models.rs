use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 缓存数据模型
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Value,
    pub timestamp: i64, // 毫秒时间戳
}

impl CacheEntry {
    pub fn is_fresh(&self, now: i64, ttl_millis: i64) -> bool {
        now - self.timestamp < ttl_millis
    }
}
