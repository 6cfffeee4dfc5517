use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error};

use crate::cache::{
    models::CacheEntry,
    store::{KeyValueStore, StoreError},
};
use crate::clock::Clock;

/// 默认缓存有效期：1 分钟
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// 在键值存储之上按固定 TTL 读写 `{data, timestamp}`。
///
/// 读写失败只记录日志，调用方看到的是未命中。
#[derive(Clone)]
pub struct TtlCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// 未过期（年龄小于 TTL）的缓存数据
    pub fn get(&self, key: &str) -> Option<Value> {
        if !self.store.is_available() {
            return None;
        }

        let raw = match self.store.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!("Error reading from cache: {}", e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                error!("Error reading from cache: {}", e);
                return None;
            }
        };

        if entry.is_fresh(self.clock.now_millis(), self.ttl.as_millis() as i64) {
            debug!("Using cached data for {}", key);
            Some(entry.data)
        } else {
            debug!("Cache expired for {}", key);
            None
        }
    }

    pub fn set(&self, key: &str, data: &Value) {
        if !self.store.is_available() {
            return;
        }

        let entry = CacheEntry {
            data: data.clone(),
            timestamp: self.clock.now_millis(),
        };

        let result = serde_json::to_string(&entry)
            .map_err(StoreError::from)
            .and_then(|json| self.store.set_item(key, &json));

        match result {
            Ok(()) => debug!("Data cached for {}", key),
            Err(e) => error!("Error writing to cache: {}", e),
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove_item(key) {
            error!("Error clearing cache for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::{MemoryStore, NoopStore};
    use crate::clock::ManualClock;
    use serde_json::json;

    fn cache_with_clock() -> (TtlCache, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = TtlCache::new(store.clone(), clock.clone(), DEFAULT_CACHE_TTL);
        (cache, store, clock)
    }

    #[test]
    fn fresh_entry_is_returned_until_ttl() {
        let (cache, _, clock) = cache_with_clock();
        cache.set("k", &json!({"items": [1, 2]}));

        clock.advance(Duration::from_millis(59_999));
        assert_eq!(cache.get("k"), Some(json!({"items": [1, 2]})));

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn entries_use_data_timestamp_layout() {
        let (cache, store, _) = cache_with_clock();
        cache.set("k", &json!(7));

        let raw = store.get_item("k").unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!({"data": 7, "timestamp": 1_000_000}));
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let (cache, store, _) = cache_with_clock();
        store.set_item("k", "garbage").unwrap();
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn remove_forces_miss() {
        let (cache, _, _) = cache_with_clock();
        cache.set("k", &json!("v"));
        cache.remove("k");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn unavailable_store_always_misses() {
        let cache = TtlCache::new(
            Arc::new(NoopStore),
            Arc::new(ManualClock::new(0)),
            DEFAULT_CACHE_TTL,
        );
        cache.set("k", &json!(1));
        assert_eq!(cache.get("k"), None);
    }
}
