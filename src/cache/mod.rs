// 客户端缓存
// 按钱包地址缓存上游数据，固定 TTL

pub mod keys;
pub mod models;
pub mod operations;
pub mod store;

pub use keys::tokens_key;
pub use models::CacheEntry;
pub use operations::{DEFAULT_CACHE_TTL, TtlCache};
pub use store::{FileStore, KeyValueStore, MemoryStore, NoopStore, StoreError};
