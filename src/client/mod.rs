// 浏览器侧 API 封装
// 读缓存 -> 调后端代理 -> 写缓存

pub mod api;
pub mod market;
pub mod portfolio;

pub use api::{ApiClient, ClientError};
pub use market::{FixedQuotes, MarketAsset, MarketQuotes, NATIVE_SOL_MINT, SimulatedQuotes};
pub use portfolio::{LOAD_FAILED_MESSAGE, Portfolio};
