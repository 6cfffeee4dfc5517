/// 代币列表缓存键前缀
const TOKENS_PREFIX: &str = "ash-coin-tokens-cache";

/// 生成钱包代币列表缓存键
pub fn tokens_key(owner_address: &str) -> String {
    format!("{}-{}", TOKENS_PREFIX, owner_address)
}
