use super::market::MarketAsset;

/// 资产加载失败时展示给用户的提示
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load your assets. Please try again later.";

/// 奖励代币符号
const ASH_SYMBOL: &str = "ASH";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Portfolio {
    /// 按价值从高到低排序
    pub assets: Vec<MarketAsset>,
    pub total_value: f64,
    pub ash_balance: f64,
    pub error: Option<String>,
}

impl Portfolio {
    pub fn from_assets(mut assets: Vec<MarketAsset>) -> Self {
        assets.retain(|a| a.ui_amount > 0.0);
        assets.sort_by(|a, b| b.value.total_cmp(&a.value));

        let total_value = assets.iter().map(|a| a.value).sum();
        let ash_balance = assets
            .iter()
            .find(|a| a.symbol == ASH_SYMBOL)
            .map(|a| a.ui_amount)
            .unwrap_or(0.0);

        Self {
            assets,
            total_value,
            ash_balance,
            error: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            error: Some(LOAD_FAILED_MESSAGE.to_string()),
            ..Self::default()
        }
    }
}
