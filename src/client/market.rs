//! 代币过滤与行情派生字段。

use rand::Rng;
use serde::Serialize;

use crate::models::Asset;

/// 原生 SOL 的 mint 地址，始终从列表中排除
pub const NATIVE_SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// 代币没有声明精度时使用的默认值
const DEFAULT_DECIMALS: u32 = 9;
/// 没有供应量信息时假定的供应量
const DEFAULT_SUPPLY: f64 = 1_000_000_000.0;

/// `MarketAsset` 自身写入的字段，序列化前从原始条目中移除
const DERIVED_KEYS: &[&str] = &[
    "price",
    "marketCap",
    "change24h",
    "value",
    "uiAmount",
    "symbol",
    "name",
    "decimals",
    "isNft",
    "hasPrice",
];

/// 价格与 24 小时涨跌来源。
///
/// 目前没有接入真实行情，缺失价格时由实现方给出占位数值。
pub trait MarketQuotes: Send + Sync {
    fn fallback_price(&self, asset: &Asset) -> f64;
    fn change_24h(&self, asset: &Asset) -> f64;
}

/// 随机占位行情：价格 [0.000001, 1)，涨跌 [-15, 15)
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedQuotes;

impl MarketQuotes for SimulatedQuotes {
    fn fallback_price(&self, _asset: &Asset) -> f64 {
        rand::thread_rng().gen_range(0.000_001..1.0)
    }

    fn change_24h(&self, _asset: &Asset) -> f64 {
        rand::thread_rng().gen_range(-15.0..15.0)
    }
}

/// 固定行情
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedQuotes {
    pub price: f64,
    pub change_24h: f64,
}

impl MarketQuotes for FixedQuotes {
    fn fallback_price(&self, _asset: &Asset) -> f64 {
        self.price
    }

    fn change_24h(&self, _asset: &Asset) -> f64 {
        self.change_24h
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAsset {
    #[serde(flatten)]
    pub asset: Asset,
    pub price: f64,
    pub market_cap: f64,
    #[serde(rename = "change24h")]
    pub change_24h: f64,
    pub value: f64,
    pub ui_amount: f64,
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
    pub is_nft: bool,
    pub has_price: bool,
}

/// 去掉 SOL 和余额为零（或缺失）的条目
pub fn filter_owned_tokens(assets: impl IntoIterator<Item = Asset>) -> Vec<Asset> {
    assets
        .into_iter()
        .filter(|asset| asset.id != NATIVE_SOL_MINT)
        .filter(|asset| asset.balance().is_some_and(|b| b > 0))
        .collect()
}

/// 为过滤后的代币补上价格、市值、涨跌和显示名称
pub fn token_market_data(tokens: &[Asset], quotes: &dyn MarketQuotes) -> Vec<MarketAsset> {
    filter_owned_tokens(tokens.iter().cloned())
        .into_iter()
        .filter_map(|asset| enrich(asset, quotes))
        .collect()
}

fn enrich(mut asset: Asset, quotes: &dyn MarketQuotes) -> Option<MarketAsset> {
    let token_info = asset.token_info.as_ref();
    let metadata = asset.metadata();

    let decimals = token_info
        .and_then(|t| t.decimals)
        .or_else(|| metadata.and_then(|m| m.decimals))
        .unwrap_or(DEFAULT_DECIMALS);
    let scale = 10f64.powi(decimals as i32);

    let raw_amount = asset
        .balance()
        .filter(|b| *b > 0)
        .or_else(|| asset.ownership.as_ref().and_then(|o| o.amount));
    let ui_amount = raw_amount.map(|a| a as f64 / scale).unwrap_or(0.0);
    if ui_amount <= 0.0 {
        return None;
    }

    let price = token_info
        .and_then(|t| t.price_info.as_ref())
        .and_then(|p| p.price_per_token)
        .filter(|p| *p > 0.0)
        .unwrap_or_else(|| quotes.fallback_price(&asset));

    let supply = token_info
        .and_then(|t| t.supply)
        .map(|s| s as f64 / scale)
        .unwrap_or(DEFAULT_SUPPLY);

    let symbol = token_info
        .and_then(|t| t.symbol.as_deref())
        .filter(|s| !s.is_empty())
        .or_else(|| metadata.and_then(|m| m.symbol.as_deref()).filter(|s| !s.is_empty()))
        .or_else(|| asset.top_level_str("symbol"))
        .unwrap_or("UNKNOWN")
        .to_string();

    let name = metadata
        .and_then(|m| m.name.as_deref())
        .filter(|s| !s.is_empty())
        .or_else(|| asset.top_level_str("name"))
        .map(str::to_string)
        .unwrap_or_else(|| asset.id.chars().take(8).collect());

    let change_24h = quotes.change_24h(&asset);

    for key in DERIVED_KEYS {
        asset.extra.remove(*key);
    }

    Some(MarketAsset {
        asset,
        price,
        market_cap: supply * price,
        change_24h,
        value: price * ui_amount,
        ui_amount,
        symbol,
        name,
        decimals,
        is_nft: false,
        has_price: true,
    })
}
