use serde::{Deserialize, Serialize};
use std::fmt;

use super::AssetType;

/// 交易對（基礎貨幣/計價貨幣）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    /// 創建交易對，貨幣代碼統一為大寫
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.trim().to_uppercase(),
            quote: quote.trim().to_uppercase(),
        }
    }

    /// 基礎或計價貨幣未設定
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() || self.quote.is_empty()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// 交易所、資產類型與交易對的組合鍵，所有事件與持倉都以此路由
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub exchange: String,
    pub asset: AssetType,
    pub pair: CurrencyPair,
}

impl PairKey {
    pub fn new(exchange: &str, asset: AssetType, pair: CurrencyPair) -> Self {
        Self {
            exchange: exchange.trim().to_lowercase(),
            asset,
            pair,
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.exchange, self.asset, self.pair)
    }
}
