use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DomainError;

/// 資產類型枚舉
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Spot,          // 現貨
    Margin,        // 槓桿
    Futures,       // 期貨
    PerpetualSwap, // 永續合約
}

impl AssetType {
    /// 配置文件中使用的名稱
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Spot => "spot",
            AssetType::Margin => "margin",
            AssetType::Futures => "futures",
            AssetType::PerpetualSwap => "perpetualswap",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spot" => Ok(AssetType::Spot),
            "margin" => Ok(AssetType::Margin),
            "futures" => Ok(AssetType::Futures),
            "perpetualswap" | "perpetual_swap" => Ok(AssetType::PerpetualSwap),
            other => Err(DomainError::InvalidAssetType(other.to_string())),
        }
    }
}

/// 數據類型枚舉
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Candle, // K 線
    Trade,  // 逐筆成交，回測前聚合為 K 線
}

impl DataType {
    pub const CANDLE_STR: &'static str = "candle";
    pub const TRADE_STR: &'static str = "trade";
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Candle => write!(f, "{}", Self::CANDLE_STR),
            DataType::Trade => write!(f, "{}", Self::TRADE_STR),
        }
    }
}

impl FromStr for DataType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            Self::CANDLE_STR => Ok(DataType::Candle),
            Self::TRADE_STR => Ok(DataType::Trade),
            other => Err(DomainError::UnrecognisedDataType(other.to_string())),
        }
    }
}
