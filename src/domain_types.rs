//! 基本領域類型定義
//!
//! 包含資產類型、交易對、K 線數據點、時間間隔與數據範圍等回測共用類型。

pub mod asset_types;
pub mod currency_pair;
pub mod data_point;
pub mod data_range;
pub mod interval;

pub use asset_types::{AssetType, DataType};
pub use currency_pair::{CurrencyPair, PairKey};
pub use data_point::{Candle, TradePoint, TradeType};
pub use data_range::{IntervalData, IntervalRange, IntervalRangeHolder};
pub use interval::Interval;

use thiserror::Error;

/// 領域錯誤類型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("無效的資產類型: {0}")]
    InvalidAssetType(String),

    #[error("unrecognised dataType: {0}")]
    UnrecognisedDataType(String),

    #[error("無效的時間間隔: {0} 秒")]
    InvalidInterval(u64),

    #[error("數據範圍錯誤: {0}")]
    DataRangeError(String),
}

/// 領域結果類型
pub type Result<T> = std::result::Result<T, DomainError>;
