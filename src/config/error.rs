use thiserror::Error;

use super::validation::ValidationError;

/// 回測配置錯誤
///
/// 全部在回測開始之前同步返回，出現任何一項時回測不會啟動。
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("未設定任何交易對配置")]
    NoCurrencySettings,

    #[error("初始資金必須大於 0: {0}")]
    BadInitialFunds(String),

    #[error("未設定資產類型: {0}")]
    UnsetAsset(String),

    #[error("無效的資產類型: {0}")]
    InvalidAsset(String),

    #[error("未設定交易對的基礎或計價貨幣: {0}")]
    UnsetCurrency(String),

    #[error("未設定數據來源")]
    NoDataSource,

    #[error("只能設定一個數據來源，目前設定了: {0}")]
    MultipleDataSources(String),

    #[error("unrecognised dataType: '{0}'")]
    UnrecognisedDataType(String),

    #[error("開始與結束時間未設定或開始時間不早於結束時間")]
    StartEndUnset,

    #[error("時間間隔未設定或不受支援: {0} 秒")]
    IntervalUnset(u64),

    #[error("{side} 的最大數量 {maximum} 小於最小數量 {minimum}")]
    InvalidMinMax {
        side: String,
        minimum: String,
        maximum: String,
    },

    #[error("憑證不符合交易所 {exchange} 的要求，缺少: {missing}")]
    CredentialsInvalid { exchange: String, missing: String },

    #[error("配置驗證失敗: {0}")]
    Validation(#[from] ValidationError),

    #[error("配置加載失敗: {0}")]
    Load(#[from] ::config::ConfigError),
}
