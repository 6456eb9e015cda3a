use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::error::ConfigError;
use crate::config::validation::{ValidationError, ValidationUtils, Validator};
use crate::domain_types::{AssetType, CurrencyPair, DataType, Interval, PairKey};

/// 策略自定義設定的值，回測核心不驗證其內容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

/// 策略自定義設定
pub type CustomSettings = HashMap<String, SettingValue>;

/// 回測配置結構
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub nickname: String,
    pub goal: String,
    pub strategy_settings: StrategySettings,
    pub currency_settings: Vec<CurrencySettings>,
    pub data_settings: DataSettings,
    pub statistic_settings: StatisticSettings,
    pub log: LogConfig,
}

/// 策略配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub name: String,
    /// 同一時間點的所有交易對一次交給策略
    pub simultaneous_signal_processing: bool,
    pub custom_settings: Option<CustomSettings>,
}

/// 買賣方向的數量限制，0 表示不限制
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinMax {
    pub minimum_size: Decimal,
    pub maximum_size: Decimal,
    /// 單筆訂單最大名義價值
    pub maximum_total: Decimal,
}

/// 單一交易對配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencySettings {
    pub exchange_name: String,
    pub asset: String,
    pub base: String,
    pub quote: String,
    pub initial_funds: Decimal,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    pub buy_side: MinMax,
    pub sell_side: MinMax,
    /// 最大持倉數量，0 表示不限制
    pub maximum_position_size: Decimal,
    /// 持倉價值佔權益的最大比例，0 表示不限制
    pub maximum_holdings_ratio: Decimal,
}

impl CurrencySettings {
    /// 交易對描述，用於錯誤信息
    pub fn describe(&self) -> String {
        format!("{} {} {}/{}", self.exchange_name, self.asset, self.base, self.quote)
    }

    pub fn currency_pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.base, &self.quote)
    }

    /// 解析資產類型，未設定與無法識別分別報錯
    pub fn asset_type(&self) -> Result<AssetType, ConfigError> {
        if self.asset.trim().is_empty() {
            return Err(ConfigError::UnsetAsset(self.describe()));
        }
        self.asset
            .parse()
            .map_err(|_| ConfigError::InvalidAsset(self.asset.clone()))
    }

    pub fn pair_key(&self) -> Result<PairKey, ConfigError> {
        Ok(PairKey::new(&self.exchange_name, self.asset_type()?, self.currency_pair()))
    }
}

/// 交易所 API 歷史數據
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiData {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub inclusive_end_date: bool,
    /// 每次請求的最大間隔數，0 表示不分段
    pub request_limit: u32,
}

/// 數據庫歷史數據
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseData {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub inclusive_end_date: bool,
}

/// CSV 文件數據
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvData {
    pub full_path: PathBuf,
}

/// 實時數據
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveData {
    pub api_key_override: String,
    pub api_secret_override: String,
    pub api_client_id_override: String,
    pub api_2fa_override: String,
    /// 保留欄位，訂單仍然只在模擬器中執行
    pub real_orders: bool,
    /// 是否需要帶認證的數據請求
    pub authenticated_data: bool,
}

impl LiveData {
    pub fn has_credential_overrides(&self) -> bool {
        !self.api_key_override.is_empty()
            || !self.api_secret_override.is_empty()
            || !self.api_client_id_override.is_empty()
            || !self.api_2fa_override.is_empty()
    }
}

/// 數據配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// K 線間隔（秒）
    pub interval: u64,
    pub data_type: String,
    pub api_data: Option<ApiData>,
    pub database_data: Option<DatabaseData>,
    pub csv_data: Option<CsvData>,
    pub live_data: Option<LiveData>,
}

/// 已選定的數據來源
#[derive(Debug, Clone, Copy)]
pub enum DataSource<'a> {
    Api(&'a ApiData),
    Database(&'a DatabaseData),
    Csv(&'a CsvData),
    Live(&'a LiveData),
}

impl DataSource<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            DataSource::Api(_) => "api",
            DataSource::Database(_) => "database",
            DataSource::Csv(_) => "csv",
            DataSource::Live(_) => "live",
        }
    }
}

impl DataSettings {
    /// 選定唯一的數據來源
    pub fn data_source(&self) -> Result<DataSource<'_>, ConfigError> {
        let mut sources = Vec::new();
        if let Some(api) = &self.api_data {
            sources.push(DataSource::Api(api));
        }
        if let Some(db) = &self.database_data {
            sources.push(DataSource::Database(db));
        }
        if let Some(csv) = &self.csv_data {
            sources.push(DataSource::Csv(csv));
        }
        if let Some(live) = &self.live_data {
            sources.push(DataSource::Live(live));
        }

        match sources.len() {
            0 => Err(ConfigError::NoDataSource),
            1 => Ok(sources[0]),
            _ => Err(ConfigError::MultipleDataSources(
                sources.iter().map(|s| s.name()).collect::<Vec<_>>().join(", "),
            )),
        }
    }

    pub fn data_type(&self) -> Result<DataType, ConfigError> {
        self.data_type
            .parse()
            .map_err(|_| ConfigError::UnrecognisedDataType(self.data_type.clone()))
    }

    /// 歷史數據來源必須設定有效的開始與結束時間
    pub fn validate_date(&self) -> Result<(), ConfigError> {
        let window = match self.data_source()? {
            DataSource::Api(api) => Some((api.start_date, api.end_date)),
            DataSource::Database(db) => Some((db.start_date, db.end_date)),
            DataSource::Csv(_) | DataSource::Live(_) => None,
        };

        if let Some(window) = window {
            validate_window(window.0, window.1)?;
        }
        Ok(())
    }

    pub fn interval(&self) -> Result<Interval, ConfigError> {
        Interval::from_secs(self.interval).ok_or(ConfigError::IntervalUnset(self.interval))
    }
}

/// 檢查時間窗口
pub fn validate_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ConfigError> {
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok((start, end)),
        _ => Err(ConfigError::StartEndUnset),
    }
}

/// 統計配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticSettings {
    /// 年化無風險利率，用於夏普與索提諾比率
    pub risk_free_rate: f64,
}

impl Default for StatisticSettings {
    fn default() -> Self {
        Self { risk_free_rate: 0.0 }
    }
}

impl Validator for StatisticSettings {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::in_range(self.risk_free_rate, 0.0, 1.0, "statistic_settings.risk_free_rate")
    }
}

/// 日誌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
    /// 日誌文件目錄，為空時只輸出到控制台
    pub directory: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl Validator for LogConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證日誌級別
        ValidationUtils::one_of(
            &self.level.to_lowercase(),
            &["trace", "debug", "info", "warn", "error"]
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<String>>(),
            "log.level",
        )?;

        // 驗證日誌格式
        ValidationUtils::one_of(
            &self.format.to_lowercase(),
            &["pretty", "json"].iter().map(|s| s.to_string()).collect::<Vec<String>>(),
            "log.format",
        )?;

        if let Some(directory) = &self.directory {
            ValidationUtils::not_empty(directory, "log.directory")?;
        }

        Ok(())
    }
}

impl BacktestConfig {
    /// 檢查交易對配置：先檢查所有初始資金，再檢查資產類型與貨幣
    pub fn validate_currency_settings(&self) -> Result<(), ConfigError> {
        if self.currency_settings.is_empty() {
            return Err(ConfigError::NoCurrencySettings);
        }

        for cs in &self.currency_settings {
            if cs.initial_funds <= Decimal::ZERO {
                return Err(ConfigError::BadInitialFunds(cs.describe()));
            }
        }

        for cs in &self.currency_settings {
            cs.asset_type()?;
            if cs.currency_pair().is_empty() {
                return Err(ConfigError::UnsetCurrency(cs.describe()));
            }
        }

        Ok(())
    }

    /// 檢查買賣數量限制
    pub fn validate_min_max(&self) -> Result<(), ConfigError> {
        for cs in &self.currency_settings {
            for (side, mm) in [("buy_side", &cs.buy_side), ("sell_side", &cs.sell_side)] {
                if mm.maximum_size > Decimal::ZERO && mm.maximum_size < mm.minimum_size {
                    return Err(ConfigError::InvalidMinMax {
                        side: format!("{} {}", cs.describe(), side),
                        minimum: mm.minimum_size.to_string(),
                        maximum: mm.maximum_size.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
