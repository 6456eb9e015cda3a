//! 數據加載
//!
//! 依數據來源（交易所 API、數據庫、CSV、實時輪詢）為單一交易對建立數據處理器。
//! 所有加載都在回測開始之前完成，失敗時回測不會啟動。

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{convert_trades_to_candles, csv_source, DataError, DataHandler, KlineData, LiveDataHandler};
use crate::config::{validate_window, ConfigError, DataSettings, DataSource};
use crate::domain_types::{Candle, DataType, IntervalRangeHolder, PairKey};
use crate::host::{CandleStore, ExchangeConnector};

/// 依配置的數據來源加載數據處理器
pub async fn load_data(
    data: &DataSettings,
    key: &PairKey,
    exchange: Arc<dyn ExchangeConnector>,
    store: Option<Arc<dyn CandleStore>>,
) -> Result<Box<dyn DataHandler>, DataError> {
    let source = data.data_source()?;
    info!(pair = %key, source = source.name(), "加載數據");

    let handler: Box<dyn DataHandler> = match source {
        DataSource::Api(_) => Box::new(load_api_data(data, key, exchange.as_ref()).await?),
        DataSource::Database(_) => {
            Box::new(load_database_data(Some(data), key, store.as_deref()).await?)
        }
        DataSource::Csv(_) => Box::new(load_csv_data(data, key)?),
        DataSource::Live(_) => Box::new(load_live_data(Some(data), key, Some(exchange))?),
    };

    Ok(handler)
}

/// 從交易所 API 分段抓取歷史數據
pub async fn load_api_data(
    data: &DataSettings,
    key: &PairKey,
    exchange: &dyn ExchangeConnector,
) -> Result<KlineData, DataError> {
    let api = data
        .api_data
        .as_ref()
        .ok_or(DataError::NilArguments("api data settings"))?;
    let (start, end) = validate_window(api.start_date, api.end_date)?;
    let interval = data.interval()?;
    let data_type = data.data_type()?;

    let range =
        IntervalRangeHolder::calculate(start, end, interval, api.request_limit, api.inclusive_end_date)?;

    let mut candles: Vec<Candle> = Vec::new();
    for chunk in &range.ranges {
        debug!(pair = %key, start = %chunk.start, end = %chunk.end, "請求數據區段");
        let fetched = match data_type {
            DataType::Candle => exchange
                .fetch_candles(&key.pair, key.asset, interval, chunk.start, chunk.end)
                .await
                .map_err(|source| DataError::Exchange {
                    exchange: key.exchange.clone(),
                    source,
                })?,
            DataType::Trade => {
                let trades = exchange
                    .fetch_trades(&key.pair, key.asset, chunk.start, chunk.end)
                    .await
                    .map_err(|source| DataError::Exchange {
                        exchange: key.exchange.clone(),
                        source,
                    })?;
                convert_trades_to_candles(&trades, interval)
            }
        };
        candles.extend(fetched.into_iter().filter(|c| range.contains(c.timestamp)));
    }

    if candles.is_empty() {
        return Err(DataError::NoData(key.to_string()));
    }

    let kline = KlineData::new(key.clone(), interval, candles).with_range(range);
    warn_missing_intervals(key, &kline);
    Ok(kline)
}

/// 從數據庫讀取歷史 K 線
///
/// 檢查順序：時間窗口、間隔、數據類型、請求完整性、數據庫是否啟用。
pub async fn load_database_data(
    data: Option<&DataSettings>,
    key: &PairKey,
    store: Option<&dyn CandleStore>,
) -> Result<KlineData, DataError> {
    let data = data.ok_or(DataError::NilArguments("nil config data received"))?;
    let db = data
        .database_data
        .as_ref()
        .ok_or(DataError::NilArguments("nil config data received"))?;

    let (start, end) = validate_window(db.start_date, db.end_date)?;
    let interval = data.interval()?;
    let data_type = data.data_type()?;
    if data_type != DataType::Candle {
        return Err(DataError::UnsupportedDataType {
            data_type,
            source_name: "database",
        });
    }
    if key.exchange.is_empty() || key.pair.is_empty() {
        return Err(DataError::IncompleteRequest);
    }

    let store = match store {
        Some(store) if store.is_enabled() => store,
        _ => return Err(DataError::DatabaseDisabled),
    };

    let range = IntervalRangeHolder::calculate(start, end, interval, 0, db.inclusive_end_date)?;
    let candles = store
        .query_candles(&key.exchange, &key.pair, key.asset, interval, range.start, range.end)
        .await
        .map_err(DataError::Database)?;

    if candles.is_empty() {
        return Err(DataError::NoData(key.to_string()));
    }

    let kline = KlineData::new(key.clone(), interval, candles).with_range(range);
    warn_missing_intervals(key, &kline);
    Ok(kline)
}

/// 從 CSV 文件讀取歷史數據，成交記錄會聚合為 K 線
pub fn load_csv_data(data: &DataSettings, key: &PairKey) -> Result<KlineData, DataError> {
    let csv = data
        .csv_data
        .as_ref()
        .ok_or(DataError::NilArguments("csv data settings"))?;
    let interval = data.interval()?;

    let candles = match data.data_type()? {
        DataType::Candle => csv_source::read_candles(&csv.full_path)?,
        DataType::Trade => convert_trades_to_candles(&csv_source::read_trades(&csv.full_path)?, interval),
    };

    if candles.is_empty() {
        return Err(DataError::NoData(csv.full_path.display().to_string()));
    }

    info!(pair = %key, path = %csv.full_path.display(), candles = candles.len(), "已讀取 CSV 數據");
    Ok(KlineData::new(key.clone(), interval, candles))
}

/// 建立實時數據處理器
///
/// 配置中的覆蓋憑證會取代交易所自身的憑證。要求認證數據時，
/// 憑證必須滿足交易所的驗證要求。
pub fn load_live_data(
    data: Option<&DataSettings>,
    key: &PairKey,
    exchange: Option<Arc<dyn ExchangeConnector>>,
) -> Result<LiveDataHandler, DataError> {
    let data = data.ok_or(DataError::NilArguments("nil config data received"))?;
    let exchange = exchange.ok_or(DataError::NilArguments("nil exchange received"))?;
    let live = data
        .live_data
        .as_ref()
        .ok_or(DataError::NilArguments("nil live data settings received"))?;

    let interval = data.interval()?;
    let data_type = data.data_type()?;
    if data_type != DataType::Candle {
        return Err(DataError::UnsupportedDataType {
            data_type,
            source_name: "live",
        });
    }

    let mut credentials = exchange.credentials();
    apply_override(&mut credentials.key, &live.api_key_override);
    apply_override(&mut credentials.secret, &live.api_secret_override);
    apply_override(&mut credentials.client_id, &live.api_client_id_override);
    apply_override(&mut credentials.one_time_password, &live.api_2fa_override);

    if live.real_orders {
        warn!(exchange = exchange.name(), "real_orders 已設定，訂單仍只在模擬交易所中執行");
    }

    if live.authenticated_data {
        if credentials.is_empty() {
            return Err(DataError::NilArguments("exchange credentials"));
        }
        let missing = exchange.credential_requirements().missing(&credentials);
        if !missing.is_empty() {
            return Err(ConfigError::CredentialsInvalid {
                exchange: exchange.name().to_string(),
                missing: missing.join(", "),
            }
            .into());
        }
    }

    info!(pair = %key, interval = %interval, "實時數據輪詢已就緒");
    Ok(LiveDataHandler::new(key.clone(), interval, exchange, credentials))
}

fn apply_override(field: &mut String, value: &str) {
    if !value.is_empty() {
        *field = value.to_string();
    }
}

fn warn_missing_intervals(key: &PairKey, kline: &KlineData) {
    if let Some(range) = kline.range() {
        let missing = range.missing_intervals();
        if !missing.is_empty() {
            warn!(
                pair = %key,
                missing = missing.len(),
                first = %missing[0],
                "數據範圍內有缺失的間隔"
            );
        }
    }
}
