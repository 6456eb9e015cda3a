//! CSV market data files
//!
//! Candle files carry `timestamp,open,high,low,close,volume`, trade files carry
//! `timestamp,price,amount[,side]`. Timestamps are unix seconds or RFC 3339.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

use super::DataError;
use crate::domain_types::{Candle, TradePoint, TradeType};

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: String,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct TradeRow {
    timestamp: String,
    price: Decimal,
    amount: Decimal,
    #[serde(default)]
    side: Option<String>,
}

fn parse_timestamp(raw: &str, line: u64) -> Result<DateTime<Utc>, DataError> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).ok_or_else(|| DataError::CsvRecord {
            line,
            reason: format!("timestamp {} out of range", secs),
        });
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DataError::CsvRecord {
            line,
            reason: format!("invalid timestamp '{}': {}", raw, e),
        })
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, DataError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn record_error(path: &Path, source: csv::Error) -> DataError {
    match source.position() {
        Some(pos) => DataError::CsvRecord {
            line: pos.line(),
            reason: source.to_string(),
        },
        None => DataError::Csv {
            path: path.to_path_buf(),
            source,
        },
    }
}

/// Read candles from a CSV file
pub fn read_candles(path: &Path) -> Result<Vec<Candle>, DataError> {
    let mut reader = open_reader(path)?;
    let mut candles = Vec::new();

    for (idx, row) in reader.deserialize::<CandleRow>().enumerate() {
        let row = row.map_err(|e| record_error(path, e))?;
        let line = idx as u64 + 2;
        candles.push(Candle {
            timestamp: parse_timestamp(&row.timestamp, line)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    Ok(candles)
}

/// Read trades from a CSV file
pub fn read_trades(path: &Path) -> Result<Vec<TradePoint>, DataError> {
    let mut reader = open_reader(path)?;
    let mut trades = Vec::new();

    for (idx, row) in reader.deserialize::<TradeRow>().enumerate() {
        let row = row.map_err(|e| record_error(path, e))?;
        let line = idx as u64 + 2;
        let trade_type = match row.side.as_deref().map(str::to_lowercase).as_deref() {
            Some("buy") => TradeType::Buy,
            Some("sell") => TradeType::Sell,
            _ => TradeType::Unknown,
        };
        trades.push(TradePoint {
            timestamp: parse_timestamp(&row.timestamp, line)?,
            price: row.price,
            amount: row.amount,
            trade_type,
        });
    }

    Ok(trades)
}
