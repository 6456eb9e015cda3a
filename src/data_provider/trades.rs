use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain_types::{Candle, Interval, TradePoint};

/// Aggregate trades into candles of `interval`, in time order
pub fn convert_trades_to_candles(trades: &[TradePoint], interval: Interval) -> Vec<Candle> {
    let mut sorted: Vec<&TradePoint> = trades.iter().collect();
    sorted.sort_by_key(|t| t.timestamp);

    let mut buckets: BTreeMap<DateTime<Utc>, Candle> = BTreeMap::new();
    for trade in sorted {
        let start = interval.truncate(trade.timestamp);
        buckets
            .entry(start)
            .and_modify(|c| {
                c.high = c.high.max(trade.price);
                c.low = c.low.min(trade.price);
                c.close = trade.price;
                c.volume += trade.amount;
            })
            .or_insert_with(|| Candle {
                timestamp: start,
                open: trade.price,
                high: trade.price,
                low: trade.price,
                close: trade.price,
                volume: trade.amount,
            });
    }

    buckets.into_values().collect()
}
