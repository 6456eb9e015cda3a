use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 交易類型枚舉
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    Buy,     // 買入交易
    Sell,    // 賣出交易
    Unknown, // 未知類型
}

/// K 線數據點
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// 以單一價格建立 K 線（開高低收相同）
    pub fn flat(timestamp: DateTime<Utc>, price: Decimal, volume: Decimal) -> Self {
        Self {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }
}

/// 逐筆成交數據點
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub amount: Decimal,
    pub trade_type: TradeType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flat_candle() {
        let timestamp = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let candle = Candle::flat(timestamp, dec!(1337), dec!(10));

        assert_eq!(candle.open, dec!(1337));
        assert_eq!(candle.high, dec!(1337));
        assert_eq!(candle.low, dec!(1337));
        assert_eq!(candle.close, dec!(1337));
        assert_eq!(candle.volume, dec!(10));
    }
}
