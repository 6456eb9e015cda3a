use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration as StdDuration;

/// 支援的 K 線間隔
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    OneMin,
    ThreeMin,
    FiveMin,
    FifteenMin,
    ThirtyMin,
    OneHour,
    TwoHour,
    FourHour,
    SixHour,
    TwelveHour,
    OneDay,
    ThreeDay,
    OneWeek,
}

impl Interval {
    /// 獲取間隔的秒數
    pub fn seconds(&self) -> u64 {
        match self {
            Interval::OneMin => 60,
            Interval::ThreeMin => 180,
            Interval::FiveMin => 300,
            Interval::FifteenMin => 900,
            Interval::ThirtyMin => 1800,
            Interval::OneHour => 3600,
            Interval::TwoHour => 7200,
            Interval::FourHour => 14400,
            Interval::SixHour => 21600,
            Interval::TwelveHour => 43200,
            Interval::OneDay => 86400,
            Interval::ThreeDay => 259200,
            Interval::OneWeek => 604800,
        }
    }

    /// 從秒數解析間隔，0 或不支援的值返回 None
    pub fn from_secs(seconds: u64) -> Option<Self> {
        Self::all().into_iter().find(|i| i.seconds() == seconds)
    }

    /// 轉換為 chrono Duration
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds() as i64)
    }

    /// 轉換為 std::time::Duration，用於實時輪詢
    pub fn to_std_duration(&self) -> StdDuration {
        StdDuration::from_secs(self.seconds())
    }

    /// 獲取顯示名稱
    pub fn display_name(&self) -> &'static str {
        match self {
            Interval::OneMin => "1m",
            Interval::ThreeMin => "3m",
            Interval::FiveMin => "5m",
            Interval::FifteenMin => "15m",
            Interval::ThirtyMin => "30m",
            Interval::OneHour => "1h",
            Interval::TwoHour => "2h",
            Interval::FourHour => "4h",
            Interval::SixHour => "6h",
            Interval::TwelveHour => "12h",
            Interval::OneDay => "1d",
            Interval::ThreeDay => "3d",
            Interval::OneWeek => "1w",
        }
    }

    /// 將時間對齊到間隔起點
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let secs = self.seconds() as i64;
        let offset = ts.timestamp().rem_euclid(secs);
        ts - Duration::seconds(offset) - Duration::nanoseconds(ts.timestamp_subsec_nanos() as i64)
    }

    /// 獲取所有間隔列表
    pub fn all() -> Vec<Interval> {
        vec![
            Interval::OneMin,
            Interval::ThreeMin,
            Interval::FiveMin,
            Interval::FifteenMin,
            Interval::ThirtyMin,
            Interval::OneHour,
            Interval::TwoHour,
            Interval::FourHour,
            Interval::SixHour,
            Interval::TwelveHour,
            Interval::OneDay,
            Interval::ThreeDay,
            Interval::OneWeek,
        ]
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
