//! 數據範圍定義
//!
//! 將請求的時間窗口拆分為若干區段（每段最多 `request_limit` 個間隔），
//! 並記錄每個間隔是否已取得數據，用於驗證分段抓取的完整性。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Candle, DomainError, Interval, Result};

/// 單一間隔的數據標記
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalData {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub has_data: bool,
}

/// 一次請求所覆蓋的區段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub intervals: Vec<IntervalData>,
}

/// 完整數據範圍
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalRangeHolder {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval: Interval,
    pub inclusive_end: bool,
    pub ranges: Vec<IntervalRange>,
}

impl IntervalRangeHolder {
    /// 計算數據範圍
    ///
    /// `request_limit` 為 0 時整個窗口只有一個區段。
    pub fn calculate(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
        request_limit: u32,
        inclusive_end: bool,
    ) -> Result<Self> {
        if start >= end {
            return Err(DomainError::DataRangeError(format!(
                "開始時間 {} 必須早於結束時間 {}",
                start, end
            )));
        }

        let range_start = interval.truncate(start);
        let mut range_end = interval.truncate(end);
        if inclusive_end || range_end <= range_start {
            range_end += interval.duration();
        }

        let mut ranges = Vec::new();
        let mut current = IntervalRange {
            start: range_start,
            end: range_start,
            intervals: Vec::new(),
        };
        let mut cursor = range_start;
        while cursor < range_end {
            let next = cursor + interval.duration();
            current.intervals.push(IntervalData {
                start: cursor,
                end: next,
                has_data: false,
            });
            current.end = next;

            if request_limit > 0 && current.intervals.len() as u32 >= request_limit {
                ranges.push(current);
                current = IntervalRange {
                    start: next,
                    end: next,
                    intervals: Vec::new(),
                };
            }
            cursor = next;
        }
        if !current.intervals.is_empty() {
            ranges.push(current);
        }

        Ok(Self {
            start: range_start,
            end: range_end,
            interval,
            inclusive_end,
            ranges,
        })
    }

    /// 根據已取得的 K 線標記各間隔
    pub fn set_has_data_from_candles(&mut self, candles: &[Candle]) {
        let stamps: HashSet<DateTime<Utc>> = candles
            .iter()
            .map(|c| self.interval.truncate(c.timestamp))
            .collect();

        for range in &mut self.ranges {
            for data in &mut range.intervals {
                data.has_data = stamps.contains(&data.start);
            }
        }
    }

    /// 時間點是否落在範圍內
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }

    /// 時間點所在的間隔是否已有數據
    pub fn has_data_at_time(&self, t: DateTime<Utc>) -> bool {
        self.ranges
            .iter()
            .flat_map(|r| r.intervals.iter())
            .any(|d| d.has_data && t >= d.start && t < d.end)
    }

    /// 缺少數據的間隔起點
    pub fn missing_intervals(&self) -> Vec<DateTime<Utc>> {
        self.ranges
            .iter()
            .flat_map(|r| r.intervals.iter())
            .filter(|d| !d.has_data)
            .map(|d| d.start)
            .collect()
    }

    /// 間隔總數
    pub fn interval_count(&self) -> usize {
        self.ranges.iter().map(|r| r.intervals.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_calculate_rejects_inverted_window() {
        let res = IntervalRangeHolder::calculate(t0(), t0(), Interval::OneHour, 0, false);
        assert!(matches!(res, Err(DomainError::DataRangeError(_))));
    }

    #[test]
    fn test_calculate_splits_by_request_limit() {
        let holder = IntervalRangeHolder::calculate(
            t0(),
            t0() + Duration::hours(5),
            Interval::OneHour,
            2,
            false,
        )
        .unwrap();

        assert_eq!(holder.interval_count(), 5);
        assert_eq!(holder.ranges.len(), 3);
        assert_eq!(holder.ranges[0].intervals.len(), 2);
        assert_eq!(holder.ranges[2].intervals.len(), 1);
        assert_eq!(holder.ranges[1].start, t0() + Duration::hours(2));
    }

    #[test]
    fn test_inclusive_end_adds_final_interval() {
        let exclusive =
            IntervalRangeHolder::calculate(t0(), t0() + Duration::hours(2), Interval::OneHour, 0, false)
                .unwrap();
        let inclusive =
            IntervalRangeHolder::calculate(t0(), t0() + Duration::hours(2), Interval::OneHour, 0, true)
                .unwrap();

        assert_eq!(exclusive.interval_count(), 2);
        assert_eq!(inclusive.interval_count(), 3);
    }

    #[test]
    fn test_has_data_tracking() {
        let mut holder = IntervalRangeHolder::calculate(
            t0(),
            t0() + Duration::minutes(45),
            Interval::FifteenMin,
            0,
            false,
        )
        .unwrap();
        let candles = vec![
            Candle::flat(t0(), dec!(1), dec!(1)),
            Candle::flat(t0() + Duration::minutes(30), dec!(1), dec!(1)),
        ];
        holder.set_has_data_from_candles(&candles);

        assert!(holder.has_data_at_time(t0() + Duration::minutes(5)));
        assert!(!holder.has_data_at_time(t0() + Duration::minutes(20)));
        assert_eq!(holder.missing_intervals(), vec![t0() + Duration::minutes(15)]);
        assert!(holder.contains(t0()));
        assert!(!holder.contains(t0() + Duration::minutes(45)));
    }
}
