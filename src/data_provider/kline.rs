//! Historical candle data handler
//!
//! Candles are loaded eagerly at setup, sorted and de-duplicated by timestamp,
//! then handed out one at a time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{DataError, DataHandler};
use crate::domain_types::{Candle, Interval, IntervalRangeHolder, PairKey};
use crate::event::DataEvent;

pub struct KlineData {
    key: PairKey,
    interval: Interval,
    events: Vec<DataEvent>,
    range: Option<IntervalRangeHolder>,
    offset: usize,
}

impl KlineData {
    pub fn new(key: PairKey, interval: Interval, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);

        let events = candles
            .into_iter()
            .map(|c| DataEvent::new(key.clone(), interval, c))
            .collect();

        Self {
            key,
            interval,
            events,
            range: None,
            offset: 0,
        }
    }

    /// Attach the requested range and mark which intervals have data
    pub fn with_range(mut self, mut range: IntervalRangeHolder) -> Self {
        let candles: Vec<Candle> = self.events.iter().map(|e| e.candle.clone()).collect();
        range.set_has_data_from_candles(&candles);
        self.range = Some(range);
        self
    }

    pub fn range(&self) -> Option<&IntervalRangeHolder> {
        self.range.as_ref()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait]
impl DataHandler for KlineData {
    fn key(&self) -> &PairKey {
        &self.key
    }

    fn interval(&self) -> Interval {
        self.interval
    }

    fn has_data_at_time(&self, t: DateTime<Utc>) -> bool {
        if let Some(range) = &self.range {
            return range.has_data_at_time(t);
        }
        let start = self.interval.truncate(t);
        self.events
            .binary_search_by_key(&start, |e| e.timestamp())
            .is_ok()
    }

    async fn next(&mut self) -> Result<Option<DataEvent>, DataError> {
        let event = self.events.get(self.offset).cloned();
        if event.is_some() {
            self.offset += 1;
        }
        Ok(event)
    }

    fn latest(&self) -> Option<&DataEvent> {
        self.offset.checked_sub(1).and_then(|i| self.events.get(i))
    }

    fn is_exhausted(&self) -> bool {
        self.offset >= self.events.len()
    }
}
