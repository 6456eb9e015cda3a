//! Live data handler
//!
//! Polls the exchange for its most recent candle once per interval and only
//! yields candles newer than the last one returned. Never exhausts on its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use super::{DataError, DataHandler};
use crate::domain_types::{Interval, PairKey};
use crate::event::DataEvent;
use crate::host::{Credentials, ExchangeConnector};

pub struct LiveDataHandler {
    key: PairKey,
    interval: Interval,
    exchange: Arc<dyn ExchangeConnector>,
    credentials: Credentials,
    ticker: Option<time::Interval>,
    history: Vec<DataEvent>,
}

impl LiveDataHandler {
    pub fn new(
        key: PairKey,
        interval: Interval,
        exchange: Arc<dyn ExchangeConnector>,
        credentials: Credentials,
    ) -> Self {
        Self {
            key,
            interval,
            exchange,
            credentials,
            ticker: None,
            history: Vec::new(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

#[async_trait]
impl DataHandler for LiveDataHandler {
    fn key(&self) -> &PairKey {
        &self.key
    }

    fn interval(&self) -> Interval {
        self.interval
    }

    fn has_data_at_time(&self, t: DateTime<Utc>) -> bool {
        let start = self.interval.truncate(t);
        self.history.iter().any(|e| e.timestamp() == start)
    }

    async fn next(&mut self) -> Result<Option<DataEvent>, DataError> {
        let period = self.interval.to_std_duration();
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            ticker.tick().await;

            let candle = match self
                .exchange
                .latest_candle(&self.key.pair, self.key.asset, self.interval, &self.credentials)
                .await
            {
                Ok(candle) => candle,
                Err(e) => {
                    warn!(pair = %self.key, error = %e, "live data poll failed, retrying next interval");
                    continue;
                }
            };

            let is_new = self
                .history
                .last()
                .map_or(true, |last| candle.timestamp > last.timestamp());
            if !is_new {
                debug!(pair = %self.key, "no new live candle yet");
                continue;
            }

            let event = DataEvent::new(self.key.clone(), self.interval, candle);
            self.history.push(event.clone());
            return Ok(Some(event));
        }
    }

    fn latest(&self) -> Option<&DataEvent> {
        self.history.last()
    }

    fn is_exhausted(&self) -> bool {
        false
    }

    fn is_live(&self) -> bool {
        true
    }
}
