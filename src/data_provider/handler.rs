use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::DataError;
use crate::domain_types::{Interval, PairKey};
use crate::event::DataEvent;

/// Time-ordered market data for one exchange/asset/pair
#[async_trait]
pub trait DataHandler: Send + Sync {
    fn key(&self) -> &PairKey;

    fn interval(&self) -> Interval;

    /// Whether the interval containing `t` has data
    fn has_data_at_time(&self, t: DateTime<Utc>) -> bool;

    /// Next data point; `Ok(None)` once the handler is exhausted
    async fn next(&mut self) -> Result<Option<DataEvent>, DataError>;

    /// Most recently returned data point
    fn latest(&self) -> Option<&DataEvent>;

    fn is_exhausted(&self) -> bool;

    /// Live handlers wait on the exchange between points
    fn is_live(&self) -> bool {
        false
    }
}

/// Data handlers for every configured pair, kept in configuration order
#[derive(Default)]
pub struct HandlerPerCurrency {
    handlers: Vec<Box<dyn DataHandler>>,
}

impl HandlerPerCurrency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for its pair, replacing an earlier one for the same pair
    pub fn set_data_for_currency(&mut self, handler: Box<dyn DataHandler>) {
        if let Some(existing) = self.handlers.iter_mut().find(|h| h.key() == handler.key()) {
            *existing = handler;
        } else {
            self.handlers.push(handler);
        }
    }

    pub fn get(&self, key: &PairKey) -> Option<&dyn DataHandler> {
        self.handlers
            .iter()
            .find(|h| h.key() == key)
            .map(|h| h.as_ref())
    }

    pub fn handlers_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn DataHandler>> {
        self.handlers.iter_mut()
    }

    pub fn keys(&self) -> Vec<PairKey> {
        self.handlers.iter().map(|h| h.key().clone()).collect()
    }

    pub fn all_exhausted(&self) -> bool {
        self.handlers.iter().all(|h| h.is_exhausted())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
