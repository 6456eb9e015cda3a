//! Host engine collaborator interfaces
//!
//! The backtester never reaches exchanges or databases directly. The host engine
//! is injected at setup and provides exchange lookup, credentials and data access.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain_types::{AssetType, Candle, CurrencyPair, Interval, TradePoint};

/// API credentials for an exchange
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
    pub client_id: String,
    pub one_time_password: String,
    pub pem_key: String,
}

impl Credentials {
    /// No credential field is set
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
            && self.secret.is_empty()
            && self.client_id.is_empty()
            && self.one_time_password.is_empty()
            && self.pem_key.is_empty()
    }
}

/// Which credential fields an exchange requires for authenticated requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CredentialRequirements {
    pub requires_key: bool,
    pub requires_secret: bool,
    pub requires_client_id: bool,
    pub requires_pem: bool,
}

impl CredentialRequirements {
    /// Names of required fields missing from `credentials`
    pub fn missing(&self, credentials: &Credentials) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.requires_key && credentials.key.is_empty() {
            missing.push("key");
        }
        if self.requires_secret && credentials.secret.is_empty() {
            missing.push("secret");
        }
        if self.requires_client_id && credentials.client_id.is_empty() {
            missing.push("client_id");
        }
        if self.requires_pem && credentials.pem_key.is_empty() {
            missing.push("pem_key");
        }
        missing
    }
}

/// Exchange connectivity as seen by the backtester
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    /// Exchange name, lower case
    fn name(&self) -> &str;

    /// Credentials currently configured on the exchange
    fn credentials(&self) -> Credentials;

    /// Credential validator requirements
    fn credential_requirements(&self) -> CredentialRequirements;

    /// Historical candles in `[start, end)`
    async fn fetch_candles(
        &self,
        pair: &CurrencyPair,
        asset: AssetType,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>>;

    /// Historical trades in `[start, end)`
    async fn fetch_trades(
        &self,
        pair: &CurrencyPair,
        asset: AssetType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TradePoint>>;

    /// Most recent candle, used by live polling
    async fn latest_candle(
        &self,
        pair: &CurrencyPair,
        asset: AssetType,
        interval: Interval,
        credentials: &Credentials,
    ) -> Result<Candle>;
}

/// Database-backed candle storage
#[async_trait]
pub trait CandleStore: Send + Sync {
    fn is_enabled(&self) -> bool;

    async fn query_candles(
        &self,
        exchange: &str,
        pair: &CurrencyPair,
        asset: AssetType,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>>;
}

/// Process host providing exchanges and storage
pub trait HostEngine: Send + Sync {
    fn exchange_by_name(&self, name: &str) -> Option<Arc<dyn ExchangeConnector>>;

    fn candle_store(&self) -> Option<Arc<dyn CandleStore>>;
}

/// In-memory host with a fixed set of exchanges
#[derive(Default, Clone)]
pub struct StaticHost {
    exchanges: HashMap<String, Arc<dyn ExchangeConnector>>,
    store: Option<Arc<dyn CandleStore>>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exchange(mut self, exchange: Arc<dyn ExchangeConnector>) -> Self {
        self.exchanges.insert(exchange.name().to_lowercase(), exchange);
        self
    }

    pub fn with_candle_store(mut self, store: Arc<dyn CandleStore>) -> Self {
        self.store = Some(store);
        self
    }
}

impl HostEngine for StaticHost {
    fn exchange_by_name(&self, name: &str) -> Option<Arc<dyn ExchangeConnector>> {
        self.exchanges.get(&name.trim().to_lowercase()).cloned()
    }

    fn candle_store(&self) -> Option<Arc<dyn CandleStore>> {
        self.store.clone()
    }
}

/// Exchange without connectivity, for CSV-only runs
#[derive(Debug, Clone)]
pub struct OfflineExchange {
    name: String,
}

impl OfflineExchange {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
        }
    }
}

#[async_trait]
impl ExchangeConnector for OfflineExchange {
    fn name(&self) -> &str {
        &self.name
    }

    fn credentials(&self) -> Credentials {
        Credentials::default()
    }

    fn credential_requirements(&self) -> CredentialRequirements {
        CredentialRequirements::default()
    }

    async fn fetch_candles(
        &self,
        _pair: &CurrencyPair,
        _asset: AssetType,
        _interval: Interval,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        Err(anyhow!("exchange {} is offline", self.name))
    }

    async fn fetch_trades(
        &self,
        _pair: &CurrencyPair,
        _asset: AssetType,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<TradePoint>> {
        Err(anyhow!("exchange {} is offline", self.name))
    }

    async fn latest_candle(
        &self,
        _pair: &CurrencyPair,
        _asset: AssetType,
        _interval: Interval,
        _credentials: &Credentials,
    ) -> Result<Candle> {
        Err(anyhow!("exchange {} is offline", self.name))
    }
}
