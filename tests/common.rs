#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use event_backtester::config::{
    ApiData, BacktestConfig, CurrencySettings, DataSettings, SettingValue, StrategySettings,
};
use event_backtester::domain_types::{AssetType, Candle, CurrencyPair, Interval, PairKey, TradePoint};
use event_backtester::host::{
    CandleStore, CredentialRequirements, Credentials, ExchangeConnector, HostEngine, StaticHost,
};

pub const TEST_EXCHANGE: &str = "binance";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn candle(timestamp: DateTime<Utc>, price: Decimal) -> Candle {
    Candle::flat(timestamp, price, price)
}

pub fn key(base: &str, quote: &str) -> PairKey {
    PairKey::new(TEST_EXCHANGE, AssetType::Spot, CurrencyPair::new(base, quote))
}

/// Exchange serving canned candles, trades and a scripted live feed
#[derive(Default)]
pub struct TestExchange {
    pub name: String,
    pub candles: Vec<Candle>,
    pub trades: Vec<TradePoint>,
    pub credentials: Credentials,
    pub requirements: CredentialRequirements,
    pub fail_fetch: bool,
    pub fetch_calls: AtomicUsize,
    pub live_calls: AtomicUsize,
    pub live_price: Decimal,
}

impl TestExchange {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self {
            name: TEST_EXCHANGE.to_string(),
            candles,
            live_price: dec!(100),
            ..Default::default()
        }
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExchangeConnector for TestExchange {
    fn name(&self) -> &str {
        &self.name
    }

    fn credentials(&self) -> Credentials {
        self.credentials.clone()
    }

    fn credential_requirements(&self) -> CredentialRequirements {
        self.requirements
    }

    async fn fetch_candles(
        &self,
        _pair: &CurrencyPair,
        _asset: AssetType,
        _interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(anyhow!("rate limited"));
        }
        Ok(self
            .candles
            .iter()
            .filter(|c| c.timestamp >= start && c.timestamp < end)
            .cloned()
            .collect())
    }

    async fn fetch_trades(
        &self,
        _pair: &CurrencyPair,
        _asset: AssetType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TradePoint>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .trades
            .iter()
            .filter(|t| t.timestamp >= start && t.timestamp < end)
            .cloned()
            .collect())
    }

    /// Each poll returns a candle one minute after the previous one
    async fn latest_candle(
        &self,
        _pair: &CurrencyPair,
        _asset: AssetType,
        interval: Interval,
        _credentials: &Credentials,
    ) -> Result<Candle> {
        let n = self.live_calls.fetch_add(1, Ordering::SeqCst) as i32;
        Ok(candle(t0() + interval.duration() * n, self.live_price))
    }
}

/// Candle store backed by a vector
pub struct TestStore {
    pub enabled: bool,
    pub fail: bool,
    pub candles: Vec<Candle>,
    pub queries: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
}

impl TestStore {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self {
            enabled: true,
            fail: false,
            candles,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CandleStore for TestStore {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn query_candles(
        &self,
        exchange: &str,
        _pair: &CurrencyPair,
        _asset: AssetType,
        _interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        self.queries
            .lock()
            .unwrap()
            .push((exchange.to_string(), start, end));
        if self.fail {
            return Err(anyhow!("connection refused"));
        }
        Ok(self
            .candles
            .iter()
            .filter(|c| c.timestamp >= start && c.timestamp < end)
            .cloned()
            .collect())
    }
}

pub fn host_with(exchange: TestExchange) -> Arc<dyn HostEngine> {
    Arc::new(StaticHost::new().with_exchange(Arc::new(exchange)))
}

/// Host with one exchange holding a single 15 minute candle at `price`
pub fn single_candle_host(price: Decimal) -> Arc<dyn HostEngine> {
    host_with(TestExchange::new(vec![candle(t0(), price)]))
}

pub fn currency_settings(base: &str, quote: &str, funds: Decimal) -> CurrencySettings {
    CurrencySettings {
        exchange_name: TEST_EXCHANGE.to_string(),
        asset: "spot".to_string(),
        base: base.to_string(),
        quote: quote.to_string(),
        initial_funds: funds,
        ..Default::default()
    }
}

/// BTC/USDT spot, 1337 initial funds, one 15 minute API window, dollar cost average
pub fn base_config() -> BacktestConfig {
    let mut custom = HashMap::new();
    custom.insert("hello".to_string(), SettingValue::Text("moto".to_string()));

    BacktestConfig {
        nickname: "single candle".to_string(),
        strategy_settings: StrategySettings {
            name: "dollarcostaverage".to_string(),
            simultaneous_signal_processing: false,
            custom_settings: Some(custom),
        },
        currency_settings: vec![currency_settings("BTC", "USDT", dec!(1337))],
        data_settings: DataSettings {
            interval: Interval::FifteenMin.seconds(),
            data_type: "candle".to_string(),
            api_data: Some(ApiData {
                start_date: Some(t0()),
                end_date: Some(t0() + Duration::minutes(15)),
                inclusive_end_date: false,
                request_limit: 0,
            }),
            ..Default::default()
        },
        ..Default::default()
    }
}
