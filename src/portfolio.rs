//! 投資組合模組
//!
//! 持有每個交易對的資金與持倉，將策略信號經過定量與風控轉換為訂單，
//! 並在成交後更新持倉。

pub mod holdings;
pub mod risk;
pub mod size;

pub use holdings::Holdings;
pub use risk::Risk;
pub use size::Size;

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CurrencySettings;
use crate::domain_types::PairKey;
use crate::event::{DataEvent, Direction, FillEvent, OrderEvent, OrderType, SignalEvent};

/// 投資組合錯誤
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
    #[error("currency settings not found for {0}")]
    CurrencySettingsNotFound(String),

    #[error("訂單數量 {amount} 低於最小數量 {minimum}")]
    AmountBelowMinimum { amount: String, minimum: String },

    #[error("order size overflows")]
    SizeOverflow,

    #[error("持倉變為負數 {key}: 資金 {funds}, 數量 {quantity}")]
    NegativeHoldings {
        key: String,
        funds: String,
        quantity: String,
    },
}

impl PortfolioError {
    /// 是否必須中止回測
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PortfolioError::AmountBelowMinimum { .. } | PortfolioError::SizeOverflow
        )
    }
}

/// 單一交易對的費率、定量與風控設定
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairSettings {
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    pub size: Size,
    pub risk: Risk,
}

impl PairSettings {
    pub fn fee_rate(&self, order_type: OrderType) -> Decimal {
        match order_type {
            OrderType::Market => self.taker_fee,
            OrderType::Limit => self.maker_fee,
        }
    }
}

impl From<&CurrencySettings> for PairSettings {
    fn from(cs: &CurrencySettings) -> Self {
        Self {
            maker_fee: cs.maker_fee,
            taker_fee: cs.taker_fee,
            size: Size::new(cs.buy_side.clone(), cs.sell_side.clone()),
            risk: Risk::new(cs.maximum_position_size, cs.maximum_holdings_ratio),
        }
    }
}

/// 信號處理結果
#[derive(Debug, Clone, PartialEq)]
pub enum OrderDecision {
    Hold,
    Submit(OrderEvent),
    Rejected(String),
}

#[derive(Debug, Default)]
pub struct Portfolio {
    settings: BTreeMap<PairKey, PairSettings>,
    holdings: BTreeMap<PairKey, Holdings>,
    next_order_id: u64,
}

impl Portfolio {
    pub fn setup() -> Self {
        Self::default()
    }

    /// 註冊交易對設定，必須在設定初始資金之前調用
    pub fn setup_currency_settings_map(&mut self, key: PairKey, settings: PairSettings) {
        self.settings.insert(key, settings);
    }

    pub fn set_initial_funds(&mut self, key: &PairKey, amount: Decimal) -> Result<(), PortfolioError> {
        if !self.settings.contains_key(key) {
            return Err(PortfolioError::CurrencySettingsNotFound(key.to_string()));
        }
        self.holdings.insert(key.clone(), Holdings::new(key.clone(), amount));
        Ok(())
    }

    pub fn settings(&self, key: &PairKey) -> Option<&PairSettings> {
        self.settings.get(key)
    }

    pub fn holdings(&self, key: &PairKey) -> Option<&Holdings> {
        self.holdings.get(key)
    }

    pub fn all_holdings(&self) -> impl Iterator<Item = &Holdings> {
        self.holdings.values()
    }

    /// 將信號轉換為訂單
    pub fn on_signal(
        &mut self,
        signal: &SignalEvent,
        data: &DataEvent,
    ) -> Result<OrderDecision, PortfolioError> {
        if signal.direction == Direction::Hold {
            return Ok(OrderDecision::Hold);
        }

        let (settings, holdings) = self.lookup(&signal.key)?;

        let order_type = if signal.limit_price.is_some() {
            OrderType::Limit
        } else {
            OrderType::Market
        };
        let price = signal.limit_price.unwrap_or_else(|| data.close());
        if price <= Decimal::ZERO {
            return Ok(OrderDecision::Rejected(format!("invalid price {}", price)));
        }
        let fee_rate = settings.fee_rate(order_type);

        let amount = match settings.size.size_order(
            signal.direction,
            signal.amount,
            price,
            holdings.funds,
            holdings.quantity,
            fee_rate,
        ) {
            Err(PortfolioError::SizeOverflow) => {
                debug!(pair = %signal.key, price = %price, "訂單數量溢出");
                return Ok(OrderDecision::Rejected(PortfolioError::SizeOverflow.to_string()));
            }
            sized => sized?,
        };
        if amount <= Decimal::ZERO {
            let reason = match signal.direction {
                Direction::Sell => "nothing held to sell",
                _ => "insufficient funds to size order",
            };
            debug!(pair = %signal.key, reason, "訂單被拒絕");
            return Ok(OrderDecision::Rejected(reason.to_string()));
        }

        if let Some(reason) = settings
            .risk
            .evaluate(signal.direction, amount, price, fee_rate, holdings)
        {
            debug!(pair = %signal.key, reason = %reason, "風控拒絕訂單");
            return Ok(OrderDecision::Rejected(reason));
        }

        self.next_order_id += 1;
        Ok(OrderDecision::Submit(OrderEvent {
            id: self.next_order_id,
            key: signal.key.clone(),
            timestamp: signal.timestamp,
            direction: signal.direction,
            amount,
            price,
            order_type,
            limit_price: signal.limit_price,
        }))
    }

    /// 套用成交，賣出時返回已實現損益
    pub fn apply_fill(&mut self, fill: &FillEvent) -> Result<Option<Decimal>, PortfolioError> {
        let holdings = self
            .holdings
            .get_mut(&fill.key)
            .ok_or_else(|| PortfolioError::CurrencySettingsNotFound(fill.key.to_string()))?;
        let result = holdings.apply_fill(fill);
        if let Err(e) = &result {
            warn!(pair = %fill.key, error = %e, "成交無法套用到持倉");
        }
        result
    }

    /// 以最新收盤價重估持倉
    pub fn update_market_price(&mut self, data: &DataEvent) -> Result<&Holdings, PortfolioError> {
        let holdings = self
            .holdings
            .get_mut(&data.key)
            .ok_or_else(|| PortfolioError::CurrencySettingsNotFound(data.key.to_string()))?;
        holdings.update_market_price(data.close(), data.timestamp());
        Ok(&*holdings)
    }

    fn lookup(&self, key: &PairKey) -> Result<(&PairSettings, &Holdings), PortfolioError> {
        let not_found = || PortfolioError::CurrencySettingsNotFound(key.to_string());
        let settings = self.settings.get(key).ok_or_else(not_found)?;
        let holdings = self.holdings.get(key).ok_or_else(not_found)?;
        Ok((settings, holdings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MinMax;
    use crate::domain_types::{AssetType, Candle, CurrencyPair, Interval};
    use crate::event::OrderStatus;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn key() -> PairKey {
        PairKey::new("binance", AssetType::Spot, CurrencyPair::new("BTC", "USDT"))
    }

    fn data(price: Decimal) -> DataEvent {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        DataEvent::new(key(), Interval::FifteenMin, Candle::flat(ts, price, dec!(1)))
    }

    fn portfolio(settings: PairSettings, funds: Decimal) -> Portfolio {
        let mut p = Portfolio::setup();
        p.setup_currency_settings_map(key(), settings);
        p.set_initial_funds(&key(), funds).unwrap();
        p
    }

    #[test]
    fn test_initial_funds_require_settings() {
        let mut p = Portfolio::setup();
        assert_matches!(
            p.set_initial_funds(&key(), dec!(1)),
            Err(PortfolioError::CurrencySettingsNotFound(_))
        );
    }

    #[test]
    fn test_buy_signal_becomes_market_order() {
        let mut p = portfolio(PairSettings::default(), dec!(1337));
        let d = data(dec!(1337));
        let signal = SignalEvent::from_data(&d, Direction::Buy);

        let order = match p.on_signal(&signal, &d).unwrap() {
            OrderDecision::Submit(order) => order,
            other => panic!("expected order, got {:?}", other),
        };
        assert_eq!(order.id, 1);
        assert_eq!(order.amount, dec!(1));
        assert_eq!(order.order_type, OrderType::Market);
    }

    #[test]
    fn test_limit_signal_uses_maker_fee() {
        let settings = PairSettings {
            maker_fee: dec!(0.5),
            taker_fee: dec!(0),
            ..Default::default()
        };
        let mut p = portfolio(settings, dec!(100));
        let d = data(dec!(10));
        let signal = SignalEvent::from_data(&d, Direction::Buy).with_limit_price(dec!(5));

        let order = match p.on_signal(&signal, &d).unwrap() {
            OrderDecision::Submit(order) => order,
            other => panic!("expected order, got {:?}", other),
        };
        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.price, dec!(5));
        assert_eq!(order.amount, dec!(10));
    }

    #[test]
    fn test_rejections() {
        let fees = PairSettings {
            maker_fee: dec!(1337),
            taker_fee: dec!(1337),
            ..Default::default()
        };
        let mut p = portfolio(fees, dec!(1337));
        let d = data(dec!(1337));

        assert_matches!(
            p.on_signal(&SignalEvent::from_data(&d, Direction::Buy), &d),
            Ok(OrderDecision::Rejected(_))
        );
        assert_matches!(
            p.on_signal(&SignalEvent::from_data(&d, Direction::Sell), &d),
            Ok(OrderDecision::Rejected(_))
        );
        assert_matches!(
            p.on_signal(&SignalEvent::from_data(&d, Direction::Hold), &d),
            Ok(OrderDecision::Hold)
        );
    }

    #[test]
    fn test_overflowing_size_is_rejected() {
        let mut p = portfolio(PairSettings::default(), dec!(100000000000000000000));
        let d = data(dec!(0.000000001));

        assert_matches!(
            p.on_signal(&SignalEvent::from_data(&d, Direction::Buy), &d),
            Ok(OrderDecision::Rejected(reason)) if reason == "order size overflows"
        );
        assert!(!PortfolioError::SizeOverflow.is_fatal());
    }

    #[test]
    fn test_amount_below_minimum_is_not_fatal() {
        let settings = PairSettings {
            size: Size::new(
                MinMax {
                    minimum_size: dec!(5),
                    ..Default::default()
                },
                MinMax::default(),
            ),
            ..Default::default()
        };
        let mut p = portfolio(settings, dec!(100));
        let d = data(dec!(100));

        let err = p
            .on_signal(&SignalEvent::from_data(&d, Direction::Buy), &d)
            .unwrap_err();
        assert_matches!(err, PortfolioError::AmountBelowMinimum { .. });
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_apply_fill_and_mark_to_market() {
        let mut p = portfolio(PairSettings::default(), dec!(100));
        let d = data(dec!(10));
        let fill = FillEvent {
            order_id: 1,
            key: key(),
            timestamp: d.timestamp(),
            direction: Direction::Buy,
            amount: dec!(5),
            fill_price: dec!(10),
            fee: dec!(0),
            fee_rate: dec!(0),
            status: OrderStatus::Filled,
            reason: None,
        };

        p.apply_fill(&fill).unwrap();
        let h = p.update_market_price(&data(dec!(20))).unwrap();
        assert_eq!(h.quantity, dec!(5));
        assert_eq!(h.total_value(), dec!(150));
    }
}
