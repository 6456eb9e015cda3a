use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use super::base::{CustomSettings, Strategy, StrategyError};
use crate::event::{DataEvent, Direction, SignalEvent};
use crate::portfolio::Holdings;

pub const NAME: &str = "dollarcostaverage";
const DESCRIPTION: &str = "每個間隔都買入，數量由投資組合依可用資金決定";

/// 可選設定：每次買入的固定數量
pub const AMOUNT_KEY: &str = "amount";

/// 定投策略
#[derive(Debug, Clone, Default)]
pub struct DollarCostAverage {
    simultaneous: bool,
    amount: Option<Decimal>,
}

impl DollarCostAverage {
    /// 未知的設定鍵會被忽略
    pub fn new(settings: &CustomSettings) -> Result<Self, StrategyError> {
        let amount = match settings.get(AMOUNT_KEY) {
            None => None,
            Some(value) => {
                let amount = value
                    .as_f64()
                    .and_then(Decimal::from_f64)
                    .filter(|a| *a > Decimal::ZERO)
                    .ok_or_else(|| StrategyError::InvalidSetting {
                        key: AMOUNT_KEY.to_string(),
                        reason: "必須是正數".to_string(),
                    })?;
                Some(amount)
            }
        };

        Ok(Self {
            simultaneous: false,
            amount,
        })
    }
}

impl Strategy for DollarCostAverage {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn supports_simultaneous_processing(&self) -> bool {
        true
    }

    fn using_simultaneous_processing(&self) -> bool {
        self.simultaneous
    }

    fn set_simultaneous_processing(&mut self, enabled: bool) {
        self.simultaneous = enabled;
    }

    fn on_signal(&mut self, data: &DataEvent, _holdings: &Holdings) -> Result<SignalEvent, StrategyError> {
        let signal = SignalEvent::from_data(data, Direction::Buy).with_reason("dollar cost average buy");
        Ok(match self.amount {
            Some(amount) => signal.with_amount(amount),
            None => signal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingValue;
    use crate::domain_types::{AssetType, Candle, CurrencyPair, Interval, PairKey};
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn data(base: &str) -> (DataEvent, Holdings) {
        let key = PairKey::new("binance", AssetType::Spot, CurrencyPair::new(base, "USDT"));
        let event = DataEvent::new(key.clone(), Interval::OneHour, Candle::flat(Utc::now(), dec!(10), dec!(1)));
        (event, Holdings::new(key, dec!(100)))
    }

    #[test]
    fn test_always_buys() {
        let mut strategy = DollarCostAverage::new(&CustomSettings::new()).unwrap();
        let (event, holdings) = data("BTC");

        let signal = strategy.on_signal(&event, &holdings).unwrap();
        assert_eq!(signal.direction, Direction::Buy);
        assert_eq!(signal.amount, None);
        assert_eq!(signal.price, dec!(10));
    }

    #[test]
    fn test_simultaneous_returns_one_signal_per_pair() {
        let mut strategy = DollarCostAverage::new(&CustomSettings::new()).unwrap();
        strategy.set_simultaneous_processing(true);

        let signals = strategy
            .on_simultaneous_signals(&[data("BTC"), data("ETH")])
            .unwrap();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[1].key.pair.base, "ETH");
    }

    #[test]
    fn test_custom_settings() {
        let mut settings = CustomSettings::new();
        settings.insert("hello".to_string(), SettingValue::Text("moto".to_string()));
        assert!(DollarCostAverage::new(&settings).is_ok());

        settings.insert(AMOUNT_KEY.to_string(), SettingValue::Number(0.5));
        let mut strategy = DollarCostAverage::new(&settings).unwrap();
        let (event, holdings) = data("BTC");
        assert_eq!(strategy.on_signal(&event, &holdings).unwrap().amount, Some(dec!(0.5)));

        settings.insert(AMOUNT_KEY.to_string(), SettingValue::Text("lots".to_string()));
        assert_matches!(
            DollarCostAverage::new(&settings),
            Err(StrategyError::InvalidSetting { .. })
        );
    }
}
