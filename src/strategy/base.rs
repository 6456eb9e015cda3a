use thiserror::Error;

use crate::event::{DataEvent, SignalEvent};
use crate::portfolio::Holdings;

pub use crate::config::{CustomSettings, SettingValue};

/// 策略錯誤
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("strategy not found: {0}")]
    StrategyNotFound(String),

    #[error("策略 {0} 不支援同時處理多個交易對")]
    SimultaneousProcessingUnsupported(String),

    #[error("策略設定 {key} 無效: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("策略 {strategy} 未收到交易對 {pair} 的持倉")]
    MissingHoldings { strategy: String, pair: String },
}

/// 交易策略
///
/// 每次只收到一個交易對的數據；宣告支援同時處理的策略在多交易對模式下
/// 會收到同一時間點所有交易對的數據，並且必須為每個交易對返回一個信號。
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn supports_simultaneous_processing(&self) -> bool;

    fn using_simultaneous_processing(&self) -> bool;

    fn set_simultaneous_processing(&mut self, enabled: bool);

    /// 單一交易對的決策
    fn on_signal(&mut self, data: &DataEvent, holdings: &Holdings) -> Result<SignalEvent, StrategyError>;

    /// 同一時間點所有交易對的決策
    fn on_simultaneous_signals(
        &mut self,
        batch: &[(DataEvent, Holdings)],
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        if !self.supports_simultaneous_processing() {
            return Err(StrategyError::SimultaneousProcessingUnsupported(
                self.name().to_string(),
            ));
        }
        batch
            .iter()
            .map(|(data, holdings)| self.on_signal(data, holdings))
            .collect()
    }
}
