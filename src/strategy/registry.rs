use std::collections::HashMap;
use tracing::debug;

use super::base::{CustomSettings, Strategy, StrategyError};
use super::dollar_cost_average::{self, DollarCostAverage};

/// 由自定義設定建立策略
pub type StrategyFactory = fn(&CustomSettings) -> Result<Box<dyn Strategy>, StrategyError>;

/// 策略名稱到建構函數的映射，名稱不分大小寫
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    factories: HashMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 包含所有內建策略
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(dollar_cost_average::NAME, |settings| {
            Ok(Box::new(DollarCostAverage::new(settings)?))
        });
        registry
    }

    pub fn register(&mut self, name: &str, factory: StrategyFactory) {
        self.factories.insert(name.trim().to_lowercase(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.trim().to_lowercase())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// 依名稱建立策略，未設定自定義設定時使用空設定
    pub fn load_strategy_by_name(
        &self,
        name: &str,
        simultaneous: bool,
        custom_settings: Option<&CustomSettings>,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        let factory = self
            .factories
            .get(&name.trim().to_lowercase())
            .ok_or_else(|| StrategyError::StrategyNotFound(name.to_string()))?;

        let empty = CustomSettings::new();
        let mut strategy = factory(custom_settings.unwrap_or(&empty))?;

        if simultaneous {
            if !strategy.supports_simultaneous_processing() {
                return Err(StrategyError::SimultaneousProcessingUnsupported(
                    strategy.name().to_string(),
                ));
            }
            strategy.set_simultaneous_processing(true);
        }

        debug!(strategy = strategy.name(), simultaneous, "已載入策略");
        Ok(strategy)
    }
}
