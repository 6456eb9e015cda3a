//! 策略模組
//!
//! 定義策略介面、內建策略與依名稱建立策略的註冊表。

pub mod base;
pub mod dollar_cost_average;
pub mod registry;

pub use base::{CustomSettings, SettingValue, Strategy, StrategyError};
pub use dollar_cost_average::DollarCostAverage;
pub use registry::{StrategyFactory, StrategyRegistry};
