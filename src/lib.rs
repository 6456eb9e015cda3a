// 模組定義
pub mod backtest;
pub mod config;
pub mod data_provider;
pub mod domain_types;
pub mod event;
pub mod exchange;
pub mod host;
pub mod logging;
pub mod portfolio;
pub mod report;
pub mod statistics;
pub mod strategy;
