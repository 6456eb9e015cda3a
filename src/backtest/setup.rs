//! 由配置建立回測
//!
//! 驗證順序固定，第一個不通過的檢查決定返回的錯誤。

use std::sync::Arc;
use tracing::{debug, info};

use super::engine::BackTest;
use super::error::BacktestError;
use crate::config::{validate_config, BacktestConfig, ConfigError};
use crate::data_provider::{load_data, HandlerPerCurrency};
use crate::exchange::{ExchangeSimulator, FeeSchedule};
use crate::host::HostEngine;
use crate::portfolio::{PairSettings, Portfolio};
use crate::report::JsonReportSink;
use crate::statistics::Statistics;
use crate::strategy::StrategyRegistry;

impl BackTest {
    /// 由配置建立回測，使用內建策略
    pub async fn new_from_config(
        config: Option<&BacktestConfig>,
        host_config_path: &str,
        report_output_path: &str,
        host: Option<Arc<dyn HostEngine>>,
    ) -> Result<Self, BacktestError> {
        Self::new_from_config_with_registry(
            config,
            host_config_path,
            report_output_path,
            host,
            &StrategyRegistry::with_defaults(),
        )
        .await
    }

    /// 由配置建立回測，從指定的註冊表查找策略
    pub async fn new_from_config_with_registry(
        config: Option<&BacktestConfig>,
        host_config_path: &str,
        report_output_path: &str,
        host: Option<Arc<dyn HostEngine>>,
        registry: &StrategyRegistry,
    ) -> Result<Self, BacktestError> {
        let cfg = config.ok_or(BacktestError::NilConfig)?;
        let host = host.ok_or(BacktestError::NilHost)?;

        cfg.validate_currency_settings()?;

        let mut exchanges = Vec::with_capacity(cfg.currency_settings.len());
        for cs in &cfg.currency_settings {
            let exchange = host
                .exchange_by_name(&cs.exchange_name)
                .ok_or_else(|| BacktestError::ExchangeNotFound(cs.exchange_name.clone()))?;
            exchanges.push(exchange);
        }

        let data = &cfg.data_settings;
        data.data_source()?;
        data.data_type()?;
        data.validate_date()?;
        let interval = data.interval()?;

        let strategy = registry.load_strategy_by_name(
            &cfg.strategy_settings.name,
            cfg.strategy_settings.simultaneous_signal_processing,
            cfg.strategy_settings.custom_settings.as_ref(),
        )?;

        cfg.validate_min_max()?;
        validate_config(&cfg.statistic_settings).map_err(ConfigError::from)?;
        validate_config(&cfg.log).map_err(ConfigError::from)?;

        info!(
            nickname = %cfg.nickname,
            strategy = strategy.name(),
            pairs = cfg.currency_settings.len(),
            interval = %interval,
            "建立回測"
        );
        if !host_config_path.is_empty() {
            debug!(path = host_config_path, "主機配置路徑");
        }

        let mut portfolio = Portfolio::setup();
        let mut exchange_sim = ExchangeSimulator::new();
        let mut statistics = Statistics::new(cfg.statistic_settings.risk_free_rate, interval);
        statistics.nickname = cfg.nickname.clone();
        statistics.goal = cfg.goal.clone();
        statistics.set_strategy(strategy.name(), strategy.description());

        let mut datas = HandlerPerCurrency::new();
        for (cs, exchange) in cfg.currency_settings.iter().zip(exchanges) {
            let key = cs.pair_key()?;
            let handler = load_data(data, &key, exchange, host.candle_store()).await?;
            datas.set_data_for_currency(handler);

            portfolio.setup_currency_settings_map(key.clone(), PairSettings::from(cs));
            portfolio.set_initial_funds(&key, cs.initial_funds)?;
            exchange_sim.set_fee_schedule(key.clone(), FeeSchedule::new(cs.maker_fee, cs.taker_fee));
            statistics.setup_pair(key, cs.initial_funds);
        }

        let mut bt = BackTest::new(datas, strategy, portfolio, exchange_sim, statistics).with_host(host);
        if !host_config_path.is_empty() {
            bt.host_config_path = Some(host_config_path.to_string());
        }
        if !report_output_path.is_empty() {
            bt = bt.with_report_sink(Arc::new(JsonReportSink::new(report_output_path)));
        }

        Ok(bt)
    }
}
