mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::*;
use event_backtester::backtest::{BackTest, BacktestError};
use event_backtester::config::{BacktestConfig, ConfigError, CsvData, MinMax, ValidationError};
use event_backtester::data_provider::DataError;
use event_backtester::strategy::StrategyError;

async fn setup(cfg: &BacktestConfig) -> Result<BackTest, BacktestError> {
    BackTest::new_from_config(Some(cfg), "", "", Some(single_candle_host(dec!(1337)))).await
}

#[tokio::test]
async fn test_nil_config() {
    let err = BackTest::new_from_config(None, "", "", Some(single_candle_host(dec!(1337))))
        .await
        .err();

    assert_matches!(err, Some(BacktestError::NilConfig));
}

#[tokio::test]
async fn test_nil_host() {
    let err = BackTest::new_from_config(Some(&base_config()), "", "", None)
        .await
        .err();

    assert_matches!(err, Some(BacktestError::NilHost));
}

#[tokio::test]
async fn test_nil_config_checked_before_host() {
    let err = BackTest::new_from_config(None, "", "", None).await.err();

    assert_matches!(err, Some(BacktestError::NilConfig));
}

#[rstest]
#[case::no_currency_settings(
    |c: &mut BacktestConfig| c.currency_settings.clear(),
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::NoCurrencySettings))
)]
#[case::bad_initial_funds(
    |c: &mut BacktestConfig| c.currency_settings[0].initial_funds = Decimal::ZERO,
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::BadInitialFunds(_)))
)]
#[case::funds_checked_across_all_pairs_before_asset(
    |c: &mut BacktestConfig| {
        c.currency_settings[0].asset = String::new();
        c.currency_settings.push(currency_settings("ETH", "USDT", Decimal::ZERO));
    },
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::BadInitialFunds(_)))
)]
#[case::unset_asset(
    |c: &mut BacktestConfig| c.currency_settings[0].asset = String::new(),
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::UnsetAsset(_)))
)]
#[case::invalid_asset(
    |c: &mut BacktestConfig| c.currency_settings[0].asset = "moon".to_string(),
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::InvalidAsset(_)))
)]
#[case::unset_currency(
    |c: &mut BacktestConfig| c.currency_settings[0].base = String::new(),
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::UnsetCurrency(_)))
)]
#[case::exchange_not_found(
    |c: &mut BacktestConfig| c.currency_settings[0].exchange_name = "kraken".to_string(),
    |e: &BacktestError| matches!(e, BacktestError::ExchangeNotFound(name) if name == "kraken")
)]
#[case::no_data_source(
    |c: &mut BacktestConfig| c.data_settings.api_data = None,
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::NoDataSource))
)]
#[case::multiple_data_sources(
    |c: &mut BacktestConfig| c.data_settings.csv_data = Some(CsvData::default()),
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::MultipleDataSources(_)))
)]
#[case::unrecognised_data_type(
    |c: &mut BacktestConfig| c.data_settings.data_type = "tick".to_string(),
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::UnrecognisedDataType(t)) if t == "tick")
)]
#[case::start_end_unset(
    |c: &mut BacktestConfig| {
        if let Some(api) = c.data_settings.api_data.as_mut() {
            api.end_date = None;
        }
    },
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::StartEndUnset))
)]
#[case::start_after_end(
    |c: &mut BacktestConfig| {
        if let Some(api) = c.data_settings.api_data.as_mut() {
            api.end_date = Some(t0() - Duration::days(1));
        }
    },
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::StartEndUnset))
)]
#[case::interval_unset(
    |c: &mut BacktestConfig| c.data_settings.interval = 0,
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::IntervalUnset(0)))
)]
#[case::strategy_not_found(
    |c: &mut BacktestConfig| c.strategy_settings.name = "moonshot".to_string(),
    |e: &BacktestError| matches!(e, BacktestError::Strategy(StrategyError::StrategyNotFound(_)))
)]
#[case::invalid_min_max(
    |c: &mut BacktestConfig| c.currency_settings[0].buy_side = MinMax {
        minimum_size: dec!(2),
        maximum_size: dec!(1),
        maximum_total: Decimal::ZERO,
    },
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::InvalidMinMax { .. }))
)]
#[case::invalid_risk_free_rate(
    |c: &mut BacktestConfig| c.statistic_settings.risk_free_rate = 3.0,
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::Validation(ValidationError::RangeError { .. })))
)]
#[case::invalid_log_level(
    |c: &mut BacktestConfig| c.log.level = "verbose".to_string(),
    |e: &BacktestError| matches!(e, BacktestError::Config(ConfigError::Validation(_)))
)]
#[tokio::test]
async fn test_new_from_config_validation(
    #[case] mutate: fn(&mut BacktestConfig),
    #[case] expected: fn(&BacktestError) -> bool,
) {
    let mut cfg = base_config();
    mutate(&mut cfg);

    let err = setup(&cfg).await.err().expect("setup should fail");

    assert!(expected(&err), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn test_first_failing_check_wins() {
    // 交易所、數據來源與策略都無效時返回最早的檢查
    let mut cfg = base_config();
    cfg.currency_settings[0].exchange_name = "kraken".to_string();
    cfg.data_settings.api_data = None;
    cfg.strategy_settings.name = "moonshot".to_string();

    assert_matches!(setup(&cfg).await.err(), Some(BacktestError::ExchangeNotFound(_)));

    cfg.currency_settings[0].exchange_name = TEST_EXCHANGE.to_string();
    assert_matches!(
        setup(&cfg).await.err(),
        Some(BacktestError::Config(ConfigError::NoDataSource))
    );

    cfg = base_config();
    cfg.data_settings.interval = 0;
    cfg.strategy_settings.name = "moonshot".to_string();
    assert_matches!(
        setup(&cfg).await.err(),
        Some(BacktestError::Config(ConfigError::IntervalUnset(0)))
    );
}

#[tokio::test]
async fn test_strategy_name_is_case_insensitive() {
    let mut cfg = base_config();
    cfg.strategy_settings.name = "DollarCostAverage".to_string();

    let bt = setup(&cfg).await.unwrap();

    assert_eq!(bt.strategy().unwrap().name(), "dollarcostaverage");
}

#[tokio::test]
async fn test_simultaneous_processing_enabled_from_config() {
    let mut cfg = base_config();
    cfg.strategy_settings.simultaneous_signal_processing = true;
    cfg.currency_settings.push(currency_settings("ETH", "USDT", dec!(1337)));

    let bt = setup(&cfg).await.unwrap();

    assert!(bt.strategy().unwrap().using_simultaneous_processing());
    assert_eq!(bt.datas().unwrap().len(), 2);
}

#[tokio::test]
async fn test_data_load_failure_aborts_setup() {
    let cfg = base_config();
    let exchange = TestExchange {
        fail_fetch: true,
        ..TestExchange::new(Vec::new())
    };

    let err = BackTest::new_from_config(Some(&cfg), "", "", Some(host_with(exchange)))
        .await
        .err();

    assert_matches!(err, Some(BacktestError::Data(DataError::Exchange { .. })));
}

#[tokio::test]
async fn test_components_wired_from_config() {
    let mut cfg = base_config();
    cfg.nickname = "wired".to_string();
    cfg.goal = "check wiring".to_string();
    cfg.currency_settings[0].maker_fee = dec!(0.001);
    cfg.currency_settings[0].taker_fee = dec!(0.002);

    let bt = setup(&cfg).await.unwrap();
    let key = key("BTC", "USDT");

    let holdings = bt.portfolio().unwrap().holdings(&key).unwrap();
    assert_eq!(holdings.funds, dec!(1337));
    assert_eq!(bt.exchange().unwrap().fee_schedule(&key).taker_fee, dec!(0.002));
    let stats = bt.statistics().unwrap();
    assert_eq!(stats.nickname, "wired");
    assert_eq!(stats.goal, "check wiring");
    assert_eq!(stats.strategy_name, "dollarcostaverage");
    assert!(stats.pair(&key).is_some());
    assert!(bt.report_sink().is_none());
}
