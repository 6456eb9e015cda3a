//! 回測主循環
//!
//! 單一任務內依序處理事件：數據 → 信號 → 訂單 → 成交。每個事件完整處理後才取出下一個，
//! 因此持倉與權益序列的更新順序是確定的。

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error::{BacktestError, RunState};
use super::stop::StopHandle;
use crate::data_provider::HandlerPerCurrency;
use crate::domain_types::PairKey;
use crate::event::{DataEvent, Event, EventQueue, FillEvent, OrderEvent, SignalEvent};
use crate::exchange::ExchangeSimulator;
use crate::host::HostEngine;
use crate::portfolio::{Holdings, OrderDecision, Portfolio};
use crate::report::ReportSink;
use crate::statistics::Statistics;
use crate::strategy::Strategy;

/// 主循環的結束方式
enum LoopExit {
    Completed,
    Stopped,
}

/// 回測編排器
#[derive(Default)]
pub struct BackTest {
    pub(super) host: Option<Arc<dyn HostEngine>>,
    pub(super) host_config_path: Option<String>,
    pub(super) datas: Option<HandlerPerCurrency>,
    pub(super) strategy: Option<Box<dyn Strategy>>,
    pub(super) portfolio: Option<Portfolio>,
    pub(super) exchange: Option<ExchangeSimulator>,
    pub(super) statistics: Option<Statistics>,
    pub(super) report: Option<Arc<dyn ReportSink>>,
    event_queue: EventQueue,
    stop: StopHandle,
    state: RunState,
    events_processed: u64,
}

impl BackTest {
    /// 以已建立的組件組裝回測
    pub fn new(
        datas: HandlerPerCurrency,
        strategy: Box<dyn Strategy>,
        portfolio: Portfolio,
        exchange: ExchangeSimulator,
        statistics: Statistics,
    ) -> Self {
        Self {
            datas: Some(datas),
            strategy: Some(strategy),
            portfolio: Some(portfolio),
            exchange: Some(exchange),
            statistics: Some(statistics),
            ..Default::default()
        }
    }

    pub fn with_host(mut self, host: Arc<dyn HostEngine>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report = Some(sink);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn host(&self) -> Option<&Arc<dyn HostEngine>> {
        self.host.as_ref()
    }

    pub fn host_config_path(&self) -> Option<&str> {
        self.host_config_path.as_deref()
    }

    pub fn datas(&self) -> Option<&HandlerPerCurrency> {
        self.datas.as_ref()
    }

    pub fn strategy(&self) -> Option<&dyn Strategy> {
        self.strategy.as_deref()
    }

    pub fn portfolio(&self) -> Option<&Portfolio> {
        self.portfolio.as_ref()
    }

    pub fn exchange(&self) -> Option<&ExchangeSimulator> {
        self.exchange.as_ref()
    }

    /// 運行失敗時保留部分統計，但不會完成彙總
    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }

    pub fn report_sink(&self) -> Option<&Arc<dyn ReportSink>> {
        self.report.as_ref()
    }

    pub fn event_queue(&self) -> &EventQueue {
        &self.event_queue
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// 請求停止；不會中斷正在處理的事件
    pub fn stop(&self) {
        if self.stop.stop() {
            info!(state = %self.state, "收到停止請求");
        }
    }

    /// 回到未配置的初始狀態
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 運行回測直到數據耗盡、收到停止信號或發生致命錯誤
    pub async fn run(&mut self) -> Result<RunState, BacktestError> {
        if self.state != RunState::Created {
            return Err(BacktestError::AlreadyRun(self.state));
        }

        self.state = RunState::Running;
        info!(
            pairs = self.datas.as_ref().map_or(0, |d| d.len()),
            strategy = self.strategy.as_ref().map_or("", |s| s.name()),
            "回測開始"
        );

        match self.run_loop().await {
            Ok(LoopExit::Completed) => {
                self.state = RunState::Completed;
                info!(events = self.events_processed, "回測完成");
                self.finish()?;
                Ok(RunState::Completed)
            }
            Ok(LoopExit::Stopped) => {
                self.state = RunState::Stopped;
                info!(events = self.events_processed, "回測已停止");
                Ok(RunState::Stopped)
            }
            Err(e) => {
                self.state = RunState::Failed;
                error!(error = %e, events = self.events_processed, "回測失敗");
                Err(e)
            }
        }
    }

    /// 為已停止的回測計算統計並寫出報告
    ///
    /// 實盤模式只能以停止結束，需要結果時由調用方顯式結算。重複調用不會再次寫出報告。
    pub fn finalize_partial(&mut self) -> Result<(), BacktestError> {
        if self.state != RunState::Stopped {
            return Err(BacktestError::NotStopped(self.state));
        }
        if self.statistics.as_ref().is_some_and(|s| s.is_finalized()) {
            return Ok(());
        }
        info!(events = self.events_processed, "結算已停止的回測");
        self.finish()
    }

    fn finish(&mut self) -> Result<(), BacktestError> {
        let statistics = self
            .statistics
            .as_mut()
            .ok_or(BacktestError::NotConfigured("statistics"))?;
        let stats = statistics.finalize();
        if let Some(sink) = &self.report {
            sink.write_report(stats)?;
        }
        Ok(())
    }

    async fn run_loop(&mut self) -> Result<LoopExit, BacktestError> {
        let Self {
            datas,
            strategy,
            portfolio,
            exchange,
            statistics,
            event_queue,
            stop,
            events_processed,
            ..
        } = self;

        let mut loop_ctx = RunContext {
            datas: datas.as_mut().ok_or(BacktestError::NotConfigured("data handlers"))?,
            strategy: strategy
                .as_mut()
                .ok_or(BacktestError::NotConfigured("strategy"))?,
            portfolio: portfolio.as_mut().ok_or(BacktestError::NotConfigured("portfolio"))?,
            exchange: exchange.as_ref().ok_or(BacktestError::NotConfigured("exchange"))?,
            statistics: statistics
                .as_mut()
                .ok_or(BacktestError::NotConfigured("statistics"))?,
            queue: event_queue,
            stop,
            processed: events_processed,
        };

        loop_ctx.run().await
    }
}

struct RunContext<'a> {
    datas: &'a mut HandlerPerCurrency,
    strategy: &'a mut Box<dyn Strategy>,
    portfolio: &'a mut Portfolio,
    exchange: &'a ExchangeSimulator,
    statistics: &'a mut Statistics,
    queue: &'a mut EventQueue,
    stop: &'a StopHandle,
    processed: &'a mut u64,
}

impl RunContext<'_> {
    async fn run(&mut self) -> Result<LoopExit, BacktestError> {
        loop {
            if self.stop.is_stopped() {
                return Ok(LoopExit::Stopped);
            }

            if self.queue.is_empty() {
                if self.datas.all_exhausted() {
                    return Ok(LoopExit::Completed);
                }
                if self.pull_next_data().await?.is_none() {
                    return Ok(LoopExit::Stopped);
                }
                continue;
            }

            let Some(event) = self.queue.pop() else {
                continue;
            };
            *self.processed += 1;
            debug!(kind = event.kind().as_str(), pair = %event.key(), time = %event.timestamp(), "處理事件");

            match event {
                Event::Data(data) => self.on_data(data)?,
                Event::Signal(signal) => self.on_signal(signal)?,
                Event::Order(order) => self.on_order(order)?,
                Event::Fill(fill) => self.on_fill(fill)?,
            }
        }
    }

    /// 依配置順序從每個未耗盡的處理器取出下一個數據點；等待實時數據時收到停止信號返回 None
    async fn pull_next_data(&mut self) -> Result<Option<usize>, BacktestError> {
        let mut pushed = 0;
        for handler in self.datas.handlers_mut() {
            if handler.is_exhausted() {
                continue;
            }

            let next = if handler.is_live() {
                tokio::select! {
                    res = handler.next() => res?,
                    _ = self.stop.stopped() => return Ok(None),
                }
            } else {
                handler.next().await?
            };

            if let Some(data) = next {
                self.queue.push(data);
                pushed += 1;
            }
        }
        Ok(Some(pushed))
    }

    fn on_data(&mut self, data: DataEvent) -> Result<(), BacktestError> {
        if !self.strategy.using_simultaneous_processing() {
            let holdings = self.mark_to_market(&data)?;
            let signal = self.strategy.on_signal(&data, &holdings)?;
            self.queue.push(signal);
            return Ok(());
        }

        let timestamp = data.timestamp();
        let mut batch = vec![data];
        while let Some(Event::Data(next)) = self.queue.peek() {
            if next.timestamp() != timestamp {
                break;
            }
            if let Some(Event::Data(next)) = self.queue.pop() {
                *self.processed += 1;
                batch.push(next);
            }
        }

        let mut snapshot = Vec::with_capacity(batch.len());
        for data in batch {
            let holdings = self.mark_to_market(&data)?;
            snapshot.push((data, holdings));
        }
        for signal in self.strategy.on_simultaneous_signals(&snapshot)? {
            self.queue.push(signal);
        }
        Ok(())
    }

    /// 以收盤價重估持倉並記錄權益快照
    fn mark_to_market(&mut self, data: &DataEvent) -> Result<Holdings, BacktestError> {
        let holdings = self.portfolio.update_market_price(data)?.clone();
        self.statistics.update(data.timestamp(), &holdings)?;
        Ok(holdings)
    }

    fn on_signal(&mut self, signal: SignalEvent) -> Result<(), BacktestError> {
        let data = self.latest_data(&signal.key)?;

        match self.portfolio.on_signal(&signal, &data) {
            Ok(OrderDecision::Hold) => {
                debug!(pair = %signal.key, "策略選擇觀望");
            }
            Ok(OrderDecision::Submit(order)) => self.queue.push(order),
            Ok(OrderDecision::Rejected(reason)) => {
                self.statistics.record_rejection(
                    &signal.key,
                    signal.timestamp,
                    signal.direction,
                    data.close(),
                    &reason,
                )?;
            }
            Err(e) if !e.is_fatal() => {
                warn!(pair = %signal.key, error = %e, "訂單定量失敗，記錄為拒絕");
                self.statistics.record_rejection(
                    &signal.key,
                    signal.timestamp,
                    signal.direction,
                    data.close(),
                    &e.to_string(),
                )?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn on_order(&mut self, order: OrderEvent) -> Result<(), BacktestError> {
        let data = self.latest_data(&order.key)?;
        let fill = self.exchange.execute_order(&order, &data);
        self.queue.push(fill);
        Ok(())
    }

    fn on_fill(&mut self, fill: FillEvent) -> Result<(), BacktestError> {
        let realised = self.portfolio.apply_fill(&fill)?;
        self.statistics.record_fill(&fill, realised)?;

        if let Some(holdings) = self.portfolio.holdings(&fill.key) {
            self.statistics.update(fill.timestamp, holdings)?;
        }
        Ok(())
    }

    /// 交易對處理器最近返回的數據點
    fn latest_data(&self, key: &PairKey) -> Result<DataEvent, BacktestError> {
        self.datas
            .get(key)
            .and_then(|h| h.latest())
            .cloned()
            .ok_or_else(|| BacktestError::MissingData(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_provider::KlineData;
    use crate::domain_types::{AssetType, Candle, CurrencyPair, Interval};
    use crate::portfolio::PairSettings;
    use crate::report::{MockReportSink, ReportError};
    use crate::strategy::DollarCostAverage;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn single_candle_backtest() -> BackTest {
        let key = PairKey::new("binance", AssetType::Spot, CurrencyPair::new("BTC", "USDT"));
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut datas = HandlerPerCurrency::new();
        datas.set_data_for_currency(Box::new(KlineData::new(
            key.clone(),
            Interval::OneHour,
            vec![Candle::flat(timestamp, dec!(100), dec!(1))],
        )));
        let mut portfolio = Portfolio::setup();
        portfolio.setup_currency_settings_map(key.clone(), PairSettings::default());
        portfolio.set_initial_funds(&key, dec!(1000)).unwrap();
        let mut statistics = Statistics::new(0.0, Interval::OneHour);
        statistics.setup_pair(key, dec!(1000));

        BackTest::new(
            datas,
            Box::new(DollarCostAverage::default()),
            portfolio,
            ExchangeSimulator::new(),
            statistics,
        )
    }

    #[tokio::test]
    async fn test_report_written_once_after_completion() {
        let mut sink = MockReportSink::new();
        sink.expect_write_report()
            .withf(|stats| stats.pairs.len() == 1 && stats.total_orders == 1)
            .times(1)
            .returning(|_| Ok(()));

        let mut bt = single_candle_backtest().with_report_sink(Arc::new(sink));

        assert_eq!(bt.run().await.unwrap(), RunState::Completed);
    }

    #[tokio::test]
    async fn test_report_failure_keeps_completed_state() {
        let mut sink = MockReportSink::new();
        sink.expect_write_report().times(1).returning(|_| {
            Err(ReportError::Io {
                path: "report.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        });

        let mut bt = single_candle_backtest().with_report_sink(Arc::new(sink));
        let err = bt.run().await.unwrap_err();

        assert_matches!(err, BacktestError::Report(ReportError::Io { .. }));
        assert_eq!(bt.state(), RunState::Completed);
        assert!(bt.statistics().unwrap().is_finalized());
    }

    #[tokio::test]
    async fn test_stopped_run_skips_report() {
        let mut sink = MockReportSink::new();
        sink.expect_write_report().never();

        let mut bt = single_candle_backtest().with_report_sink(Arc::new(sink));
        bt.stop_handle().stop();

        assert_eq!(bt.run().await.unwrap(), RunState::Stopped);
        assert!(bt.event_queue().is_empty());
    }

    #[tokio::test]
    async fn test_finalize_partial_writes_report_once_after_stop() {
        let mut sink = MockReportSink::new();
        sink.expect_write_report()
            .withf(|stats| stats.pairs.len() == 1 && stats.total_orders == 0)
            .times(1)
            .returning(|_| Ok(()));

        let mut bt = single_candle_backtest().with_report_sink(Arc::new(sink));
        bt.stop_handle().stop();
        assert_eq!(bt.run().await.unwrap(), RunState::Stopped);

        bt.finalize_partial().unwrap();
        bt.finalize_partial().unwrap();

        assert_eq!(bt.state(), RunState::Stopped);
        assert!(bt.statistics().unwrap().is_finalized());
    }

    #[tokio::test]
    async fn test_finalize_partial_requires_stopped_state() {
        let mut bt = single_candle_backtest();
        assert_matches!(
            bt.finalize_partial(),
            Err(BacktestError::NotStopped(RunState::Created))
        );

        bt.run().await.unwrap();
        assert_matches!(
            bt.finalize_partial(),
            Err(BacktestError::NotStopped(RunState::Completed))
        );
    }
}
