//! 統計模組
//!
//! 為每個交易對保存權益序列與交易記錄，回測結束時彙總成最終統計。

pub mod currency_statistic;
pub mod metrics;

pub use currency_statistic::{CurrencyResult, CurrencyStatistic, EquityPoint, TradeRecord};
pub use metrics::Drawdown;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use crate::domain_types::{Interval, PairKey};
use crate::event::{Direction, FillEvent};
use crate::portfolio::Holdings;

/// 統計錯誤
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatisticsError {
    #[error("{key} 的權益更新時間倒退: 最新 {latest}, 收到 {received}")]
    OutOfOrder {
        key: String,
        latest: DateTime<Utc>,
        received: DateTime<Utc>,
    },

    #[error("未設定交易對的統計: {0}")]
    PairNotFound(String),
}

/// 回測的最終統計
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalStatistics {
    pub nickname: String,
    pub goal: String,
    pub strategy_name: String,
    pub strategy_description: String,
    pub pairs: Vec<CurrencyResult>,
    pub total_initial_funds: Decimal,
    pub total_final_value: Decimal,
    /// 百分比
    pub total_return: Decimal,
    pub total_orders: usize,
    pub total_rejections: usize,
    pub best_pair: Option<PairKey>,
    pub worst_pair: Option<PairKey>,
}

#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub nickname: String,
    pub goal: String,
    pub strategy_name: String,
    pub strategy_description: String,
    risk_free_rate: f64,
    interval: Option<Interval>,
    pairs: BTreeMap<PairKey, CurrencyStatistic>,
    finalized: Option<FinalStatistics>,
}

impl Statistics {
    pub fn new(risk_free_rate: f64, interval: Interval) -> Self {
        Self {
            risk_free_rate,
            interval: Some(interval),
            ..Default::default()
        }
    }

    pub fn set_strategy(&mut self, name: &str, description: &str) {
        self.strategy_name = name.to_string();
        self.strategy_description = description.to_string();
    }

    pub fn setup_pair(&mut self, key: PairKey, initial_funds: Decimal) {
        self.pairs
            .insert(key.clone(), CurrencyStatistic::new(key, initial_funds));
    }

    pub fn pair(&self, key: &PairKey) -> Option<&CurrencyStatistic> {
        self.pairs.get(key)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &CurrencyStatistic> {
        self.pairs.values()
    }

    /// 記錄持倉快照
    pub fn update(&mut self, timestamp: DateTime<Utc>, holdings: &Holdings) -> Result<(), StatisticsError> {
        self.pair_mut(&holdings.key)?
            .update(EquityPoint::from_holdings(timestamp, holdings))
    }

    pub fn record_fill(
        &mut self,
        fill: &FillEvent,
        realised_profit: Option<Decimal>,
    ) -> Result<(), StatisticsError> {
        self.pair_mut(&fill.key)?.record_fill(fill, realised_profit);
        Ok(())
    }

    pub fn record_rejection(
        &mut self,
        key: &PairKey,
        timestamp: DateTime<Utc>,
        direction: Direction,
        price: Decimal,
        reason: &str,
    ) -> Result<(), StatisticsError> {
        self.pair_mut(key)?
            .record_rejection(timestamp, direction, price, reason);
        Ok(())
    }

    /// 彙總所有交易對，不修改任何狀態
    pub fn calculate_all(&self) -> FinalStatistics {
        let interval = self.interval.unwrap_or(Interval::OneDay);
        let pairs: Vec<CurrencyResult> = self
            .pairs
            .values()
            .map(|p| p.calculate(self.risk_free_rate, interval))
            .collect();

        let total_initial_funds = pairs
            .iter()
            .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.initial_funds));
        let total_final_value = pairs
            .iter()
            .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.final_value));
        let total_return = metrics::percentage_change(total_initial_funds, total_final_value);

        // 報酬相同時保留先出現的交易對
        let best_pair = pairs
            .iter()
            .fold(None::<&CurrencyResult>, |best, p| match best {
                Some(b) if b.total_return >= p.total_return => Some(b),
                _ => Some(p),
            })
            .map(|p| p.key.clone());
        let worst_pair = pairs
            .iter()
            .fold(None::<&CurrencyResult>, |worst, p| match worst {
                Some(w) if w.total_return <= p.total_return => Some(w),
                _ => Some(p),
            })
            .map(|p| p.key.clone());

        FinalStatistics {
            nickname: self.nickname.clone(),
            goal: self.goal.clone(),
            strategy_name: self.strategy_name.clone(),
            strategy_description: self.strategy_description.clone(),
            total_orders: pairs.iter().map(|p| p.buy_orders + p.sell_orders).sum(),
            total_rejections: pairs.iter().map(|p| p.rejected_orders).sum(),
            pairs,
            total_initial_funds,
            total_final_value,
            total_return,
            best_pair,
            worst_pair,
        }
    }

    /// 計算並保存最終統計
    pub fn finalize(&mut self) -> &FinalStatistics {
        let stats = self.calculate_all();
        info!(
            pairs = stats.pairs.len(),
            total_return = %stats.total_return,
            orders = stats.total_orders,
            rejections = stats.total_rejections,
            "統計已完成"
        );
        self.finalized.insert(stats)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    pub fn final_statistics(&self) -> Option<&FinalStatistics> {
        self.finalized.as_ref()
    }

    fn pair_mut(&mut self, key: &PairKey) -> Result<&mut CurrencyStatistic, StatisticsError> {
        self.pairs
            .get_mut(key)
            .ok_or_else(|| StatisticsError::PairNotFound(key.to_string()))
    }
}
