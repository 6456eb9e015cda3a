use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::metrics::{self, Drawdown};
use super::StatisticsError;
use crate::domain_types::{Interval, PairKey};
use crate::event::{Direction, FillEvent, OrderStatus};
use crate::portfolio::Holdings;

/// 某一時間點的權益快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub funds: Decimal,
    pub quantity: Decimal,
    pub market_price: Decimal,
    pub total_value: Decimal,
}

impl EquityPoint {
    pub fn from_holdings(timestamp: DateTime<Utc>, holdings: &Holdings) -> Self {
        Self {
            timestamp,
            funds: holdings.funds,
            quantity: holdings.quantity,
            market_price: holdings.market_price,
            total_value: holdings.total_value(),
        }
    }
}

/// 成交或被拒絕的交易記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub order_id: Option<u64>,
    pub direction: Direction,
    pub amount: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub status: OrderStatus,
    pub reason: Option<String>,
    /// 賣出成交的已實現損益
    pub realised_profit: Option<Decimal>,
}

/// 單一交易對的計算結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyResult {
    pub key: PairKey,
    pub initial_funds: Decimal,
    pub final_value: Decimal,
    pub final_funds: Decimal,
    pub final_quantity: Decimal,
    /// 百分比
    pub total_return: Decimal,
    pub max_drawdown: Drawdown,
    pub buy_orders: usize,
    pub sell_orders: usize,
    pub rejected_orders: usize,
    pub total_fees: Decimal,
    pub realised_profit: Decimal,
    /// 獲利賣出佔所有賣出的比例
    pub win_rate: Decimal,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub equity_points: usize,
}

/// 單一交易對的權益序列與交易記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyStatistic {
    pub key: PairKey,
    pub initial_funds: Decimal,
    pub equity: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
}

impl CurrencyStatistic {
    pub fn new(key: PairKey, initial_funds: Decimal) -> Self {
        Self {
            key,
            initial_funds,
            equity: Vec::new(),
            trades: Vec::new(),
        }
    }

    /// 追加權益點；同一時間點只保留最新的快照，時間倒退時返回錯誤
    pub fn update(&mut self, point: EquityPoint) -> Result<(), StatisticsError> {
        match self.equity.last_mut() {
            Some(last) if point.timestamp < last.timestamp => Err(StatisticsError::OutOfOrder {
                key: self.key.to_string(),
                latest: last.timestamp,
                received: point.timestamp,
            }),
            Some(last) if point.timestamp == last.timestamp => {
                *last = point;
                Ok(())
            }
            _ => {
                self.equity.push(point);
                Ok(())
            }
        }
    }

    pub fn record_fill(&mut self, fill: &FillEvent, realised_profit: Option<Decimal>) {
        self.trades.push(TradeRecord {
            timestamp: fill.timestamp,
            order_id: Some(fill.order_id),
            direction: fill.direction,
            amount: fill.amount,
            price: fill.fill_price,
            fee: fill.fee,
            status: fill.status,
            reason: fill.reason.clone(),
            realised_profit,
        });
    }

    pub fn record_rejection(
        &mut self,
        timestamp: DateTime<Utc>,
        direction: Direction,
        price: Decimal,
        reason: &str,
    ) {
        self.trades.push(TradeRecord {
            timestamp,
            order_id: None,
            direction,
            amount: Decimal::ZERO,
            price,
            fee: Decimal::ZERO,
            status: OrderStatus::Rejected,
            reason: Some(reason.to_string()),
            realised_profit: None,
        });
    }

    pub fn calculate(&self, risk_free_rate: f64, interval: Interval) -> CurrencyResult {
        let last = self.equity.last();
        let final_value = last.map_or(self.initial_funds, |p| p.total_value);
        let total_return = metrics::percentage_change(self.initial_funds, final_value);

        let filled = || self.trades.iter().filter(|t| t.status == OrderStatus::Filled);
        let buy_orders = filled().filter(|t| t.direction == Direction::Buy).count();
        let sells: Vec<Decimal> = filled().filter_map(|t| t.realised_profit).collect();
        let wins = sells.iter().filter(|p| **p > Decimal::ZERO).count();
        let win_rate = if sells.is_empty() {
            Decimal::ZERO
        } else {
            (Decimal::from(wins as u64) / Decimal::from(sells.len() as u64)).round_dp(8)
        };

        let series: Vec<(DateTime<Utc>, Decimal)> =
            self.equity.iter().map(|p| (p.timestamp, p.total_value)).collect();
        let values: Vec<Decimal> = series.iter().map(|(_, v)| *v).collect();
        let returns = metrics::period_returns(&values);
        let risk_free = metrics::risk_free_per_period(risk_free_rate, interval);

        CurrencyResult {
            key: self.key.clone(),
            initial_funds: self.initial_funds,
            final_value,
            final_funds: last.map_or(self.initial_funds, |p| p.funds),
            final_quantity: last.map_or(Decimal::ZERO, |p| p.quantity),
            total_return,
            max_drawdown: metrics::max_drawdown(&series),
            buy_orders,
            sell_orders: filled().filter(|t| t.direction == Direction::Sell).count(),
            rejected_orders: self
                .trades
                .iter()
                .filter(|t| t.status == OrderStatus::Rejected)
                .count(),
            total_fees: filled().map(|t| t.fee).sum(),
            realised_profit: sells.iter().copied().sum(),
            win_rate,
            sharpe_ratio: metrics::sharpe_ratio(&returns, risk_free),
            sortino_ratio: metrics::sortino_ratio(&returns, risk_free),
            equity_points: self.equity.len(),
        }
    }
}
