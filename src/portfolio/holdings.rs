use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PortfolioError;
use crate::domain_types::PairKey;
use crate::event::{Direction, FillEvent, OrderStatus};

/// 單一交易對的持倉與資金
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    pub key: PairKey,
    pub timestamp: Option<DateTime<Utc>>,
    pub initial_funds: Decimal,
    /// 可用計價貨幣
    pub funds: Decimal,
    pub quantity: Decimal,
    /// 持倉成本（含手續費）
    pub cost_basis: Decimal,
    pub market_price: Decimal,
    pub realised_profit: Decimal,
    pub total_fees: Decimal,
    pub bought_amount: Decimal,
    pub sold_amount: Decimal,
}

impl Holdings {
    pub fn new(key: PairKey, initial_funds: Decimal) -> Self {
        Self {
            key,
            timestamp: None,
            initial_funds,
            funds: initial_funds,
            quantity: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
            market_price: Decimal::ZERO,
            realised_profit: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            bought_amount: Decimal::ZERO,
            sold_amount: Decimal::ZERO,
        }
    }

    /// 持倉市值，超出 `Decimal` 範圍時取邊界值
    pub fn position_value(&self) -> Decimal {
        self.quantity.saturating_mul(self.market_price)
    }

    /// 總權益 = 可用資金 + 持倉市值
    pub fn total_value(&self) -> Decimal {
        self.funds.saturating_add(self.position_value())
    }

    pub fn unrealised_profit(&self) -> Decimal {
        self.position_value().saturating_sub(self.cost_basis)
    }

    /// 每單位平均成本
    pub fn average_cost(&self) -> Decimal {
        if self.quantity.is_zero() {
            Decimal::ZERO
        } else {
            self.cost_basis
                .checked_div(self.quantity)
                .unwrap_or(Decimal::MAX)
        }
    }

    /// 以最新收盤價重估持倉
    pub fn update_market_price(&mut self, price: Decimal, timestamp: DateTime<Utc>) {
        self.market_price = price;
        self.timestamp = Some(timestamp);
    }

    /// 套用成交結果，賣出時返回已實現損益
    ///
    /// 資金或數量變為負數時返回錯誤且不修改持倉。
    pub fn apply_fill(&mut self, fill: &FillEvent) -> Result<Option<Decimal>, PortfolioError> {
        if fill.status != OrderStatus::Filled {
            return Ok(None);
        }

        let notional = fill.notional();
        match fill.direction {
            Direction::Buy => {
                let cost = notional + fill.fee;
                let funds = self.funds - cost;
                if funds < Decimal::ZERO {
                    return Err(self.negative(funds, self.quantity + fill.amount));
                }
                self.funds = funds;
                self.quantity += fill.amount;
                self.cost_basis += cost;
                self.bought_amount += fill.amount;
                self.total_fees += fill.fee;
                self.timestamp = Some(fill.timestamp);
                Ok(None)
            }
            Direction::Sell => {
                let quantity = self.quantity - fill.amount;
                let funds = self.funds + notional - fill.fee;
                if quantity < Decimal::ZERO || funds < Decimal::ZERO {
                    return Err(self.negative(funds, quantity));
                }
                // 按賣出比例扣除成本，比例不大於 1
                let sold_ratio = fill
                    .amount
                    .checked_div(self.quantity)
                    .unwrap_or(Decimal::ZERO);
                let cost_removed = self.cost_basis * sold_ratio;
                let profit = notional - fill.fee - cost_removed;

                self.funds = funds;
                self.quantity = quantity;
                self.cost_basis = if quantity.is_zero() {
                    Decimal::ZERO
                } else {
                    self.cost_basis - cost_removed
                };
                self.realised_profit += profit;
                self.sold_amount += fill.amount;
                self.total_fees += fill.fee;
                self.timestamp = Some(fill.timestamp);
                Ok(Some(profit))
            }
            Direction::Hold => Ok(None),
        }
    }

    fn negative(&self, funds: Decimal, quantity: Decimal) -> PortfolioError {
        PortfolioError::NegativeHoldings {
            key: self.key.to_string(),
            funds: funds.to_string(),
            quantity: quantity.to_string(),
        }
    }
}
