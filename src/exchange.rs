//! 模擬交易所
//!
//! 以當前 K 線收盤價全額成交市價單；限價單在 K 線價格區間觸及限價時以限價成交。
//! 沒有部分成交，也沒有滑點模型。

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain_types::PairKey;
use crate::event::{DataEvent, FillEvent, OrderEvent, OrderStatus, OrderType};

/// 單一交易對的費率
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeeSchedule {
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
}

impl FeeSchedule {
    pub fn new(maker_fee: Decimal, taker_fee: Decimal) -> Self {
        Self { maker_fee, taker_fee }
    }

    pub fn rate(&self, order_type: OrderType) -> Decimal {
        match order_type {
            OrderType::Market => self.taker_fee,
            OrderType::Limit => self.maker_fee,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExchangeSimulator {
    fees: BTreeMap<PairKey, FeeSchedule>,
}

impl ExchangeSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fee_schedule(&mut self, key: PairKey, fees: FeeSchedule) {
        self.fees.insert(key, fees);
    }

    pub fn fee_schedule(&self, key: &PairKey) -> FeeSchedule {
        self.fees.get(key).copied().unwrap_or_default()
    }

    /// 執行訂單，總是返回成交結果
    pub fn execute_order(&self, order: &OrderEvent, data: &DataEvent) -> FillEvent {
        let fee_rate = self.fee_schedule(&order.key).rate(order.order_type);
        let candle = &data.candle;

        let mut fill = FillEvent {
            order_id: order.id,
            key: order.key.clone(),
            timestamp: data.timestamp(),
            direction: order.direction,
            amount: order.amount,
            fill_price: Decimal::ZERO,
            fee: Decimal::ZERO,
            fee_rate,
            status: OrderStatus::Rejected,
            reason: None,
        };

        if order.amount <= Decimal::ZERO {
            fill.reason = Some(format!("invalid order amount {}", order.amount));
            return fill;
        }
        if candle.close <= Decimal::ZERO {
            fill.reason = Some(format!("invalid close price {}", candle.close));
            return fill;
        }

        let price = match (order.order_type, order.limit_price) {
            (OrderType::Limit, Some(limit)) => {
                if limit < candle.low || limit > candle.high {
                    fill.reason = Some(format!(
                        "limit price {} outside candle range {} - {}",
                        limit, candle.low, candle.high
                    ));
                    return fill;
                }
                limit
            }
            _ => candle.close,
        };

        // 名義價值加手續費必須能以 Decimal 表示
        let fee = order.amount.checked_mul(price).and_then(|notional| {
            let fee = notional.checked_mul(fee_rate)?;
            notional.checked_add(fee).map(|_| fee)
        });
        let Some(fee) = fee else {
            fill.reason = Some("order size overflows".to_string());
            return fill;
        };

        fill.fill_price = price;
        fill.fee = fee;
        fill.status = OrderStatus::Filled;
        debug!(
            pair = %order.key,
            order_id = order.id,
            direction = %order.direction,
            amount = %order.amount,
            price = %price,
            "訂單成交"
        );
        fill
    }
}
