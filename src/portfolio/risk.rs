use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Holdings;
use crate::event::Direction;

const OVERFLOW_REASON: &str = "order size overflows";

/// 風控限制，0 表示不限制
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub maximum_position_size: Decimal,
    pub maximum_holdings_ratio: Decimal,
}

impl Risk {
    pub fn new(maximum_position_size: Decimal, maximum_holdings_ratio: Decimal) -> Self {
        Self {
            maximum_position_size,
            maximum_holdings_ratio,
        }
    }

    /// 檢查訂單，不通過時返回拒絕原因
    pub fn evaluate(
        &self,
        direction: Direction,
        amount: Decimal,
        price: Decimal,
        fee_rate: Decimal,
        holdings: &Holdings,
    ) -> Option<String> {
        match direction {
            Direction::Buy => {
                let Some(cost) = amount
                    .checked_mul(price)
                    .and_then(|notional| notional.checked_mul(Decimal::ONE + fee_rate))
                else {
                    return Some(OVERFLOW_REASON.to_string());
                };
                if cost > holdings.funds {
                    return Some(format!(
                        "insufficient funds: order costs {} with {} available",
                        cost, holdings.funds
                    ));
                }

                let Some(position) = holdings.quantity.checked_add(amount) else {
                    return Some(OVERFLOW_REASON.to_string());
                };
                if self.maximum_position_size > Decimal::ZERO && position > self.maximum_position_size {
                    return Some(format!(
                        "position {} would exceed maximum position size {}",
                        position, self.maximum_position_size
                    ));
                }

                if self.maximum_holdings_ratio > Decimal::ZERO {
                    let Some(equity) = holdings
                        .quantity
                        .checked_mul(price)
                        .and_then(|value| value.checked_add(holdings.funds))
                    else {
                        return Some(OVERFLOW_REASON.to_string());
                    };
                    if equity > Decimal::ZERO {
                        let Some(ratio) = position
                            .checked_mul(price)
                            .and_then(|value| value.checked_div(equity))
                        else {
                            return Some(OVERFLOW_REASON.to_string());
                        };
                        if ratio > self.maximum_holdings_ratio {
                            return Some(format!(
                                "holdings ratio {} would exceed maximum {}",
                                ratio.round_dp(4),
                                self.maximum_holdings_ratio
                            ));
                        }
                    }
                }
                None
            }
            Direction::Sell => {
                if holdings.quantity <= Decimal::ZERO {
                    Some("nothing held to sell".to_string())
                } else if amount > holdings.quantity {
                    Some(format!(
                        "sell amount {} exceeds held quantity {}",
                        amount, holdings.quantity
                    ))
                } else {
                    None
                }
            }
            Direction::Hold => None,
        }
    }
}
