use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::PortfolioError;
use crate::config::MinMax;
use crate::event::Direction;

/// 計算出的買入數量保留的小數位
const AMOUNT_DECIMAL_PLACES: u32 = 8;

/// 訂單定量規則
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub buy_side: MinMax,
    pub sell_side: MinMax,
}

impl Size {
    pub fn new(buy_side: MinMax, sell_side: MinMax) -> Self {
        Self { buy_side, sell_side }
    }

    /// 計算訂單數量
    ///
    /// 未指定數量時，買入使用扣除手續費後的全部資金，賣出使用全部持倉。
    /// 候選數量不大於 0 時返回 0，由調用方拒絕。低於最小數量時返回錯誤，不會自動調高。
    /// 資金與價格的比值超出 `Decimal` 範圍時返回 `SizeOverflow`。
    pub fn size_order(
        &self,
        direction: Direction,
        requested: Option<Decimal>,
        price: Decimal,
        funds: Decimal,
        held: Decimal,
        fee_rate: Decimal,
    ) -> Result<Decimal, PortfolioError> {
        let (candidate, limits) = match direction {
            Direction::Buy => {
                let candidate = match requested {
                    Some(amount) => amount,
                    None if price > Decimal::ZERO => funds
                        .checked_mul(Decimal::ONE - fee_rate)
                        .and_then(|net| net.checked_div(price))
                        .ok_or(PortfolioError::SizeOverflow)?
                        .round_dp_with_strategy(AMOUNT_DECIMAL_PLACES, RoundingStrategy::ToZero),
                    None => Decimal::ZERO,
                };
                (candidate, &self.buy_side)
            }
            Direction::Sell => (requested.unwrap_or(held).min(held), &self.sell_side),
            Direction::Hold => return Ok(Decimal::ZERO),
        };

        if candidate <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let mut amount = candidate;
        if limits.maximum_size > Decimal::ZERO {
            amount = amount.min(limits.maximum_size);
        }
        if limits.maximum_total > Decimal::ZERO && price > Decimal::ZERO {
            let by_total = limits
                .maximum_total
                .checked_div(price)
                .ok_or(PortfolioError::SizeOverflow)?
                .round_dp_with_strategy(AMOUNT_DECIMAL_PLACES, RoundingStrategy::ToZero);
            amount = amount.min(by_total);
        }

        if limits.minimum_size > Decimal::ZERO && amount < limits.minimum_size {
            return Err(PortfolioError::AmountBelowMinimum {
                amount: amount.to_string(),
                minimum: limits.minimum_size.to_string(),
            });
        }

        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn limits(minimum: Decimal, maximum: Decimal, total: Decimal) -> MinMax {
        MinMax {
            minimum_size: minimum,
            maximum_size: maximum,
            maximum_total: total,
        }
    }

    #[rstest]
    #[case::all_funds(None, dec!(0), dec!(10))]
    #[case::after_fee(None, dec!(0.5), dec!(5))]
    #[case::requested(Some(dec!(3)), dec!(0), dec!(3))]
    #[case::fee_exceeds_notional(None, dec!(1337), dec!(0))]
    fn test_buy_sizing(
        #[case] requested: Option<Decimal>,
        #[case] fee: Decimal,
        #[case] expected: Decimal,
    ) {
        let size = Size::default();
        let amount = size
            .size_order(Direction::Buy, requested, dec!(100), dec!(1000), dec!(0), fee)
            .unwrap();
        assert_eq!(amount, expected);
    }

    #[test]
    fn test_sell_defaults_to_holdings_and_clamps() {
        let size = Size::default();
        assert_eq!(
            size.size_order(Direction::Sell, None, dec!(1), dec!(0), dec!(4), dec!(0)).unwrap(),
            dec!(4)
        );
        assert_eq!(
            size.size_order(Direction::Sell, Some(dec!(9)), dec!(1), dec!(0), dec!(4), dec!(0)).unwrap(),
            dec!(4)
        );
        assert!(size
            .size_order(Direction::Sell, None, dec!(1), dec!(0), dec!(0), dec!(0))
            .unwrap()
            .is_zero());
    }

    #[test]
    fn test_maximums_clamp() {
        let size = Size::new(limits(dec!(0), dec!(5), dec!(300)), MinMax::default());
        let amount = size
            .size_order(Direction::Buy, None, dec!(100), dec!(1000), dec!(0), dec!(0))
            .unwrap();
        assert_eq!(amount, dec!(3));
    }

    #[test]
    fn test_below_minimum_is_error() {
        let size = Size::new(limits(dec!(2), dec!(0), dec!(0)), MinMax::default());
        assert_matches!(
            size.size_order(Direction::Buy, Some(dec!(1)), dec!(100), dec!(1000), dec!(0), dec!(0)),
            Err(PortfolioError::AmountBelowMinimum { .. })
        );
    }

    #[test]
    fn test_overflowing_buy_size_is_error() {
        let size = Size::default();
        assert_matches!(
            size.size_order(
                Direction::Buy,
                None,
                dec!(0.000000001),
                dec!(100000000000000000000),
                dec!(0),
                dec!(0)
            ),
            Err(PortfolioError::SizeOverflow)
        );

        let capped = Size::new(limits(dec!(0), dec!(0), dec!(100000000000000000000)), MinMax::default());
        assert_matches!(
            capped.size_order(Direction::Buy, Some(dec!(1)), dec!(0.000000001), dec!(1), dec!(0), dec!(0)),
            Err(PortfolioError::SizeOverflow)
        );
    }
}
