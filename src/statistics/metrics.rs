use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::domain_types::Interval;

/// 最大回撤
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawdown {
    pub peak: Decimal,
    pub peak_time: Option<DateTime<Utc>>,
    pub trough: Decimal,
    pub trough_time: Option<DateTime<Utc>>,
    /// 百分比，正數
    pub percentage: Decimal,
}

/// 計算權益序列的最大回撤
pub fn max_drawdown(series: &[(DateTime<Utc>, Decimal)]) -> Drawdown {
    let mut worst = Drawdown::default();
    let Some(&(first_time, first_value)) = series.first() else {
        return worst;
    };

    let mut peak = (first_time, first_value);
    worst.peak = first_value;
    worst.peak_time = Some(first_time);
    worst.trough = first_value;
    worst.trough_time = Some(first_time);

    for &(time, value) in series {
        if value > peak.1 {
            peak = (time, value);
            continue;
        }
        if peak.1 <= Decimal::ZERO {
            continue;
        }
        let percentage = (peak.1 - value) / peak.1 * Decimal::ONE_HUNDRED;
        if percentage > worst.percentage {
            worst = Drawdown {
                peak: peak.1,
                peak_time: Some(peak.0),
                trough: value,
                trough_time: Some(time),
                percentage: percentage.round_dp(8),
            };
        }
    }

    worst
}

/// 從 `from` 到 `to` 的百分比變化，溢出時取邊界值
pub fn percentage_change(from: Decimal, to: Decimal) -> Decimal {
    if from.is_zero() {
        return Decimal::ZERO;
    }
    to.checked_sub(from)
        .and_then(|diff| diff.checked_div(from))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(if to > from { Decimal::MAX } else { Decimal::MIN })
        .round_dp(8)
}

/// 相鄰權益點之間的簡單報酬率
pub fn period_returns(values: &[Decimal]) -> Vec<f64> {
    values
        .windows(2)
        .filter_map(|w| {
            if w[0].is_zero() {
                return None;
            }
            w[1].checked_sub(w[0])
                .and_then(|diff| diff.checked_div(w[0]))
                .and_then(|r| r.to_f64())
        })
        .collect()
}

/// 年化無風險利率換算為每個間隔的利率
pub fn risk_free_per_period(annual_rate: f64, interval: Interval) -> f64 {
    let periods_per_year = (365 * 86_400) as f64 / interval.seconds() as f64;
    annual_rate / periods_per_year
}

/// 每個間隔的夏普比率，樣本不足或波動為 0 時為 0
pub fn sharpe_ratio(returns: &[f64], risk_free: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std_dev = returns.iter().std_dev();
    if !std_dev.is_finite() || std_dev == 0.0 {
        return 0.0;
    }
    (returns.iter().mean() - risk_free) / std_dev
}

/// 每個間隔的索提諾比率，只以低於無風險利率的報酬計算下行波動
pub fn sortino_ratio(returns: &[f64], risk_free: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside: f64 = returns
        .iter()
        .map(|r| (r - risk_free).min(0.0).powi(2))
        .sum::<f64>()
        / returns.len() as f64;
    let downside_dev = downside.sqrt();
    if !downside_dev.is_finite() || downside_dev == 0.0 {
        return 0.0;
    }
    (returns.iter().mean() - risk_free) / downside_dev
}
