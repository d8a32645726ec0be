//! Candle-body dominance and three-candle price gaps.

use super::types::{Direction, PriceRange};
use crate::domain::market::candle::Candle;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Body-based displacement settings used by the zone detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplacementConfig {
    /// Candles averaged before the measured one
    pub lookback: usize,
    /// Strength at or above which a candle counts as displacement
    pub threshold: Decimal,
}

impl Default for DisplacementConfig {
    fn default() -> Self {
        Self {
            lookback: 5,
            threshold: dec!(1.5),
        }
    }
}

/// Untraded gap between candle `i - 2` and candle `i`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Imbalance {
    pub direction: Direction,
    pub gap: PriceRange,
}

/// Body at `index` divided by the mean body of the preceding `lookback`
/// candles. Zero with insufficient history or a zero mean.
pub fn displacement_strength(candles: &[Candle], index: usize, lookback: usize) -> Decimal {
    if lookback == 0 || index < lookback || index >= candles.len() {
        return Decimal::ZERO;
    }

    let window = &candles[index - lookback..index];
    let avg_body = mean(window.iter().map(Candle::body), window.len());
    if avg_body.is_zero() {
        return Decimal::ZERO;
    }

    candles[index].body() / avg_body
}

pub fn is_displacement(candles: &[Candle], index: usize, config: &DisplacementConfig) -> bool {
    displacement_strength(candles, index, config.lookback) >= config.threshold
}

/// Bullish when `low[i] > high[i-2]`, bearish when `high[i] < low[i-2]`.
pub fn detect_imbalance(candles: &[Candle], index: usize) -> Option<Imbalance> {
    if index < 2 || index >= candles.len() {
        return None;
    }

    let first = &candles[index - 2];
    let current = &candles[index];

    if current.low > first.high {
        return Some(Imbalance {
            direction: Direction::Bullish,
            gap: PriceRange::new(first.high, current.low),
        });
    }

    if current.high < first.low {
        return Some(Imbalance {
            direction: Direction::Bearish,
            gap: PriceRange::new(current.high, first.low),
        });
    }

    None
}

/// Range-based displacement: range beyond `multiplier` times the mean range
/// of the `lookback` candles before `index`, with a body dominating the range.
///
/// Returns `false` when the history is too short or the mean range is zero.
pub fn range_displacement(
    candles: &[Candle],
    index: usize,
    lookback: usize,
    multiplier: Decimal,
    body_threshold: Decimal,
) -> bool {
    if lookback == 0 || index < lookback || index >= candles.len() {
        return false;
    }

    let window = &candles[index - lookback..index];
    let avg_range = mean(window.iter().map(Candle::range), window.len());
    if avg_range.is_zero() {
        return false;
    }

    let candle = &candles[index];
    let range = candle.range();
    let body_ratio = if range.is_zero() {
        Decimal::ZERO
    } else {
        candle.body() / range
    };

    range > multiplier * avg_range && body_ratio > body_threshold
}

pub(crate) fn mean(values: impl Iterator<Item = Decimal>, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    values.sum::<Decimal>() / Decimal::from(count)
}
