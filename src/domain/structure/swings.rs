use super::types::{Direction, Swing, SwingKind};
use crate::domain::market::candle::Candle;
use rust_decimal::Decimal;

/// Detect swing highs and lows with a symmetric lookback window.
///
/// Candle `i` is a swing high when its high is at least every high within
/// `lookback` candles on either side, each scaled by `(1 - tolerance)`; swing
/// lows mirror this with `(1 + tolerance)`. One candle may yield both kinds,
/// in which case the high is emitted first.
pub fn find_swings(candles: &[Candle], lookback: usize, tolerance: Decimal) -> Vec<Swing> {
    let mut swings = Vec::new();
    if lookback == 0 || candles.len() <= 2 * lookback {
        return swings;
    }

    let high_floor = Decimal::ONE - tolerance;
    let low_ceiling = Decimal::ONE + tolerance;

    for i in lookback..candles.len() - lookback {
        let current = &candles[i];
        let neighbours = candles[i - lookback..i]
            .iter()
            .chain(candles[i + 1..=i + lookback].iter());

        let (mut is_high, mut is_low) = (true, true);
        for other in neighbours {
            if current.high < other.high * high_floor {
                is_high = false;
            }
            if current.low > other.low * low_ceiling {
                is_low = false;
            }
            if !is_high && !is_low {
                break;
            }
        }

        if is_high {
            swings.push(Swing::high(current.timestamp, i, current.high));
        }
        if is_low {
            swings.push(Swing::low(current.timestamp, i, current.low));
        }
    }

    swings
}

/// Enforce strict high/low alternation.
///
/// Consecutive swings of the same kind collapse to the most extreme one
/// (higher high, lower low); on a tie the earlier swing is kept.
pub fn enforce_alternation(swings: &[Swing]) -> Vec<Swing> {
    let mut cleaned: Vec<Swing> = Vec::with_capacity(swings.len());

    for swing in swings {
        match cleaned.last_mut() {
            Some(last) if last.kind == swing.kind => {
                let more_extreme = match swing.kind {
                    SwingKind::High => swing.price > last.price,
                    SwingKind::Low => swing.price < last.price,
                };
                if more_extreme {
                    *last = swing.clone();
                }
            }
            _ => cleaned.push(swing.clone()),
        }
    }

    cleaned
}

/// Reduce raw macro swings to the protected external leg sequence.
///
/// Seeded with the first two swings. While bullish only a higher high extends
/// the structure, and a low below the protected low flips it bearish; the
/// bearish side mirrors this. Everything else is internal noise and dropped.
pub fn build_external_structure(swings: &[Swing]) -> Vec<Swing> {
    if swings.len() < 2 {
        return swings.to_vec();
    }

    let mut external: Vec<Swing> = vec![swings[0].clone(), swings[1].clone()];
    let (mut leg, mut protected) = if swings[0].is_low() && swings[1].is_high() {
        (Direction::Bullish, swings[0].price)
    } else {
        (Direction::Bearish, swings[0].price)
    };

    for swing in &swings[2..] {
        let extreme = external
            .iter()
            .rev()
            .find(|s| s.kind == swing.kind)
            .map(|s| s.price);

        match leg {
            Direction::Bullish => {
                if swing.is_high() && extreme.is_none_or(|p| swing.price > p) {
                    if let Some(low) = last_price_of(&external, SwingKind::Low) {
                        protected = low;
                    }
                    external.push(swing.clone());
                } else if swing.is_low() && swing.price < protected {
                    if let Some(high) = last_price_of(&external, SwingKind::High) {
                        protected = high;
                    }
                    external.push(swing.clone());
                    leg = Direction::Bearish;
                }
            }
            _ => {
                if swing.is_low() && extreme.is_none_or(|p| swing.price < p) {
                    if let Some(high) = last_price_of(&external, SwingKind::High) {
                        protected = high;
                    }
                    external.push(swing.clone());
                } else if swing.is_high() && swing.price > protected {
                    if let Some(low) = last_price_of(&external, SwingKind::Low) {
                        protected = low;
                    }
                    external.push(swing.clone());
                    leg = Direction::Bullish;
                }
            }
        }
    }

    external
}

fn last_price_of(swings: &[Swing], kind: SwingKind) -> Option<Decimal> {
    swings.iter().rev().find(|s| s.kind == kind).map(|s| s.price)
}

/// Swing highs of an alternating sequence, oldest first
pub fn highs(swings: &[Swing]) -> Vec<&Swing> {
    swings.iter().filter(|s| s.is_high()).collect()
}

/// Swing lows of an alternating sequence, oldest first
pub fn lows(swings: &[Swing]) -> Vec<&Swing> {
    swings.iter().filter(|s| s.is_low()).collect()
}
