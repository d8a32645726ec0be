use super::swings::{highs, lows};
use super::types::{BosEvent, BosKind, Direction, StructureLabel, Swing, SwingKind};
use rust_decimal::Decimal;

/// Infer direction from the last four alternating swings.
///
/// Accepts High→Low→High→Low or Low→High→Low→High. Bullish when the later
/// high and low both exceed the earlier pair, bearish when both are lower,
/// neutral otherwise (including fewer than four swings).
pub fn classify_bias(swings: &[Swing], tolerance: Decimal) -> Direction {
    if swings.len() < 4 {
        tracing::debug!(swings = swings.len(), "Not enough swings to determine direction");
        return Direction::Neutral;
    }

    let cycle = &swings[swings.len() - 4..];
    let kinds = [cycle[0].kind, cycle[1].kind, cycle[2].kind, cycle[3].kind];

    let (prev_high, prev_low, last_high, last_low) = match kinds {
        [SwingKind::High, SwingKind::Low, SwingKind::High, SwingKind::Low] => {
            (cycle[0].price, cycle[1].price, cycle[2].price, cycle[3].price)
        }
        [SwingKind::Low, SwingKind::High, SwingKind::Low, SwingKind::High] => {
            (cycle[1].price, cycle[0].price, cycle[3].price, cycle[2].price)
        }
        _ => return Direction::Neutral,
    };

    let lower_slack = Decimal::ONE - tolerance;
    let upper_slack = Decimal::ONE + tolerance;

    if last_high > prev_high * lower_slack && last_low > prev_low * lower_slack {
        return Direction::Bullish;
    }
    if last_high < prev_high * upper_slack && last_low < prev_low * upper_slack {
        return Direction::Bearish;
    }

    Direction::Neutral
}

/// Structural momentum in `-2..=2` from the last three highs and lows.
pub fn momentum_score(swings: &[Swing]) -> i32 {
    let high_prices: Vec<Decimal> = highs(swings).iter().map(|s| s.price).collect();
    let low_prices: Vec<Decimal> = lows(swings).iter().map(|s| s.price).collect();

    progression(&high_prices) + progression(&low_prices)
}

fn progression(prices: &[Decimal]) -> i32 {
    if prices.len() < 3 {
        return 0;
    }
    let last = &prices[prices.len() - 3..];
    if last[0] < last[1] && last[1] < last[2] {
        1
    } else if last[0] > last[1] && last[1] > last[2] {
        -1
    } else {
        0
    }
}

/// Label the structure from committed bias, micro bias and the current BOS.
pub fn classify_state(
    external: Direction,
    internal: Direction,
    bos: Option<&BosEvent>,
) -> StructureLabel {
    let bos_kind = bos.map(|event| event.kind);

    match external {
        Direction::Bullish => {
            if bos_kind == Some(BosKind::BullishBos) {
                StructureLabel::BullishExpansion
            } else if internal == Direction::Bearish {
                StructureLabel::BullishCorrection
            } else {
                StructureLabel::BullishExpansion
            }
        }
        Direction::Bearish => {
            if bos_kind == Some(BosKind::BearishBos) {
                StructureLabel::BearishExpansion
            } else if internal == Direction::Bullish {
                StructureLabel::BearishCorrection
            } else {
                StructureLabel::BearishExpansion
            }
        }
        Direction::Neutral => {
            if internal.is_neutral() {
                StructureLabel::Distribution
            } else {
                StructureLabel::Transition
            }
        }
    }
}
