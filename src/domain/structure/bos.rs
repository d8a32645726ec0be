use super::displacement::range_displacement;
use super::types::{BosEvent, BosKind, Swing, SwingKind};
use crate::domain::market::candle::Candle;
use crate::domain::market::tick_size::TickSizeTable;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BosConfig {
    /// Candles averaged for the range baseline
    pub lookback: usize,
    /// Decision candle range must exceed this multiple of the baseline
    pub displacement_multiplier: Decimal,
    /// Minimum body-to-range ratio of the decision candle
    pub body_threshold: Decimal,
    /// Ticks a close must clear beyond the swing
    pub tick_buffer: u32,
}

impl Default for BosConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            displacement_multiplier: dec!(1.5),
            body_threshold: dec!(0.6),
            tick_buffer: 2,
        }
    }
}

/// Detects a break of structure on the last fully closed candle.
///
/// The final row of the series is treated as the still-forming bar and is
/// never used for decisions.
#[derive(Debug, Clone, Default)]
pub struct BosDetector {
    config: BosConfig,
    ticks: TickSizeTable,
}

impl BosDetector {
    pub fn new(config: BosConfig, ticks: TickSizeTable) -> Self {
        Self { config, ticks }
    }

    pub fn config(&self) -> &BosConfig {
        &self.config
    }

    pub fn detect(&self, symbol: &str, candles: &[Candle], swings: &[Swing]) -> Option<BosEvent> {
        if swings.len() < 2 || candles.len() < self.config.lookback + 2 {
            return None;
        }

        let last_high = swings.iter().rev().find(|s| s.is_high())?;
        let last_low = swings.iter().rev().find(|s| s.is_low())?;

        let buffer = Decimal::from(self.config.tick_buffer) * self.ticks.tick_size(symbol);

        let decision_index = candles.len() - 2;
        let candle = &candles[decision_index];

        let displaced = range_displacement(
            candles,
            decision_index,
            self.config.lookback,
            self.config.displacement_multiplier,
            self.config.body_threshold,
        );
        if !displaced {
            return None;
        }

        if candle.close > last_high.price + buffer && candle.is_bullish() {
            tracing::debug!(
                symbol,
                level = %last_high.price,
                close = %candle.close,
                "Bullish break of structure"
            );
            return Some(BosEvent {
                kind: BosKind::BullishBos,
                broken_level: last_high.price,
                break_price: candle.close,
                candle_index: decision_index,
                timestamp: candle.timestamp,
            });
        }

        if candle.close < last_low.price - buffer && candle.is_bearish() {
            tracing::debug!(
                symbol,
                level = %last_low.price,
                close = %candle.close,
                "Bearish break of structure"
            );
            return Some(BosEvent {
                kind: BosKind::BearishBos,
                broken_level: last_low.price,
                break_price: candle.close,
                candle_index: decision_index,
                timestamp: candle.timestamp,
            });
        }

        None
    }
}

/// Compress swings after a BOS to `[protected swing, newest swing]`.
///
/// The protected swing is the last opposite swing before the broken one: the
/// last low before a broken high, the last high before a broken low. Swings
/// are returned unchanged when the broken level cannot be located.
pub fn compress_after_bos(swings: &[Swing], bos: &BosEvent) -> Vec<Swing> {
    if swings.len() < 2 {
        return swings.to_vec();
    }

    let broken_kind = match bos.kind {
        BosKind::BullishBos => SwingKind::High,
        BosKind::BearishBos => SwingKind::Low,
    };

    let Some(broken_index) = swings
        .iter()
        .rposition(|s| s.kind == broken_kind && s.price == bos.broken_level)
    else {
        return swings.to_vec();
    };

    let protected = swings[..broken_index]
        .iter()
        .rev()
        .find(|s| s.kind != broken_kind);

    match (protected, swings.last()) {
        (Some(protected), Some(newest)) => vec![protected.clone(), newest.clone()],
        _ => swings.to_vec(),
    }
}
