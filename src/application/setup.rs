use super::topdown::TopDownSnapshot;
use crate::domain::errors::AnalysisError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::structure::displacement::mean;
use crate::domain::structure::types::{Direction, LiquidityLevel, StructureSnapshot, Zone};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const MAX_CONFLUENCE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Timeframe whose zones and liquidity define the trade
    pub entry_timeframe: Timeframe,
    /// Candles in the high-low volatility average
    pub atr_period: usize,
    pub stop_atr_multiplier: Decimal,
    pub target_atr_multiplier: Decimal,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            entry_timeframe: Timeframe::M15,
            atr_period: 14,
            stop_atr_multiplier: dec!(1.5),
            target_atr_multiplier: dec!(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    pub symbol: String,
    pub direction: Direction,
    pub entry_timeframe: Timeframe,
    pub entry: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub risk_reward: Decimal,
    /// 0-100
    pub confidence_score: Decimal,
}

/// Turns an aligned top-down view into an entry, stop and target.
#[derive(Debug, Clone, Default)]
pub struct SetupEvaluator {
    config: SetupConfig,
}

impl SetupEvaluator {
    pub fn new(config: SetupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    /// `Ok(None)` when there is no qualifying confluence.
    pub fn evaluate(
        &self,
        topdown: &TopDownSnapshot,
        entry_candles: &[Candle],
    ) -> Result<Option<Setup>, AnalysisError> {
        let symbol = topdown.symbol.as_str();
        let entry_timeframe = self.config.entry_timeframe;

        if !topdown.is_aligned || topdown.macro_bias.is_neutral() {
            debug!(symbol, alignment = topdown.alignment_score, "No setup: timeframes not aligned");
            return Ok(None);
        }
        let direction = topdown.macro_bias;

        let entry_snapshot =
            topdown
                .snapshot(entry_timeframe)
                .ok_or_else(|| AnalysisError::MissingTimeframe {
                    symbol: symbol.to_string(),
                    timeframe: entry_timeframe,
                })?;

        if entry_snapshot.bias.external != direction {
            debug!(
                symbol,
                macro_bias = %direction,
                entry_bias = %entry_snapshot.bias.external,
                "No setup: entry timeframe disagrees with macro bias"
            );
            return Ok(None);
        }

        if entry_candles.is_empty() {
            return Err(AnalysisError::EmptySeries {
                symbol: symbol.to_string(),
                timeframe: entry_timeframe,
            });
        }

        let zones: Vec<&Zone> = entry_snapshot
            .zones
            .iter()
            .filter(|z| z.favours(direction))
            .collect();
        let levels: Vec<&LiquidityLevel> = entry_snapshot
            .liquidity_levels
            .iter()
            .filter(|l| !l.swept && resting_against(l, direction))
            .collect();

        let Some(entry) = entry_price(direction, &zones, &levels) else {
            debug!(symbol, "No setup: no zone or liquidity confluence");
            return Ok(None);
        };

        let atr = average_range(entry_candles, self.config.atr_period);
        let stop_distance = atr * self.config.stop_atr_multiplier;
        let target_distance = atr * self.config.target_atr_multiplier;

        let all_levels = &entry_snapshot.liquidity_levels;
        let (stop_loss, take_profit) = match direction {
            Direction::Bullish => {
                let stop = zones
                    .iter()
                    .map(|z| z.distal)
                    .fold(entry - stop_distance, Decimal::min);
                let target = all_levels
                    .iter()
                    .map(|l| l.price)
                    .filter(|p| *p > entry)
                    .fold(entry + target_distance, Decimal::max);
                (stop, target)
            }
            _ => {
                let stop = zones
                    .iter()
                    .map(|z| z.distal)
                    .fold(entry + stop_distance, Decimal::max);
                let target = all_levels
                    .iter()
                    .map(|l| l.price)
                    .filter(|p| *p < entry)
                    .fold(entry - target_distance, Decimal::min);
                (stop, target)
            }
        };

        let risk = (entry - stop_loss).abs();
        if risk.is_zero() {
            debug!(symbol, "No setup: zero risk distance");
            return Ok(None);
        }
        let risk_reward = ((take_profit - entry).abs() / risk).round_dp(2);

        let confidence_score = confidence(
            topdown.alignment_score,
            entry_snapshot,
            direction,
            zones.len(),
            levels.len(),
        );

        info!(
            symbol,
            %direction,
            %entry,
            %stop_loss,
            %take_profit,
            %risk_reward,
            %confidence_score,
            "Setup found"
        );

        Ok(Some(Setup {
            symbol: symbol.to_string(),
            direction,
            entry_timeframe,
            entry,
            stop_loss,
            take_profit,
            risk_reward,
            confidence_score,
        }))
    }
}

/// Liquidity resting on the opposite side of the trade: lows for longs,
/// highs for shorts.
fn resting_against(level: &LiquidityLevel, direction: Direction) -> bool {
    match direction {
        Direction::Bullish => level.kind.is_sell_side(),
        Direction::Bearish => level.kind.is_buy_side(),
        Direction::Neutral => false,
    }
}

fn entry_price(direction: Direction, zones: &[&Zone], levels: &[&LiquidityLevel]) -> Option<Decimal> {
    let prices = levels.iter().map(|l| l.price);
    let from_levels = match direction {
        Direction::Bullish => prices.min(),
        _ => prices.max(),
    };
    if from_levels.is_some() {
        return from_levels;
    }

    if zones.is_empty() {
        return None;
    }
    Some(mean(zones.iter().map(|z| z.midpoint()), zones.len()))
}

/// Mean high-low range over the last `period` candles, or all of them when
/// fewer are available.
pub fn average_range(candles: &[Candle], period: usize) -> Decimal {
    let window = &candles[candles.len().saturating_sub(period.max(1))..];
    mean(window.iter().map(Candle::range), window.len())
}

fn confidence(
    alignment_score: u32,
    entry: &StructureSnapshot,
    direction: Direction,
    zones: usize,
    levels: usize,
) -> Decimal {
    let alignment = Decimal::from(alignment_score) / dec!(100) * dec!(40);

    let mut structure = Decimal::ZERO;
    if entry.bias.external == direction {
        structure += dec!(10);
    }
    if entry.state.is_expansion() {
        structure += dec!(5);
    }
    if entry.momentum.abs() > 1 {
        structure += dec!(5);
    }
    let structure = structure.min(dec!(20));

    let max = Decimal::from(MAX_CONFLUENCE);
    let zone_score = Decimal::from(zones.min(MAX_CONFLUENCE)) / max * dec!(20);
    let level_score = Decimal::from(levels.min(MAX_CONFLUENCE)) / max * dec!(20);

    (alignment + structure + zone_score + level_score)
        .min(dec!(100))
        .round_dp(2)
}
