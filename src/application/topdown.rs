use super::structure_engine::StructureEngine;
use crate::domain::errors::AnalysisError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::structure::state::StructureStateStore;
use crate::domain::structure::types::{Direction, StructureSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopDownConfig {
    /// Timeframes to analyse and the weight each contributes to alignment
    pub weights: BTreeMap<Timeframe, u32>,
    /// Winning-side weight required for `is_aligned`
    pub alignment_threshold: u32,
}

impl Default for TopDownConfig {
    fn default() -> Self {
        Self {
            weights: BTreeMap::from([
                (Timeframe::W1, 40),
                (Timeframe::D1, 30),
                (Timeframe::H4, 20),
                (Timeframe::M15, 10),
            ]),
            alignment_threshold: 70,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopDownSnapshot {
    pub symbol: String,
    pub macro_bias: Direction,
    pub alignment_score: u32,
    pub total_score: i32,
    pub is_aligned: bool,
    pub snapshots: BTreeMap<Timeframe, StructureSnapshot>,
}

impl TopDownSnapshot {
    pub fn snapshot(&self, timeframe: Timeframe) -> Option<&StructureSnapshot> {
        self.snapshots.get(&timeframe)
    }
}

/// Weighs structure across timeframes. Each timeframe keeps its own state
/// entry in the store.
#[derive(Debug, Clone, Default)]
pub struct TopDownEngine {
    config: TopDownConfig,
    structure: StructureEngine,
}

impl TopDownEngine {
    pub fn new(config: TopDownConfig, structure: StructureEngine) -> Self {
        Self { config, structure }
    }

    pub fn config(&self) -> &TopDownConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        symbol: &str,
        series: &BTreeMap<Timeframe, Vec<Candle>>,
        store: &mut StructureStateStore,
    ) -> Result<TopDownSnapshot, AnalysisError> {
        let mut snapshots = BTreeMap::new();

        for &timeframe in self.config.weights.keys() {
            let candles = series
                .get(&timeframe)
                .ok_or_else(|| AnalysisError::MissingTimeframe {
                    symbol: symbol.to_string(),
                    timeframe,
                })?;
            let snapshot = self.structure.analyze(symbol, timeframe, candles, store)?;
            snapshots.insert(timeframe, snapshot);
        }

        Ok(self.aggregate(symbol, snapshots))
    }

    /// Combine per-timeframe snapshots into one weighted view.
    ///
    /// Only configured timeframes are weighted; others are carried along.
    pub fn aggregate(
        &self,
        symbol: &str,
        snapshots: BTreeMap<Timeframe, StructureSnapshot>,
    ) -> TopDownSnapshot {
        let mut bullish = 0u32;
        let mut bearish = 0u32;
        let mut total_score = 0i32;

        for (timeframe, &weight) in &self.config.weights {
            let Some(snapshot) = snapshots.get(timeframe) else {
                continue;
            };

            match snapshot.bias.external {
                Direction::Bullish => bullish = bullish.saturating_add(weight),
                Direction::Bearish => bearish = bearish.saturating_add(weight),
                Direction::Neutral => {}
            }
            total_score = total_score.saturating_add(timeframe_score(snapshot, weight));
        }

        let macro_bias = if bullish > bearish {
            Direction::Bullish
        } else if bearish > bullish {
            Direction::Bearish
        } else {
            Direction::Neutral
        };
        let alignment_score = bullish.max(bearish);
        let is_aligned = alignment_score >= self.config.alignment_threshold;

        debug!(
            symbol,
            %macro_bias,
            alignment_score,
            total_score,
            is_aligned,
            "Top-down aggregated"
        );

        TopDownSnapshot {
            symbol: symbol.to_string(),
            macro_bias,
            alignment_score,
            total_score,
            is_aligned,
            snapshots,
        }
    }
}

fn timeframe_score(snapshot: &StructureSnapshot, weight: u32) -> i32 {
    let mut score = 0i32;
    if !snapshot.bias.external.is_neutral() {
        score = i32::try_from(weight).unwrap_or(i32::MAX);
    }
    score = score.saturating_add(snapshot.momentum.clamp(-2, 2) * 2);
    if snapshot.state.is_expansion() {
        score = score.saturating_add(3);
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::structure::types::{Bias, PriceRange, StructureLabel};
    use rust_decimal_macros::dec;

    fn snapshot(timeframe: Timeframe, external: Direction, state: StructureLabel, momentum: i32) -> StructureSnapshot {
        StructureSnapshot {
            symbol: "EURUSD".to_string(),
            timeframe,
            bias: Bias {
                external,
                internal: external,
            },
            state,
            bos: None,
            momentum,
            external_swings: Vec::new(),
            internal_swings: Vec::new(),
            current_price: dec!(1.1000),
            range: PriceRange::new(dec!(1.0900), dec!(1.1100)),
            zones: Vec::new(),
            liquidity_levels: Vec::new(),
            awaiting_pullback: false,
        }
    }

    #[test]
    fn test_all_bullish_is_fully_aligned() {
        let engine = TopDownEngine::default();
        let snapshots = Timeframe::top_down()
            .into_iter()
            .map(|tf| (tf, snapshot(tf, Direction::Bullish, StructureLabel::BullishCorrection, 0)))
            .collect();

        let topdown = engine.aggregate("EURUSD", snapshots);
        assert_eq!(topdown.alignment_score, 100);
        assert!(topdown.is_aligned);
        assert_eq!(topdown.macro_bias, Direction::Bullish);
        assert_eq!(topdown.total_score, 100);
    }

    #[test]
    fn test_split_weights_pick_larger_side() {
        let engine = TopDownEngine::default();
        let snapshots = BTreeMap::from([
            (Timeframe::W1, snapshot(Timeframe::W1, Direction::Bearish, StructureLabel::BearishExpansion, -2)),
            (Timeframe::D1, snapshot(Timeframe::D1, Direction::Bullish, StructureLabel::BullishCorrection, 1)),
            (Timeframe::H4, snapshot(Timeframe::H4, Direction::Bullish, StructureLabel::BullishExpansion, 5)),
            (Timeframe::M15, snapshot(Timeframe::M15, Direction::Neutral, StructureLabel::Distribution, 0)),
        ]);

        let topdown = engine.aggregate("EURUSD", snapshots);
        assert_eq!(topdown.macro_bias, Direction::Bullish);
        assert_eq!(topdown.alignment_score, 50);
        assert!(!topdown.is_aligned);
        // W1: 40 - 4 + 3, D1: 30 + 2, H4: 20 + 4 + 3, M15: 0
        assert_eq!(topdown.total_score, 39 + 32 + 27);
    }

    #[test]
    fn test_tie_is_neutral() {
        let engine = TopDownEngine::new(
            TopDownConfig {
                weights: BTreeMap::from([(Timeframe::H4, 50), (Timeframe::H1, 50)]),
                alignment_threshold: 70,
            },
            StructureEngine::default(),
        );
        let snapshots = BTreeMap::from([
            (Timeframe::H4, snapshot(Timeframe::H4, Direction::Bullish, StructureLabel::BullishExpansion, 0)),
            (Timeframe::H1, snapshot(Timeframe::H1, Direction::Bearish, StructureLabel::BearishExpansion, 0)),
        ]);

        let topdown = engine.aggregate("EURUSD", snapshots);
        assert_eq!(topdown.macro_bias, Direction::Neutral);
        assert_eq!(topdown.alignment_score, 50);
    }

    #[test]
    fn test_huge_weights_saturate() {
        let engine = TopDownEngine::new(
            TopDownConfig {
                weights: BTreeMap::from([(Timeframe::D1, u32::MAX), (Timeframe::H4, u32::MAX)]),
                alignment_threshold: 70,
            },
            StructureEngine::default(),
        );
        let snapshots = BTreeMap::from([
            (Timeframe::D1, snapshot(Timeframe::D1, Direction::Bullish, StructureLabel::BullishExpansion, 2)),
            (Timeframe::H4, snapshot(Timeframe::H4, Direction::Bullish, StructureLabel::BullishExpansion, 2)),
        ]);

        let topdown = engine.aggregate("EURUSD", snapshots);
        assert_eq!(topdown.alignment_score, u32::MAX);
        assert_eq!(topdown.total_score, i32::MAX);
        assert_eq!(topdown.macro_bias, Direction::Bullish);
        assert!(topdown.is_aligned);
    }

    #[test]
    fn test_missing_timeframe_is_an_error() {
        let engine = TopDownEngine::default();
        let mut store = StructureStateStore::new();
        let series = BTreeMap::from([(Timeframe::W1, Vec::new())]);

        let err = engine.analyze("EURUSD", &series, &mut store).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingTimeframe { .. }));
    }
}
