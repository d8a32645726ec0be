use super::types::{LiquidityKind, LiquidityLevel};
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityConfig {
    /// Absolute price distance treated as "equal"
    pub tolerance: Decimal,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            tolerance: dec!(0.00025),
        }
    }
}

/// Resting liquidity for one timeframe: swing extremes, equal highs/lows and
/// whether later price has swept them.
#[derive(Debug, Clone)]
pub struct LiquidityEngine {
    timeframe: Timeframe,
    tolerance: Decimal,
}

impl LiquidityEngine {
    pub fn new(timeframe: Timeframe, config: LiquidityConfig) -> Self {
        Self {
            timeframe,
            tolerance: config.tolerance,
        }
    }

    pub fn detect(&self, candles: &[Candle]) -> Vec<LiquidityLevel> {
        let mut levels = self.swing_levels(candles);
        levels.extend(self.equal_levels(candles));
        self.detect_sweeps(candles, &mut levels);

        tracing::debug!(
            timeframe = %self.timeframe,
            levels = levels.len(),
            swept = levels.iter().filter(|l| l.swept).count(),
            "Liquidity mapped"
        );
        levels
    }

    /// Two-candle fractals: strictly beyond both direct neighbours.
    pub fn swing_levels(&self, candles: &[Candle]) -> Vec<LiquidityLevel> {
        let mut levels = Vec::new();
        if candles.len() < 5 {
            return levels;
        }

        for i in 2..candles.len() - 2 {
            let (prev, current, next) = (&candles[i - 1], &candles[i], &candles[i + 1]);

            if current.high > prev.high && current.high > next.high {
                levels.push(self.level(current.high, LiquidityKind::SwingHigh, [i]));
            }
            if current.low < prev.low && current.low < next.low {
                levels.push(self.level(current.low, LiquidityKind::SwingLow, [i]));
            }
        }

        levels
    }

    pub fn equal_levels(&self, candles: &[Candle]) -> Vec<LiquidityLevel> {
        let highs: Vec<Decimal> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<Decimal> = candles.iter().map(|c| c.low).collect();

        let mut levels = self.cluster_equal_prices(&highs, LiquidityKind::EqualHigh);
        levels.extend(self.cluster_equal_prices(&lows, LiquidityKind::EqualLow));
        levels
    }

    /// Left-to-right clustering against the seed price. Each unvisited index
    /// seeds a cluster; every later unvisited index within tolerance of the
    /// seed joins it. Clusters of two or more become one level at their mean
    /// price.
    pub fn cluster_equal_prices(&self, prices: &[Decimal], kind: LiquidityKind) -> Vec<LiquidityLevel> {
        let mut visited = vec![false; prices.len()];
        let mut levels = Vec::new();

        for seed in 0..prices.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;

            let mut members = vec![seed];
            for candidate in seed + 1..prices.len() {
                if !visited[candidate] && (prices[seed] - prices[candidate]).abs() <= self.tolerance {
                    visited[candidate] = true;
                    members.push(candidate);
                }
            }

            if members.len() >= 2 {
                let total: Decimal = members.iter().map(|&m| prices[m]).sum();
                let price = total / Decimal::from(members.len());
                levels.push(self.level(price, kind, members));
            }
        }

        levels
    }

    /// Mark levels swept by the first later candle trading beyond them.
    ///
    /// Only candles after the level's last forming index are scanned, and
    /// levels already swept are left untouched.
    pub fn detect_sweeps(&self, candles: &[Candle], levels: &mut [LiquidityLevel]) {
        for level in levels.iter_mut().filter(|l| !l.swept) {
            let start = level.formation_index() + 1;

            let swept_at = candles.iter().enumerate().skip(start).find_map(|(i, c)| {
                let beyond = if level.kind.is_buy_side() {
                    c.high > level.price + self.tolerance
                } else {
                    c.low < level.price - self.tolerance
                };
                beyond.then_some(i)
            });

            if let Some(index) = swept_at {
                level.swept = true;
                level.swept_at_index = Some(index);
            }
        }
    }

    fn level(
        &self,
        price: Decimal,
        kind: LiquidityKind,
        indices: impl IntoIterator<Item = usize>,
    ) -> LiquidityLevel {
        let forming: BTreeSet<usize> = indices.into_iter().collect();
        LiquidityLevel::new(price, kind, self.timeframe, forming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(i: usize, high: Decimal, low: Decimal) -> Candle {
        Candle::new(i as i64, low, high, low, high, dec!(1))
    }

    fn engine(tolerance: Decimal) -> LiquidityEngine {
        LiquidityEngine::new(Timeframe::M15, LiquidityConfig { tolerance })
    }

    #[test]
    fn test_equal_highs_cluster_and_sweep() {
        let candles = vec![
            bar(0, dec!(1.1000), dec!(1.0950)),
            bar(1, dec!(1.1050), dec!(1.0990)),
            bar(2, dec!(1.1020), dec!(1.0960)),
            bar(3, dec!(1.1051), dec!(1.0970)),
            bar(4, dec!(1.1030), dec!(1.0940)),
            bar(5, dec!(1.1060), dec!(1.0980)),
        ];
        let engine = engine(dec!(0.0002));

        let mut levels: Vec<LiquidityLevel> = engine
            .equal_levels(&candles)
            .into_iter()
            .filter(|l| l.kind == LiquidityKind::EqualHigh)
            .collect();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].price, dec!(1.10505));
        assert_eq!(levels[0].forming_indices, BTreeSet::from([1, 3]));

        engine.detect_sweeps(&candles, &mut levels);
        assert!(levels[0].swept);
        assert_eq!(levels[0].swept_at_index, Some(5));
    }

    #[test]
    fn test_members_are_measured_against_the_seed() {
        let engine = engine(dec!(1));
        // 12 is within tolerance of 11 but not of the seed 10
        let prices = [dec!(10), dec!(12), dec!(11), dec!(20), dec!(12.5)];
        let levels = engine.cluster_equal_prices(&prices, LiquidityKind::EqualLow);

        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].forming_indices, BTreeSet::from([0, 2]));
        assert_eq!(levels[0].price, dec!(10.5));
        assert_eq!(levels[1].forming_indices, BTreeSet::from([1, 4]));
        assert_eq!(levels[1].price, dec!(12.25));
    }

    #[test]
    fn test_slow_grind_does_not_chain_into_one_level() {
        let tolerance = dec!(0.0002);
        let engine = engine(tolerance);
        let prices: Vec<Decimal> = (0..20)
            .map(|i| dec!(1.1000) + dec!(0.00015) * Decimal::from(i))
            .collect();

        let levels = engine.cluster_equal_prices(&prices, LiquidityKind::EqualHigh);
        assert_eq!(levels.len(), 10);
        for level in &levels {
            let member_prices: Vec<Decimal> = level.forming_indices.iter().map(|&i| prices[i]).collect();
            let span = member_prices.iter().max().unwrap() - member_prices.iter().min().unwrap();
            assert!(span <= tolerance, "span {} exceeds tolerance", span);
        }
    }

    #[test]
    fn test_singletons_are_not_levels() {
        let engine = engine(dec!(0.5));
        let prices = [dec!(1), dec!(3), dec!(5)];
        assert!(engine.cluster_equal_prices(&prices, LiquidityKind::EqualHigh).is_empty());
    }

    #[test]
    fn test_swing_levels_need_two_candles_each_side() {
        let candles = vec![
            bar(0, dec!(10), dec!(8)),
            bar(1, dec!(11), dec!(9)),
            bar(2, dec!(13), dec!(7)),
            bar(3, dec!(12), dec!(9)),
            bar(4, dec!(11), dec!(8)),
        ];
        let levels = engine(dec!(0.0001)).swing_levels(&candles);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].kind, LiquidityKind::SwingHigh);
        assert_eq!(levels[0].price, dec!(13));
        assert_eq!(levels[1].kind, LiquidityKind::SwingLow);
        assert_eq!(levels[1].price, dec!(7));

        assert!(engine(dec!(0.0001)).swing_levels(&candles[..4]).is_empty());
    }

    #[test]
    fn test_sell_side_sweep_respects_tolerance() {
        let candles = vec![
            bar(0, dec!(10), dec!(8)),
            bar(1, dec!(10), dec!(7.95)),
            bar(2, dec!(10), dec!(7.5)),
        ];
        let engine = engine(dec!(0.1));
        let mut levels = vec![LiquidityLevel::new(
            dec!(8),
            LiquidityKind::SwingLow,
            Timeframe::M15,
            BTreeSet::from([0]),
        )];

        engine.detect_sweeps(&candles, &mut levels);
        // 7.95 stays inside tolerance; 7.5 sweeps
        assert_eq!(levels[0].swept_at_index, Some(2));
    }

    #[test]
    fn test_swept_index_after_formation() {
        let candles: Vec<Candle> = (0..30)
            .map(|i| {
                let wave = Decimal::from((i * 7) % 11);
                bar(i, dec!(100) + wave, dec!(95) + wave)
            })
            .collect();

        for level in engine(dec!(0.5)).detect(&candles) {
            if let Some(swept_at) = level.swept_at_index {
                assert!(swept_at > level.formation_index());
            }
        }
    }

    #[test]
    fn test_already_swept_levels_untouched() {
        let candles = vec![bar(0, dec!(10), dec!(8)), bar(1, dec!(20), dec!(8))];
        let mut level = LiquidityLevel::new(
            dec!(10),
            LiquidityKind::SwingHigh,
            Timeframe::H1,
            BTreeSet::from([0]),
        );
        level.swept = true;
        level.swept_at_index = Some(7);

        let mut levels = vec![level];
        engine(dec!(0.1)).detect_sweeps(&candles, &mut levels);
        assert_eq!(levels[0].swept_at_index, Some(7));
    }
}
