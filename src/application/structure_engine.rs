use crate::domain::errors::AnalysisError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::structure::bias::{classify_bias, classify_state, momentum_score};
use crate::domain::structure::bos::{BosDetector, compress_after_bos};
use crate::domain::structure::liquidity::{LiquidityConfig, LiquidityEngine};
use crate::domain::structure::state::{BosTransition, StructureStateStore};
use crate::domain::structure::swings::{build_external_structure, enforce_alternation, find_swings};
use crate::domain::structure::types::{Bias, PriceRange, StructureSnapshot};
use crate::domain::structure::zones::ZoneDetector;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Micro swing lookback
    pub internal_lookback: usize,
    /// Macro swing lookback, also the window of the reported price range
    pub external_lookback: usize,
    /// Fractional tolerance for swing and bias comparisons
    pub tolerance: Decimal,
    /// Reduce macro swings to protected legs before alternation
    pub protected_external: bool,
    /// Compress internal swings to [protected, newest] after a BOS
    pub compress_on_bos: bool,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            internal_lookback: 3,
            external_lookback: 7,
            tolerance: dec!(0.00005),
            protected_external: false,
            compress_on_bos: true,
        }
    }
}

/// Runs every structure detector over one (symbol, timeframe) series and
/// advances that key's pullback state.
#[derive(Debug, Clone, Default)]
pub struct StructureEngine {
    config: StructureConfig,
    bos: BosDetector,
    zones: ZoneDetector,
    liquidity: LiquidityConfig,
}

impl StructureEngine {
    pub fn new(
        config: StructureConfig,
        bos: BosDetector,
        zones: ZoneDetector,
        liquidity: LiquidityConfig,
    ) -> Self {
        Self {
            config,
            bos,
            zones,
            liquidity,
        }
    }

    pub fn config(&self) -> &StructureConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Candle],
        store: &mut StructureStateStore,
    ) -> Result<StructureSnapshot, AnalysisError> {
        if symbol.trim().is_empty() {
            warn!(%timeframe, "Structure analysis requested without a symbol");
            return Err(AnalysisError::missing_symbol());
        }
        let Some(last) = candles.last() else {
            warn!(symbol, %timeframe, "Structure analysis requested on an empty series");
            return Err(AnalysisError::EmptySeries {
                symbol: symbol.to_string(),
                timeframe,
            });
        };

        let tolerance = self.config.tolerance;

        let raw_external = find_swings(candles, self.config.external_lookback, tolerance);
        let external_swings = if self.config.protected_external {
            enforce_alternation(&build_external_structure(&raw_external))
        } else {
            enforce_alternation(&raw_external)
        };
        let structural_bias = classify_bias(&external_swings, tolerance);

        let mut internal_swings =
            enforce_alternation(&find_swings(candles, self.config.internal_lookback, tolerance));
        let internal_bias = classify_bias(&internal_swings, tolerance);

        let bos = self.bos.detect(symbol, candles, &internal_swings);
        if let Some(event) = bos.as_ref().filter(|_| self.config.compress_on_bos) {
            internal_swings = compress_after_bos(&internal_swings, event);
        }
        let momentum = momentum_score(&internal_swings);

        let state = store.entry(symbol, timeframe)?;
        let first_pass = !state.is_initialized();
        state.initialize(structural_bias);
        let previous_bias = state.committed_bias();

        if let Some(event) = &bos {
            let transition = state.register_bos(event);
            debug!(symbol, %timeframe, kind = %event.kind, ?transition, "BOS registered");
            if let BosTransition::Confirmed(direction) = transition {
                info!(symbol, %timeframe, %direction, "Bias committed on continuation break");
            }
        }

        let closed = candles.len().checked_sub(2).map(|i| &candles[i]);
        if let Some(direction) = closed.and_then(|c| state.confirm_pullback(c, internal_bias)) {
            info!(symbol, %timeframe, %direction, "Bias committed on pullback");
        }

        let committed = state.committed_bias();
        if !first_pass && committed != previous_bias {
            info!(symbol, %timeframe, from = %previous_bias, to = %committed, "Structural bias flipped");
        }
        let awaiting_pullback = state.awaiting_pullback();

        let label = classify_state(committed, internal_bias, bos.as_ref());

        let window = &candles[candles.len().saturating_sub(self.config.external_lookback.max(1))..];
        let high = window.iter().map(|c| c.high).max().unwrap_or(last.high);
        let low = window.iter().map(|c| c.low).min().unwrap_or(last.low);

        let zones = self.zones.detect(candles, bos.as_ref());
        let liquidity_levels = LiquidityEngine::new(timeframe, self.liquidity).detect(candles);

        debug!(
            symbol,
            %timeframe,
            external = %committed,
            internal = %internal_bias,
            state = %label,
            momentum,
            "Structure analysed"
        );

        Ok(StructureSnapshot {
            symbol: symbol.to_string(),
            timeframe,
            bias: Bias {
                external: committed,
                internal: internal_bias,
            },
            state: label,
            bos,
            momentum,
            external_swings,
            internal_swings,
            current_price: last.close,
            range: PriceRange::new(low, high),
            zones,
            liquidity_levels,
            awaiting_pullback,
        })
    }
}
