use super::opportunity::{OpportunitySnapshot, grade_opportunity};
use super::setup::{Setup, SetupEvaluator};
use super::topdown::{TopDownEngine, TopDownSnapshot};
use crate::domain::errors::AnalysisError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::structure::state::StructureStateStore;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Candle series per timeframe for one symbol
pub type SymbolSeries = BTreeMap<Timeframe, Vec<Candle>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub topdown: TopDownSnapshot,
    pub opportunity: Option<OpportunitySnapshot>,
    pub setup: Option<Setup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub symbol: String,
    pub outcome: Result<ScanReport, AnalysisError>,
}

/// Runs the top-down pipeline for many symbols at once.
///
/// Each symbol owns a separate state store, so workers never touch the same
/// (symbol, timeframe) state and no locking is needed.
#[derive(Debug, Default)]
pub struct MarketScanner {
    topdown: TopDownEngine,
    setup: SetupEvaluator,
    stores: BTreeMap<String, StructureStateStore>,
}

impl MarketScanner {
    pub fn new(topdown: TopDownEngine, setup: SetupEvaluator) -> Self {
        Self {
            topdown,
            setup,
            stores: BTreeMap::new(),
        }
    }

    /// Analyse every symbol in parallel. Results come back sorted by symbol;
    /// a failing symbol never aborts the others.
    pub fn scan(&mut self, inputs: &BTreeMap<String, SymbolSeries>) -> Vec<ScanResult> {
        for symbol in inputs.keys() {
            self.stores.entry(symbol.clone()).or_default();
        }

        let topdown = &self.topdown;
        let setup = &self.setup;

        let mut results: Vec<ScanResult> = self
            .stores
            .par_iter_mut()
            .filter_map(|(symbol, store)| {
                let series = inputs.get(symbol)?;
                Some(ScanResult {
                    symbol: symbol.clone(),
                    outcome: scan_symbol(topdown, setup, symbol, series, store),
                })
            })
            .collect();
        results.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let failed = results.iter().filter(|r| r.outcome.is_err()).count();
        info!(symbols = results.len(), failed, "Scan complete");
        results
    }

    pub fn store(&self, symbol: &str) -> Option<&StructureStateStore> {
        self.stores.get(symbol)
    }

    /// Drop all remembered structure for a symbol
    pub fn reset_symbol(&mut self, symbol: &str) -> bool {
        self.stores.remove(symbol).is_some()
    }
}

fn scan_symbol(
    topdown: &TopDownEngine,
    setup: &SetupEvaluator,
    symbol: &str,
    series: &SymbolSeries,
    store: &mut StructureStateStore,
) -> Result<ScanReport, AnalysisError> {
    let snapshot = topdown.analyze(symbol, series, store).inspect_err(|e| {
        warn!(symbol, error = %e, "Top-down analysis failed");
    })?;

    let entry_candles = series
        .get(&setup.config().entry_timeframe)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let trade = setup.evaluate(&snapshot, entry_candles)?;

    Ok(ScanReport {
        opportunity: grade_opportunity(&snapshot),
        setup: trade,
        topdown: snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn flat_series(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                Candle::new(
                    i as i64 * 60_000,
                    dec!(1.2000),
                    dec!(1.2005),
                    dec!(1.1995),
                    dec!(1.2001),
                    dec!(1),
                )
            })
            .collect()
    }

    fn full_stack() -> SymbolSeries {
        Timeframe::top_down()
            .into_iter()
            .map(|tf| (tf, flat_series(40)))
            .collect()
    }

    #[test]
    fn test_failures_are_reported_per_symbol() {
        let mut partial = full_stack();
        partial.remove(&Timeframe::D1);

        let inputs = BTreeMap::from([
            ("GBPUSD".to_string(), full_stack()),
            ("EURUSD".to_string(), partial),
        ]);

        let mut scanner = MarketScanner::default();
        let results = scanner.scan(&inputs);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].symbol, "EURUSD");
        assert!(matches!(
            results[0].outcome,
            Err(AnalysisError::MissingTimeframe {
                timeframe: Timeframe::D1,
                ..
            })
        ));

        let report = results[1].outcome.as_ref().unwrap();
        assert_eq!(report.topdown.snapshots.len(), 4);
        assert!(report.opportunity.is_some());
    }

    #[test]
    fn test_each_symbol_keeps_its_own_store() {
        let inputs = BTreeMap::from([
            ("AUDUSD".to_string(), full_stack()),
            ("NZDUSD".to_string(), full_stack()),
        ]);

        let mut scanner = MarketScanner::default();
        scanner.scan(&inputs);

        assert_eq!(scanner.store("AUDUSD").map(|s| s.len()), Some(4));
        assert_eq!(scanner.store("NZDUSD").map(|s| s.len()), Some(4));
        assert!(scanner.reset_symbol("AUDUSD"));
        assert!(scanner.store("AUDUSD").is_none());
    }
}
