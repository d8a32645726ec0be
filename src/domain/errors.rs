use crate::domain::market::timeframe::Timeframe;
use thiserror::Error;

/// Errors that abort a single analysis call.
///
/// Short series, degenerate averages and missing confluence are not errors;
/// detectors express those as "no signal" in their return values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("No candles supplied for {symbol} on {timeframe}")]
    EmptySeries { symbol: String, timeframe: Timeframe },

    #[error("Top-down analysis of {symbol} requires a {timeframe} series")]
    MissingTimeframe { symbol: String, timeframe: Timeframe },
}

impl AnalysisError {
    pub fn missing_symbol() -> Self {
        AnalysisError::InvalidInput {
            reason: "symbol must be provided for per-symbol structure tracking".to_string(),
        }
    }
}
