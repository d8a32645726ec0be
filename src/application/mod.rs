// Single-timeframe structure analysis
pub mod structure_engine;

// Multi-timeframe aggregation and trade scoring
pub mod opportunity;
pub mod setup;
pub mod topdown;

// Parallel multi-symbol runs
pub mod scanner;
