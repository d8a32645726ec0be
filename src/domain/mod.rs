// Price series and symbol metadata
pub mod market;

// Swings, bias, BOS, zones and liquidity
pub mod structure;

// Domain-specific error types
pub mod errors;
