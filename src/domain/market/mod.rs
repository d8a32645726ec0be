// Market data primitives
pub mod candle;
pub mod tick_size;
pub mod timeframe;
