use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar. `timestamp` is the bar open time in Unix milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    pub fn new(
        timestamp: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// High-low span of the bar
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// Absolute open-close distance
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_candle_geometry() {
        let candle = Candle::new(0, dec!(1.1000), dec!(1.1050), dec!(1.0980), dec!(1.1040), dec!(10));
        assert_eq!(candle.range(), dec!(0.0070));
        assert_eq!(candle.body(), dec!(0.0040));
        assert!(candle.is_bullish());
        assert!(!candle.is_bearish());
    }

    #[test]
    fn test_doji_is_neither_direction() {
        let candle = Candle::new(0, dec!(100), dec!(101), dec!(99), dec!(100), dec!(1));
        assert_eq!(candle.body(), Decimal::ZERO);
        assert!(!candle.is_bullish());
        assert!(!candle.is_bearish());
    }
}
