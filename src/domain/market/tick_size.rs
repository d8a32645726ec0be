use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Resolves the minimum meaningful price step ("pip") for a symbol.
///
/// Explicit overrides win; otherwise the step is inferred from the symbol
/// name using the usual FX conventions.
#[derive(Debug, Clone, Default)]
pub struct TickSizeTable {
    overrides: HashMap<String, Decimal>,
}

impl TickSizeTable {
    const DEFAULT_TICK: Decimal = dec!(0.0001);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: HashMap<String, Decimal>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(symbol, size)| (symbol.to_uppercase(), size))
            .collect();
        Self { overrides }
    }

    pub fn set(&mut self, symbol: &str, size: Decimal) {
        self.overrides.insert(symbol.to_uppercase(), size);
    }

    pub fn tick_size(&self, symbol: &str) -> Decimal {
        let key = symbol.to_uppercase();
        if let Some(size) = self.overrides.get(&key) {
            return *size;
        }

        if key.contains("JPY") {
            dec!(0.01)
        } else if key.starts_with("XAU") {
            dec!(0.1)
        } else if key.starts_with("XAG") {
            dec!(0.01)
        } else {
            Self::DEFAULT_TICK
        }
    }

    /// Pip size from the broker's quote precision (number of decimal digits).
    pub fn from_digits(digits: u32) -> Decimal {
        match digits {
            5 => dec!(0.0001),
            3 => dec!(0.01),
            2 => dec!(0.1),
            d => Decimal::new(1, d.min(28)),
        }
    }
}
