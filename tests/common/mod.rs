#![allow(dead_code)]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use rustructure::application::scanner::SymbolSeries;
use rustructure::domain::market::candle::Candle;
use rustructure::domain::market::timeframe::Timeframe;
use std::fmt::Write;

const BAR_MILLIS: i64 = 900_000;

/// Ten steps with the trend, six against it, repeated `cycles` times.
/// `direction` is +1 for a rising market and -1 for a falling one.
pub fn zigzag(cycles: usize, direction: i64, start: Decimal) -> Vec<Candle> {
    let step = dec!(0.0010) * Decimal::from(direction);
    let wick = dec!(0.0002);
    let mut price = start;
    let mut candles = Vec::new();

    for _ in 0..cycles {
        for delta in std::iter::repeat_n(step, 10).chain(std::iter::repeat_n(-step, 6)) {
            let open = price;
            price += delta;
            let index = candles.len() as i64;
            candles.push(Candle::new(
                index * BAR_MILLIS,
                open,
                open.max(price) + wick,
                open.min(price) - wick,
                price,
                dec!(100),
            ));
        }
    }
    candles
}

pub fn rising() -> Vec<Candle> {
    zigzag(6, 1, dec!(1.1000))
}

pub fn falling() -> Vec<Candle> {
    zigzag(6, -1, dec!(1.2000))
}

/// Same series on W1, D1, H4 and M15
pub fn full_stack(candles: &[Candle]) -> SymbolSeries {
    Timeframe::top_down()
        .into_iter()
        .map(|tf| (tf, candles.to_vec()))
        .collect()
}

pub fn to_csv(candles: &[Candle]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for c in candles {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            c.timestamp, c.open, c.high, c.low, c.close, c.volume
        );
    }
    out
}
