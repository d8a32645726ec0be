//! Candle series from CSV files.
//!
//! Expected header: `timestamp,open,high,low,close[,volume]`. Timestamps may
//! be Unix milliseconds, RFC 3339, `%Y-%m-%d %H:%M:%S` or `%Y-%m-%d` (UTC).

use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct CandleRecord {
    timestamp: String,
    open: String,
    high: String,
    low: String,
    close: String,
    #[serde(default)]
    volume: Option<String>,
}

impl CandleRecord {
    fn into_candle(self) -> Result<Candle> {
        let volume = match self.volume.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => parse_price("volume", v)?,
            _ => Decimal::ZERO,
        };

        Ok(Candle::new(
            parse_timestamp(&self.timestamp)?,
            parse_price("open", &self.open)?,
            parse_price("high", &self.high)?,
            parse_price("low", &self.low)?,
            parse_price("close", &self.close)?,
            volume,
        ))
    }
}

fn parse_price(field: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim())
        .or_else(|_| Decimal::from_scientific(value.trim()))
        .with_context(|| format!("Invalid {} value: {}", field, value))
}

/// Unix milliseconds from an integer or a UTC date/time string
pub fn parse_timestamp(value: &str) -> Result<i64> {
    let value = value.trim();

    if let Ok(millis) = value.parse::<i64>() {
        return Ok(millis);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc().timestamp_millis());
    }
    if let Some(dt) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(dt.and_utc().timestamp_millis());
    }

    bail!("Unrecognised timestamp: {}", value)
}

pub fn read_candles<R: Read>(reader: R) -> Result<Vec<Candle>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candles: Vec<Candle> = Vec::new();

    for (row, result) in rdr.deserialize().enumerate() {
        let record: CandleRecord = result.with_context(|| format!("Malformed CSV row {}", row + 1))?;
        let candle = record
            .into_candle()
            .with_context(|| format!("Invalid candle on row {}", row + 1))?;

        if candles.last().is_some_and(|prev| candle.timestamp <= prev.timestamp) {
            warn!(row = row + 1, timestamp = candle.timestamp, "Timestamps are not strictly increasing");
        }
        candles.push(candle);
    }

    Ok(candles)
}

pub fn load_candles(path: &Path) -> Result<Vec<Candle>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let candles = read_candles(BufReader::new(file))
        .with_context(|| format!("Failed to read candles from {}", path.display()))?;

    debug!(path = %path.display(), candles = candles.len(), "Loaded candle series");
    Ok(candles)
}

/// `EURUSD_M15.csv` → (`EURUSD`, M15)
pub fn parse_series_file_name(path: &Path) -> Option<(String, Timeframe)> {
    if path.extension()?.to_str()? != "csv" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (symbol, timeframe) = stem.rsplit_once('_')?;
    if symbol.is_empty() {
        return None;
    }
    let timeframe = Timeframe::from_str(timeframe).ok()?;
    Some((symbol.to_uppercase(), timeframe))
}

/// Every `<SYMBOL>_<TF>.csv` in a directory, grouped by symbol.
pub fn load_directory(dir: &Path) -> Result<BTreeMap<String, BTreeMap<Timeframe, Vec<Candle>>>> {
    let mut series: BTreeMap<String, BTreeMap<Timeframe, Vec<Candle>>> = BTreeMap::new();

    let entries = fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let Some((symbol, timeframe)) = parse_series_file_name(&path) else {
            debug!(path = %path.display(), "Skipping file without a <SYMBOL>_<TF>.csv name");
            continue;
        };
        let candles = load_candles(&path)?;
        series.entry(symbol).or_default().insert(timeframe, candles);
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_reads_millis_and_dates() {
        let data = "\
timestamp,open,high,low,close,volume
1700000000000,1.1000,1.1010,1.0990,1.1005,120
2023-11-14 22:15:00,1.1005,1.1020,1.1000,1.1015,
2023-11-14T22:30:00Z,1.1015,1.1030,1.1010,1.1025,80.5
";
        let candles = read_candles(data.as_bytes()).unwrap();

        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].timestamp, 1_700_000_000_000);
        assert_eq!(candles[0].close, dec!(1.1005));
        assert_eq!(candles[1].timestamp, 1_700_000_100_000);
        assert_eq!(candles[1].volume, Decimal::ZERO);
        assert_eq!(candles[2].timestamp, 1_700_001_000_000);
        assert_eq!(candles[2].volume, dec!(80.5));
    }

    #[test]
    fn test_bad_price_names_the_row() {
        let data = "timestamp,open,high,low,close\n1,1.0,1.1,0.9,abc\n";
        let err = read_candles(data.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("row 1"));
    }

    #[test]
    fn test_unrecognised_timestamp() {
        assert!(parse_timestamp("yesterday").is_err());
        assert_eq!(parse_timestamp("2024-01-01").unwrap(), 1_704_067_200_000);
    }

    #[test]
    fn test_series_file_names() {
        assert_eq!(
            parse_series_file_name(Path::new("data/eurusd_M15.csv")),
            Some(("EURUSD".to_string(), Timeframe::M15))
        );
        assert_eq!(
            parse_series_file_name(Path::new("XAU_USD_4h.csv")),
            Some(("XAU_USD".to_string(), Timeframe::H4))
        );
        assert_eq!(parse_series_file_name(Path::new("EURUSD.csv")), None);
        assert_eq!(parse_series_file_name(Path::new("EURUSD_M15.txt")), None);
    }

    #[test]
    fn test_load_directory_groups_by_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let rows = "timestamp,open,high,low,close,volume\n1,1,2,0.5,1.5,10\n2,1.5,2.5,1,2,10\n";

        for name in ["EURUSD_H4.csv", "EURUSD_D1.csv", "GBPUSD_H4.csv"] {
            let mut file = File::create(dir.path().join(name)).unwrap();
            file.write_all(rows.as_bytes()).unwrap();
        }
        File::create(dir.path().join("notes.txt")).unwrap();

        let series = load_directory(dir.path()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series["EURUSD"].len(), 2);
        assert_eq!(series["GBPUSD"][&Timeframe::H4].len(), 2);
    }
}
