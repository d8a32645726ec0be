use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart timeframe a candle series is sampled on.
///
/// Ordered from the shortest to the longest horizon so that maps keyed by
/// `Timeframe` iterate deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
}

impl Timeframe {
    /// Terminal-style code (`M15`, `H4`, `D1`, ...)
    pub fn code(&self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
            Timeframe::W1 => "W1",
        }
    }

    /// The four horizons of the classic top-down read, highest first.
    pub fn top_down() -> [Timeframe; 4] {
        [Timeframe::W1, Timeframe::D1, Timeframe::H4, Timeframe::M15]
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "m1" | "1m" | "1min" => Ok(Timeframe::M1),
            "m5" | "5m" | "5min" => Ok(Timeframe::M5),
            "m15" | "15m" | "15min" => Ok(Timeframe::M15),
            "m30" | "30m" | "30min" => Ok(Timeframe::M30),
            "h1" | "1h" | "1hour" => Ok(Timeframe::H1),
            "h4" | "4h" | "4hour" => Ok(Timeframe::H4),
            "d1" | "1d" | "1day" | "daily" => Ok(Timeframe::D1),
            "w1" | "1w" | "1week" | "weekly" => Ok(Timeframe::W1),
            _ => Err(anyhow!(
                "Invalid timeframe: '{}'. Valid options: M1, M5, M15, M30, H1, H4, D1, W1",
                s
            )),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
