//! Top-down weighting and setup sizing from environment variables.

use super::{parse_decimal, parse_u32, parse_usize};
use crate::application::setup::SetupConfig;
use crate::application::topdown::TopDownConfig;
use crate::domain::market::timeframe::Timeframe;
use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ScoringEnvConfig {
    pub topdown: TopDownConfig,
    pub setup: SetupConfig,
}

impl ScoringEnvConfig {
    pub fn from_env() -> Result<Self> {
        let topdown_defaults = TopDownConfig::default();
        let weights = match env::var("TOPDOWN_WEIGHTS") {
            Ok(raw) => parse_weights(&raw).context("Failed to parse TOPDOWN_WEIGHTS")?,
            Err(_) => topdown_defaults.weights,
        };
        let topdown = TopDownConfig {
            weights,
            alignment_threshold: parse_u32("TOPDOWN_ALIGNMENT_THRESHOLD", topdown_defaults.alignment_threshold)?,
        };

        let setup_defaults = SetupConfig::default();
        let entry_timeframe = match env::var("ENTRY_TIMEFRAME") {
            Ok(raw) => Timeframe::from_str(&raw).context("Failed to parse ENTRY_TIMEFRAME")?,
            Err(_) => setup_defaults.entry_timeframe,
        };
        let setup = SetupConfig {
            entry_timeframe,
            atr_period: parse_usize("SETUP_ATR_PERIOD", setup_defaults.atr_period)?,
            stop_atr_multiplier: parse_decimal("SETUP_STOP_ATR_MULTIPLIER", setup_defaults.stop_atr_multiplier)?,
            target_atr_multiplier: parse_decimal(
                "SETUP_TARGET_ATR_MULTIPLIER",
                setup_defaults.target_atr_multiplier,
            )?,
        };

        Ok(Self { topdown, setup })
    }
}

/// `W1:40,D1:30,H4:20,M15:10`
pub fn parse_weights(raw: &str) -> Result<BTreeMap<Timeframe, u32>> {
    let mut weights = BTreeMap::new();

    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((timeframe, weight)) = pair.split_once(':') else {
            bail!("Expected TF:weight, got '{}'", pair);
        };
        let timeframe = Timeframe::from_str(timeframe)?;
        let weight = weight
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Invalid weight in '{}'", pair))?;
        weights.insert(timeframe, weight);
    }

    if weights.is_empty() {
        bail!("At least one timeframe weight is required");
    }
    Ok(weights)
}
