//! Configuration for the analysis engines.
//!
//! Settings come either from environment variables (one loader per concern:
//! structure detection and scoring) or from a single TOML file. Anything left
//! unset falls back to the component defaults.

mod scoring_config;
mod structure_config;

pub use scoring_config::{ScoringEnvConfig, parse_weights};
pub use structure_config::{StructureEnvConfig, parse_tick_overrides};

use crate::application::scanner::MarketScanner;
use crate::application::setup::{SetupConfig, SetupEvaluator};
use crate::application::structure_engine::{StructureConfig, StructureEngine};
use crate::application::topdown::{TopDownConfig, TopDownEngine};
use crate::domain::market::tick_size::TickSizeTable;
use crate::domain::structure::bos::{BosConfig, BosDetector};
use crate::domain::structure::liquidity::LiquidityConfig;
use crate::domain::structure::zones::{ZoneConfig, ZoneDetector};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub structure: StructureConfig,
    pub bos: BosConfig,
    pub zones: ZoneConfig,
    pub liquidity: LiquidityConfig,
    pub topdown: TopDownConfig,
    pub setup: SetupConfig,
    pub tick_overrides: HashMap<String, Decimal>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let structure = StructureEnvConfig::from_env()?;
        let scoring = ScoringEnvConfig::from_env()?;

        Ok(Self {
            structure: structure.structure,
            bos: structure.bos,
            zones: structure.zones,
            liquidity: structure.liquidity,
            topdown: scoring.topdown,
            setup: scoring.setup,
            tick_overrides: structure.tick_overrides,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn tick_sizes(&self) -> TickSizeTable {
        TickSizeTable::with_overrides(self.tick_overrides.clone())
    }

    pub fn structure_engine(&self) -> StructureEngine {
        StructureEngine::new(
            self.structure,
            BosDetector::new(self.bos.clone(), self.tick_sizes()),
            ZoneDetector::new(self.zones),
            self.liquidity,
        )
    }

    pub fn topdown_engine(&self) -> TopDownEngine {
        TopDownEngine::new(self.topdown.clone(), self.structure_engine())
    }

    pub fn setup_evaluator(&self) -> SetupEvaluator {
        SetupEvaluator::new(self.setup)
    }

    pub fn scanner(&self) -> MarketScanner {
        MarketScanner::new(self.topdown_engine(), self.setup_evaluator())
    }
}

fn parse_usize(key: &str, default: usize) -> Result<usize> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<usize>()
        .context(format!("Failed to parse {}", key))
}

fn parse_u32(key: &str, default: u32) -> Result<u32> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<u32>()
        .context(format!("Failed to parse {}", key))
}

fn parse_decimal(key: &str, default: Decimal) -> Result<Decimal> {
    match env::var(key) {
        Ok(raw) => Decimal::from_str(raw.trim()).context(format!("Failed to parse {}", key)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("Failed to parse {}: '{}' is not a boolean", key, other),
        },
        Err(_) => Ok(default),
    }
}
