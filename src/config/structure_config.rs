//! Structure detector parameters from environment variables.

use super::{parse_bool, parse_decimal, parse_u32, parse_usize};
use crate::application::structure_engine::StructureConfig;
use crate::domain::structure::bos::BosConfig;
use crate::domain::structure::displacement::DisplacementConfig;
use crate::domain::structure::liquidity::LiquidityConfig;
use crate::domain::structure::zones::ZoneConfig;
use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Swing, BOS, zone and liquidity settings
#[derive(Debug, Clone)]
pub struct StructureEnvConfig {
    pub structure: StructureConfig,
    pub bos: BosConfig,
    pub zones: ZoneConfig,
    pub liquidity: LiquidityConfig,
    /// Per-symbol pip sizes, keys uppercased
    pub tick_overrides: HashMap<String, Decimal>,
}

impl StructureEnvConfig {
    pub fn from_env() -> Result<Self> {
        let structure_defaults = StructureConfig::default();
        let structure = StructureConfig {
            internal_lookback: parse_usize("STRUCTURE_INTERNAL_LOOKBACK", structure_defaults.internal_lookback)?,
            external_lookback: parse_usize("STRUCTURE_EXTERNAL_LOOKBACK", structure_defaults.external_lookback)?,
            tolerance: parse_decimal("STRUCTURE_TOLERANCE", structure_defaults.tolerance)?,
            protected_external: parse_bool("STRUCTURE_PROTECTED_EXTERNAL", structure_defaults.protected_external)?,
            compress_on_bos: parse_bool("STRUCTURE_COMPRESS_ON_BOS", structure_defaults.compress_on_bos)?,
        };

        let bos_defaults = BosConfig::default();
        let bos = BosConfig {
            lookback: parse_usize("BOS_LOOKBACK", bos_defaults.lookback)?,
            displacement_multiplier: parse_decimal("BOS_DISPLACEMENT_MULTIPLIER", bos_defaults.displacement_multiplier)?,
            body_threshold: parse_decimal("BOS_BODY_THRESHOLD", bos_defaults.body_threshold)?,
            tick_buffer: parse_u32("BOS_TICK_BUFFER", bos_defaults.tick_buffer)?,
        };

        let zone_defaults = ZoneConfig::default();
        let zones = ZoneConfig {
            swing_lookback: parse_usize("ZONE_SWING_LOOKBACK", zone_defaults.swing_lookback)?,
            displacement: DisplacementConfig {
                lookback: parse_usize("DISPLACEMENT_LOOKBACK", zone_defaults.displacement.lookback)?,
                threshold: parse_decimal("DISPLACEMENT_THRESHOLD", zone_defaults.displacement.threshold)?,
            },
        };

        let liquidity = LiquidityConfig {
            tolerance: parse_decimal("LIQUIDITY_TOLERANCE", LiquidityConfig::default().tolerance)?,
        };

        let tick_overrides = match env::var("TICK_SIZE_OVERRIDES") {
            Ok(raw) => parse_tick_overrides(&raw).context("Failed to parse TICK_SIZE_OVERRIDES")?,
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            structure,
            bos,
            zones,
            liquidity,
            tick_overrides,
        })
    }
}

/// `EURUSD:0.0001,USDJPY:0.01`
pub fn parse_tick_overrides(raw: &str) -> Result<HashMap<String, Decimal>> {
    let mut overrides = HashMap::new();

    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((symbol, size)) = pair.split_once(':') else {
            bail!("Expected SYMBOL:size, got '{}'", pair);
        };
        let symbol = symbol.trim();
        if symbol.is_empty() {
            bail!("Missing symbol in '{}'", pair);
        }
        let size = Decimal::from_str(size.trim()).with_context(|| format!("Invalid tick size in '{}'", pair))?;
        if size <= Decimal::ZERO {
            bail!("Tick size must be positive in '{}'", pair);
        }
        overrides.insert(symbol.to_uppercase(), size);
    }

    Ok(overrides)
}
