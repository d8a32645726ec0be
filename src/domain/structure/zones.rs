use super::displacement::{
    DisplacementConfig, detect_imbalance, displacement_strength, is_displacement,
};
use super::swings::{enforce_alternation, find_swings};
use super::types::{BosEvent, BosKind, Direction, Zone, ZoneKind, ZoneOrigin};
use crate::domain::market::candle::Candle;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Lookback for the swings that bound swing-leg zones
    pub swing_lookback: usize,
    pub displacement: DisplacementConfig,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            swing_lookback: 20,
            displacement: DisplacementConfig::default(),
        }
    }
}

/// Supply and demand zones. Stateless: every call rebuilds from candles.
#[derive(Debug, Clone, Default)]
pub struct ZoneDetector {
    config: ZoneConfig,
}

impl ZoneDetector {
    pub fn new(config: ZoneConfig) -> Self {
        Self { config }
    }

    /// BOS impulse zone first, then base-pattern zones, then swing legs.
    pub fn detect(&self, candles: &[Candle], bos: Option<&BosEvent>) -> Vec<Zone> {
        let mut zones: Vec<Zone> = bos
            .and_then(|event| self.bos_impulse_zone(candles, event))
            .into_iter()
            .collect();
        zones.extend(self.imbalance_zones(candles));
        zones.extend(self.swing_leg_zones(candles));

        tracing::debug!(zones = zones.len(), "Zones detected");
        zones
    }

    /// Base candle right before a displacement candle that left an imbalance.
    pub fn imbalance_zones(&self, candles: &[Candle]) -> Vec<Zone> {
        let mut zones = Vec::new();

        for i in 1..candles.len() {
            let Some(imbalance) = detect_imbalance(candles, i) else {
                continue;
            };
            if !is_displacement(candles, i, &self.config.displacement) {
                continue;
            }

            let base_index = i - 1;
            let base = &candles[base_index];
            let (kind, proximal, distal) = match imbalance.direction {
                Direction::Bullish => (ZoneKind::Demand, base.high, base.low),
                _ => (ZoneKind::Supply, base.low, base.high),
            };

            zones.push(Zone {
                kind,
                origin: ZoneOrigin::BasePattern,
                proximal,
                distal,
                imbalance: Some(imbalance.gap),
                displacement_strength: Some(displacement_strength(
                    candles,
                    i,
                    self.config.displacement.lookback,
                )),
                index: base_index,
                timestamp: base.timestamp,
            });
        }

        zones
    }

    /// Zones spanning a swing to the nearer of its neighbouring extremes.
    pub fn swing_leg_zones(&self, candles: &[Candle]) -> Vec<Zone> {
        let swings = enforce_alternation(&find_swings(
            candles,
            self.config.swing_lookback,
            Decimal::ZERO,
        ));

        swings
            .windows(3)
            .filter_map(|triple| {
                let (prev, swing, next) = (&triple[0], &triple[1], &triple[2]);
                let (kind, proximal) = if swing.is_low() && next.is_high() {
                    (ZoneKind::Demand, prev.price.min(next.price))
                } else if swing.is_high() && next.is_low() {
                    (ZoneKind::Supply, prev.price.max(next.price))
                } else {
                    return None;
                };

                Some(Zone {
                    kind,
                    origin: ZoneOrigin::SwingLeg,
                    proximal,
                    distal: swing.price,
                    imbalance: None,
                    displacement_strength: None,
                    index: swing.index,
                    timestamp: swing.timestamp,
                })
            })
            .collect()
    }

    /// The impulse candle right before the BOS decision candle, when it is
    /// itself a displacement candle carrying an imbalance.
    pub fn bos_impulse_zone(&self, candles: &[Candle], bos: &BosEvent) -> Option<Zone> {
        let impulse_index = bos.candle_index.checked_sub(1)?;
        if impulse_index < 2 || impulse_index >= candles.len() {
            return None;
        }
        if !is_displacement(candles, impulse_index, &self.config.displacement) {
            return None;
        }
        let imbalance = detect_imbalance(candles, impulse_index)?;

        let impulse = &candles[impulse_index];
        let (kind, proximal, distal) = match bos.kind {
            BosKind::BullishBos => (ZoneKind::Demand, impulse.high, impulse.low),
            BosKind::BearishBos => (ZoneKind::Supply, impulse.low, impulse.high),
        };

        Some(Zone {
            kind,
            origin: ZoneOrigin::ImpulseImbalance,
            proximal,
            distal,
            imbalance: Some(imbalance.gap),
            displacement_strength: Some(displacement_strength(
                candles,
                impulse_index,
                self.config.displacement.lookback,
            )),
            index: impulse_index,
            timestamp: impulse.timestamp,
        })
    }
}
