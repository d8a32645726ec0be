use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Structural direction of a market leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub fn is_neutral(&self) -> bool {
        matches!(self, Direction::Neutral)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "bullish"),
            Direction::Bearish => write!(f, "bearish"),
            Direction::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingKind {
    High,
    Low,
}

/// Local extremum confirmed by candles on both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swing {
    pub timestamp: i64,
    /// Index of the source candle in the analysed series
    pub index: usize,
    pub price: Decimal,
    pub kind: SwingKind,
}

impl Swing {
    pub fn high(timestamp: i64, index: usize, price: Decimal) -> Self {
        Self {
            timestamp,
            index,
            price,
            kind: SwingKind::High,
        }
    }

    pub fn low(timestamp: i64, index: usize, price: Decimal) -> Self {
        Self {
            timestamp,
            index,
            price,
            kind: SwingKind::Low,
        }
    }

    pub fn is_high(&self) -> bool {
        self.kind == SwingKind::High
    }

    pub fn is_low(&self) -> bool {
        self.kind == SwingKind::Low
    }
}

/// External (committed, macro) and internal (micro) direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bias {
    pub external: Direction,
    pub internal: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BosKind {
    BullishBos,
    BearishBos,
}

impl BosKind {
    pub fn direction(&self) -> Direction {
        match self {
            BosKind::BullishBos => Direction::Bullish,
            BosKind::BearishBos => Direction::Bearish,
        }
    }
}

impl fmt::Display for BosKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BosKind::BullishBos => write!(f, "bullish_bos"),
            BosKind::BearishBos => write!(f, "bearish_bos"),
        }
    }
}

/// A confirmed close beyond the last relevant swing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BosEvent {
    pub kind: BosKind,
    pub broken_level: Decimal,
    pub break_price: Decimal,
    /// Index of the closed decision candle
    pub candle_index: usize,
    pub timestamp: i64,
}

/// Structural state label derived from committed bias, internal bias and BOS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureLabel {
    BullishExpansion,
    BullishCorrection,
    BearishExpansion,
    BearishCorrection,
    Transition,
    Distribution,
}

impl StructureLabel {
    pub fn is_expansion(&self) -> bool {
        matches!(
            self,
            StructureLabel::BullishExpansion | StructureLabel::BearishExpansion
        )
    }

    pub fn is_correction(&self) -> bool {
        matches!(
            self,
            StructureLabel::BullishCorrection | StructureLabel::BearishCorrection
        )
    }

    /// Direction the label belongs to, Neutral for transition/distribution
    pub fn direction(&self) -> Direction {
        match self {
            StructureLabel::BullishExpansion | StructureLabel::BullishCorrection => {
                Direction::Bullish
            }
            StructureLabel::BearishExpansion | StructureLabel::BearishCorrection => {
                Direction::Bearish
            }
            StructureLabel::Transition | StructureLabel::Distribution => Direction::Neutral,
        }
    }
}

impl fmt::Display for StructureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StructureLabel::BullishExpansion => "bullish_expansion",
            StructureLabel::BullishCorrection => "bullish_correction",
            StructureLabel::BearishExpansion => "bearish_expansion",
            StructureLabel::BearishCorrection => "bearish_correction",
            StructureLabel::Transition => "transition",
            StructureLabel::Distribution => "distribution",
        };
        write!(f, "{}", label)
    }
}

/// Closed price interval `[low, high]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: Decimal,
    pub high: Decimal,
}

impl PriceRange {
    pub fn new(low: Decimal, high: Decimal) -> Self {
        Self { low, high }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Supply,
    Demand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneOrigin {
    /// Base candle before a displacement candle that left an imbalance
    BasePattern,
    /// Impulse candle of a break of structure
    ImpulseImbalance,
    /// Swing-to-swing leg
    SwingLeg,
}

/// Supply/demand zone. `proximal` is the boundary nearer the impulse,
/// `distal` the one farther from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub origin: ZoneOrigin,
    pub proximal: Decimal,
    pub distal: Decimal,
    pub imbalance: Option<PriceRange>,
    pub displacement_strength: Option<Decimal>,
    /// Candle index the zone was built from
    pub index: usize,
    pub timestamp: i64,
}

impl Zone {
    pub fn midpoint(&self) -> Decimal {
        (self.proximal + self.distal) / Decimal::TWO
    }

    /// Zone kind aligned with a trade direction, if any
    pub fn favours(&self, direction: Direction) -> bool {
        matches!(
            (self.kind, direction),
            (ZoneKind::Demand, Direction::Bullish) | (ZoneKind::Supply, Direction::Bearish)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityKind {
    SwingHigh,
    SwingLow,
    EqualHigh,
    EqualLow,
}

impl LiquidityKind {
    /// Resting stops above price (swing/equal highs)
    pub fn is_buy_side(&self) -> bool {
        matches!(self, LiquidityKind::SwingHigh | LiquidityKind::EqualHigh)
    }

    /// Resting stops below price (swing/equal lows)
    pub fn is_sell_side(&self) -> bool {
        !self.is_buy_side()
    }
}

/// Resting liquidity price, swept once a later candle trades through it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityLevel {
    pub price: Decimal,
    pub kind: LiquidityKind,
    pub timeframe: Timeframe,
    pub forming_indices: BTreeSet<usize>,
    pub swept: bool,
    pub swept_at_index: Option<usize>,
}

impl LiquidityLevel {
    pub fn new(
        price: Decimal,
        kind: LiquidityKind,
        timeframe: Timeframe,
        forming_indices: BTreeSet<usize>,
    ) -> Self {
        Self {
            price,
            kind,
            timeframe,
            forming_indices,
            swept: false,
            swept_at_index: None,
        }
    }

    /// Index of the last candle that formed the level
    pub fn formation_index(&self) -> usize {
        self.forming_indices.iter().next_back().copied().unwrap_or(0)
    }
}

/// Everything one analysis pass knows about a (symbol, timeframe) series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub bias: Bias,
    pub state: StructureLabel,
    pub bos: Option<BosEvent>,
    pub momentum: i32,
    pub external_swings: Vec<Swing>,
    pub internal_swings: Vec<Swing>,
    pub current_price: Decimal,
    pub range: PriceRange,
    pub zones: Vec<Zone>,
    pub liquidity_levels: Vec<LiquidityLevel>,
    /// A BOS is registered and still waiting for its pullback
    pub awaiting_pullback: bool,
}
