// Market structure primitives
pub mod bias;
pub mod bos;
pub mod displacement;
pub mod liquidity;
pub mod state;
pub mod swings;
pub mod types;
pub mod zones;

pub use bos::{BosConfig, BosDetector};
pub use liquidity::{LiquidityConfig, LiquidityEngine};
pub use state::{StructureState, StructureStateStore};
pub use types::*;
pub use zones::{ZoneConfig, ZoneDetector};
