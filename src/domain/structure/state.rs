use super::types::{BosEvent, BosKind, Direction};
use crate::domain::errors::AnalysisError;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pullback protocol phase. Pending BOS data only exists while awaiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum StructurePhase {
    #[default]
    Idle,
    AwaitingPullback {
        pending: BosKind,
        level: Decimal,
        /// Timestamp of the decision candle that produced the pending BOS
        formed_at: i64,
    },
}

/// What `register_bos` did with an incoming break
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BosTransition {
    /// Idle → AwaitingPullback
    Registered,
    /// Opposite break replaced the stale pending one
    Replaced,
    /// Same-direction break confirmed the pending one; bias committed
    Confirmed(Direction),
    /// Break at or before one already registered
    Duplicate,
}

/// Persistent structure memory for one (symbol, timeframe).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureState {
    committed_bias: Option<Direction>,
    phase: StructurePhase,
    /// Decision-candle timestamp of the newest BOS ever registered
    #[serde(default)]
    last_bos_at: Option<i64>,
}

impl StructureState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.committed_bias.is_some()
    }

    /// Seed the committed bias on first analysis. Later calls are no-ops.
    pub fn initialize(&mut self, macro_bias: Direction) {
        if self.committed_bias.is_none() {
            self.committed_bias = Some(macro_bias);
        }
    }

    /// Committed bias, Neutral until initialized
    pub fn committed_bias(&self) -> Direction {
        self.committed_bias.unwrap_or(Direction::Neutral)
    }

    pub fn phase(&self) -> StructurePhase {
        self.phase
    }

    pub fn awaiting_pullback(&self) -> bool {
        matches!(self.phase, StructurePhase::AwaitingPullback { .. })
    }

    pub fn pending_bos_type(&self) -> Option<BosKind> {
        match self.phase {
            StructurePhase::AwaitingPullback { pending, .. } => Some(pending),
            StructurePhase::Idle => None,
        }
    }

    pub fn pending_level(&self) -> Option<Decimal> {
        match self.phase {
            StructurePhase::AwaitingPullback { level, .. } => Some(level),
            StructurePhase::Idle => None,
        }
    }

    pub fn register_bos(&mut self, bos: &BosEvent) -> BosTransition {
        if self.last_bos_at.is_some_and(|seen| bos.timestamp <= seen) {
            return BosTransition::Duplicate;
        }
        self.last_bos_at = Some(bos.timestamp);

        match self.phase {
            StructurePhase::Idle => {
                self.await_pullback(bos);
                BosTransition::Registered
            }
            StructurePhase::AwaitingPullback { pending, .. } if pending == bos.kind => {
                let direction = bos.kind.direction();
                self.commit(direction);
                BosTransition::Confirmed(direction)
            }
            StructurePhase::AwaitingPullback { .. } => {
                self.await_pullback(bos);
                BosTransition::Replaced
            }
        }
    }

    /// Check a closed candle against the pending level.
    ///
    /// A bullish break is confirmed once internal structure has turned
    /// bearish (the retrace) while the close still holds above the broken
    /// level; bearish mirrors this. Candles at or before the break itself are
    /// never used. Returns the newly committed direction.
    pub fn confirm_pullback(&mut self, closed: &Candle, internal: Direction) -> Option<Direction> {
        let StructurePhase::AwaitingPullback {
            pending,
            level,
            formed_at,
        } = self.phase
        else {
            return None;
        };

        if closed.timestamp <= formed_at {
            return None;
        }

        let confirmed = match pending {
            BosKind::BullishBos => internal == Direction::Bearish && closed.close > level,
            BosKind::BearishBos => internal == Direction::Bullish && closed.close < level,
        };
        if !confirmed {
            return None;
        }

        let direction = pending.direction();
        self.commit(direction);
        Some(direction)
    }

    fn await_pullback(&mut self, bos: &BosEvent) {
        self.phase = StructurePhase::AwaitingPullback {
            pending: bos.kind,
            level: bos.broken_level,
            formed_at: bos.timestamp,
        };
    }

    fn commit(&mut self, direction: Direction) {
        self.committed_bias = Some(direction);
        self.phase = StructurePhase::Idle;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub symbol: String,
    pub timeframe: Timeframe,
}

/// Host-owned map of structure memory keyed by (symbol, timeframe).
///
/// States are created on first use and live until explicitly reset.
#[derive(Debug, Clone, Default)]
pub struct StructureStateStore {
    states: BTreeMap<StateKey, StructureState>,
}

impl StructureStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str, timeframe: Timeframe) -> Option<&StructureState> {
        self.states.get(&StateKey {
            symbol: symbol.to_string(),
            timeframe,
        })
    }

    /// State for the key, created empty on first use
    pub fn entry(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<&mut StructureState, AnalysisError> {
        if symbol.trim().is_empty() {
            return Err(AnalysisError::missing_symbol());
        }

        let key = StateKey {
            symbol: symbol.to_string(),
            timeframe,
        };
        Ok(self.states.entry(key).or_default())
    }

    /// Forget one (symbol, timeframe). Returns whether a state existed.
    pub fn reset(&mut self, symbol: &str, timeframe: Timeframe) -> bool {
        self.states
            .remove(&StateKey {
                symbol: symbol.to_string(),
                timeframe,
            })
            .is_some()
    }

    /// Forget every timeframe of a symbol. Returns the number removed.
    pub fn reset_symbol(&mut self, symbol: &str) -> usize {
        let before = self.states.len();
        self.states.retain(|key, _| key.symbol != symbol);
        before - self.states.len()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StateKey> {
        self.states.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bos(kind: BosKind, level: Decimal, timestamp: i64) -> BosEvent {
        BosEvent {
            kind,
            broken_level: level,
            break_price: level,
            candle_index: timestamp as usize,
            timestamp,
        }
    }

    fn closed(timestamp: i64, close: Decimal) -> Candle {
        Candle::new(timestamp, close, close, close, close, dec!(1))
    }

    #[test]
    fn test_initialize_only_once() {
        let mut state = StructureState::new();
        assert_eq!(state.committed_bias(), Direction::Neutral);
        assert!(!state.is_initialized());

        state.initialize(Direction::Bearish);
        state.initialize(Direction::Bullish);
        assert_eq!(state.committed_bias(), Direction::Bearish);
        assert_eq!(state.phase(), StructurePhase::Idle);
    }

    #[test]
    fn test_bos_while_idle_awaits_pullback() {
        let mut state = StructureState::new();
        state.initialize(Direction::Bearish);

        let transition = state.register_bos(&bos(BosKind::BullishBos, dec!(1.1000), 10));
        assert_eq!(transition, BosTransition::Registered);
        assert!(state.awaiting_pullback());
        assert_eq!(state.pending_bos_type(), Some(BosKind::BullishBos));
        assert_eq!(state.pending_level(), Some(dec!(1.1000)));
        // a single break never flips the committed bias
        assert_eq!(state.committed_bias(), Direction::Bearish);
    }

    #[test]
    fn test_same_direction_bos_confirms() {
        let mut state = StructureState::new();
        state.initialize(Direction::Bearish);
        state.register_bos(&bos(BosKind::BullishBos, dec!(1.1000), 10));

        let transition = state.register_bos(&bos(BosKind::BullishBos, dec!(1.1050), 20));
        assert_eq!(transition, BosTransition::Confirmed(Direction::Bullish));
        assert_eq!(state.committed_bias(), Direction::Bullish);
        assert!(!state.awaiting_pullback());
        assert_eq!(state.pending_level(), None);
    }

    #[test]
    fn test_opposite_bos_replaces_pending() {
        let mut state = StructureState::new();
        state.initialize(Direction::Neutral);
        state.register_bos(&bos(BosKind::BullishBos, dec!(1.1000), 10));

        let transition = state.register_bos(&bos(BosKind::BearishBos, dec!(1.0950), 20));
        assert_eq!(transition, BosTransition::Replaced);
        assert_eq!(state.pending_bos_type(), Some(BosKind::BearishBos));
        assert_eq!(state.pending_level(), Some(dec!(1.0950)));
        assert_eq!(state.committed_bias(), Direction::Neutral);
    }

    #[test]
    fn test_repeated_break_is_duplicate() {
        let mut state = StructureState::new();
        state.initialize(Direction::Bearish);
        let event = bos(BosKind::BullishBos, dec!(1.1000), 10);
        state.register_bos(&event);

        assert_eq!(state.register_bos(&event), BosTransition::Duplicate);
        assert!(state.awaiting_pullback());
        assert_eq!(state.committed_bias(), Direction::Bearish);
    }

    #[test]
    fn test_break_seen_before_commit_stays_duplicate() {
        let mut state = StructureState::new();
        state.initialize(Direction::Bearish);
        state.register_bos(&bos(BosKind::BullishBos, dec!(1.1000), 10));

        let confirming = bos(BosKind::BullishBos, dec!(1.1100), 20);
        assert_eq!(
            state.register_bos(&confirming),
            BosTransition::Confirmed(Direction::Bullish)
        );
        let committed = state.clone();

        // the same candles analysed again must not re-arm the pullback
        assert_eq!(state.register_bos(&confirming), BosTransition::Duplicate);
        assert_eq!(state.register_bos(&bos(BosKind::BearishBos, dec!(1.0900), 15)), BosTransition::Duplicate);
        assert_eq!(state, committed);
        assert_eq!(state.phase(), StructurePhase::Idle);

        assert_eq!(
            state.register_bos(&bos(BosKind::BearishBos, dec!(1.0900), 30)),
            BosTransition::Registered
        );
    }

    #[test]
    fn test_pullback_confirms_bullish_flip() {
        let mut state = StructureState::new();
        state.initialize(Direction::Bearish);
        state.register_bos(&bos(BosKind::BullishBos, dec!(1.1000), 10));

        // internal still bullish: no retrace yet
        assert_eq!(state.confirm_pullback(&closed(11, dec!(1.1020)), Direction::Bullish), None);
        // retrace lost the level
        assert_eq!(state.confirm_pullback(&closed(12, dec!(1.0990)), Direction::Bearish), None);
        assert_eq!(state.committed_bias(), Direction::Bearish);

        let committed = state.confirm_pullback(&closed(13, dec!(1.1010)), Direction::Bearish);
        assert_eq!(committed, Some(Direction::Bullish));
        assert_eq!(state.committed_bias(), Direction::Bullish);
        assert_eq!(state.phase(), StructurePhase::Idle);
    }

    #[test]
    fn test_pullback_confirms_bearish_flip() {
        let mut state = StructureState::new();
        state.initialize(Direction::Bullish);
        state.register_bos(&bos(BosKind::BearishBos, dec!(1.0900), 10));

        let committed = state.confirm_pullback(&closed(11, dec!(1.0890)), Direction::Bullish);
        assert_eq!(committed, Some(Direction::Bearish));
    }

    #[test]
    fn test_break_candle_is_not_its_own_pullback() {
        let mut state = StructureState::new();
        state.initialize(Direction::Bearish);
        state.register_bos(&bos(BosKind::BullishBos, dec!(1.1000), 10));

        assert_eq!(state.confirm_pullback(&closed(10, dec!(1.1030)), Direction::Bearish), None);
        assert!(state.awaiting_pullback());
    }

    #[test]
    fn test_idle_ignores_pullback_checks() {
        let mut state = StructureState::new();
        state.initialize(Direction::Bullish);
        assert_eq!(state.confirm_pullback(&closed(5, dec!(1)), Direction::Bearish), None);
    }

    #[test]
    fn test_single_bos_never_flips_without_confirmation() {
        for kind in [BosKind::BullishBos, BosKind::BearishBos] {
            for initial in [Direction::Bullish, Direction::Bearish, Direction::Neutral] {
                let mut state = StructureState::new();
                state.initialize(initial);
                state.register_bos(&bos(kind, dec!(100), 1));
                assert_eq!(state.committed_bias(), initial);
                assert!(state.awaiting_pullback());
            }
        }
    }

    #[test]
    fn test_store_lifecycle() {
        let mut store = StructureStateStore::new();
        assert!(store.is_empty());

        store.entry("EURUSD", Timeframe::H4).unwrap().initialize(Direction::Bullish);
        store.entry("EURUSD", Timeframe::M15).unwrap();
        store.entry("GBPUSD", Timeframe::H4).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.get("EURUSD", Timeframe::H4).map(|s| s.committed_bias()),
            Some(Direction::Bullish)
        );
        // timeframes never share state
        assert_eq!(
            store.get("EURUSD", Timeframe::M15).map(|s| s.is_initialized()),
            Some(false)
        );

        assert!(store.reset("EURUSD", Timeframe::M15));
        assert!(!store.reset("EURUSD", Timeframe::M15));
        assert_eq!(store.reset_symbol("EURUSD"), 1);
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_rejects_blank_symbol() {
        let mut store = StructureStateStore::new();
        let err = store.entry("  ", Timeframe::H1).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
        assert!(store.is_empty());
    }
}
