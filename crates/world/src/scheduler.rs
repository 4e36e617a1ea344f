//! Deterministic queue of actions deferred to a future tick.
//!
//! Replaces wall-clock callbacks: everything due is drained at the start of a
//! step in (deadline, insertion) order. Actions are re-validated by the
//! consumer when they fire, since the world may have changed in between.

use std::collections::BTreeMap;

use deepdig_core::{SimTick, TilePos};
use serde::{Deserialize, Serialize};

/// Deferred work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledAction {
    /// Detonate the explosive tile at `center`, if it is still explosive.
    ChainExplosion { center: TilePos },
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pending: BTreeMap<(SimTick, u64), ScheduledAction>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `action` for `due`. Returns `false` if an identical action is
    /// already pending for the same tick.
    pub fn schedule(&mut self, due: SimTick, action: ScheduledAction) -> bool {
        let duplicate = self
            .pending
            .range((due, 0)..=(due, u64::MAX))
            .any(|(_, pending)| *pending == action);
        if duplicate {
            return false;
        }
        self.pending.insert((due, self.next_seq), action);
        self.next_seq += 1;
        true
    }

    /// Whether `action` is queued for any tick.
    pub fn is_pending(&self, action: &ScheduledAction) -> bool {
        self.pending.values().any(|pending| pending == action)
    }

    /// Remove and return every action due at or before `now`.
    pub fn drain_due(&mut self, now: SimTick) -> Vec<ScheduledAction> {
        let later = self.pending.split_off(&(SimTick(now.0 + 1), 0));
        let due = std::mem::replace(&mut self.pending, later);
        due.into_values().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(x: i32) -> ScheduledAction {
        ScheduledAction::ChainExplosion {
            center: TilePos::new(x, 10),
        }
    }

    #[test]
    fn drains_in_deadline_then_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(SimTick(5), chain(3));
        scheduler.schedule(SimTick(3), chain(2));
        scheduler.schedule(SimTick(3), chain(1));
        scheduler.schedule(SimTick(9), chain(4));

        assert!(scheduler.drain_due(SimTick(2)).is_empty());
        assert_eq!(scheduler.drain_due(SimTick(5)), vec![chain(2), chain(1), chain(3)]);
        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(scheduler.drain_due(SimTick(100)), vec![chain(4)]);
    }

    #[test]
    fn identical_actions_for_same_tick_are_merged() {
        let mut scheduler = Scheduler::new();
        assert!(scheduler.schedule(SimTick(4), chain(1)));
        assert!(!scheduler.schedule(SimTick(4), chain(1)));
        assert!(scheduler.schedule(SimTick(5), chain(1)));
        assert_eq!(scheduler.pending_count(), 2);
        assert!(scheduler.is_pending(&chain(1)));
    }
}
