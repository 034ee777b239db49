//! Deferred per-unit actions.
//!
//! Attacks take time to play out. Instead of callbacks, the coordinator
//! queues "do X for unit U at time T" entries here and drains the due ones
//! at the start of each tick. Entries are ordered by due time, then by
//! insertion, so draining is deterministic.

use serde::{Deserialize, Serialize};

use crate::components::UnitId;
use crate::math::{fixed_serde, Fixed};

/// Action to run when an entry comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduledAction {
    /// Deliver the running attack's damage or projectile.
    AttackImpact,
    /// End the running attack.
    AttackFinished,
}

/// One queued action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEntry {
    /// Battle time at which the action runs.
    #[serde(with = "fixed_serde")]
    pub due: Fixed,
    /// Insertion sequence, breaks ties between equal due times.
    pub seq: u64,
    /// Unit the action belongs to.
    pub unit: UnitId,
    /// What to do.
    pub action: ScheduledAction,
}

/// Timer queue keyed by battle time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler {
    entries: Vec<ScheduledEntry>,
    next_seq: u64,
}

impl Scheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    /// Queue `action` for `unit` at battle time `due`.
    pub fn schedule(&mut self, due: Fixed, unit: UnitId, action: ScheduledAction) {
        let entry = ScheduledEntry {
            due,
            seq: self.next_seq,
            unit,
            action,
        };
        self.next_seq += 1;

        let index = self.entries.partition_point(|e| e.due <= due);
        self.entries.insert(index, entry);
    }

    /// Remove and return every entry due at or before `now`, in order.
    pub fn drain_due(&mut self, now: Fixed) -> Vec<ScheduledEntry> {
        let split = self.entries.partition_point(|e| e.due <= now);
        self.entries.drain(..split).collect()
    }

    /// Drop every pending entry for `unit`.
    pub fn cancel_unit(&mut self, unit: UnitId) {
        self.entries.retain(|e| e.unit != unit);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Earliest pending due time.
    #[must_use]
    pub fn next_due(&self) -> Option<Fixed> {
        self.entries.first().map(|e| e.due)
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(x: f64) -> Fixed {
        Fixed::from_num(x)
    }

    #[test]
    fn test_drains_in_due_then_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t(0.8), 1, ScheduledAction::AttackFinished);
        scheduler.schedule(t(0.3), 2, ScheduledAction::AttackImpact);
        scheduler.schedule(t(0.3), 1, ScheduledAction::AttackImpact);

        let due = scheduler.drain_due(t(0.5));
        let order: Vec<_> = due.iter().map(|e| e.unit).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.next_due(), Some(t(0.8)));
    }

    #[test]
    fn test_due_time_is_inclusive() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t(1.0), 1, ScheduledAction::AttackImpact);
        assert!(scheduler.drain_due(t(0.99)).is_empty());
        assert_eq!(scheduler.drain_due(t(1.0)).len(), 1);
    }

    #[test]
    fn test_cancel_unit() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t(0.1), 1, ScheduledAction::AttackImpact);
        scheduler.schedule(t(0.2), 2, ScheduledAction::AttackImpact);
        scheduler.schedule(t(0.3), 1, ScheduledAction::AttackFinished);

        scheduler.cancel_unit(1);
        let remaining = scheduler.drain_due(t(1.0));
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].unit, 2);
    }
}
