//! Test fixtures and helpers.
//!
//! Pre-built battles and placement helpers for consistent testing.

use battle_core::battle::Battle;
use battle_core::components::{Team, UnitId};
use battle_core::data::{BattleConfig, UnitStats};
use battle_core::events::{BattleEvent, BattleObserver};
use battle_core::math::{Vec2Fixed, Vec3Fixed};
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Ground-level world position.
#[must_use]
pub fn at(x: i32, z: i32) -> Vec3Fixed {
    Vec3Fixed::new(fixed(x), I32F32::ZERO, fixed(z))
}

/// Ground-plane point.
#[must_use]
pub fn ground(x: i32, z: i32) -> Vec2Fixed {
    Vec2Fixed::new(fixed(x), fixed(z))
}

/// Place `count` copies of `stats` in a column at `x`, `spacing` apart
/// along Z and centred on zero.
pub fn line_up(
    battle: &mut Battle,
    stats: &UnitStats,
    count: usize,
    x: i32,
    spacing: i32,
) -> Vec<UnitId> {
    let count_i = i32::try_from(count).unwrap_or(i32::MAX);
    let offset = (count_i - 1) * spacing / 2;
    (0..count_i)
        .map(|i| battle.place_unit(stats.clone(), at(x, i * spacing - offset)))
        .collect()
}

/// Two melee units `distance` apart on the X axis.
#[must_use]
pub fn duel(distance: i32) -> Battle {
    duel_with(
        UnitStats::melee(Team::A),
        UnitStats::melee(Team::B),
        distance,
    )
}

/// Two units with custom stats `distance` apart on the X axis.
#[must_use]
pub fn duel_with(a: UnitStats, b: UnitStats, distance: i32) -> Battle {
    let mut battle = Battle::default();
    battle.place_unit(a, at(0, 0));
    battle.place_unit(b, at(distance, 0));
    battle
}

/// Mixed armies facing each other: per side, `per_side` melee units in
/// front and as many ranged units behind them.
#[must_use]
pub fn skirmish(per_side: usize, config: BattleConfig) -> Battle {
    let mut battle = Battle::new(config);
    line_up(&mut battle, &UnitStats::melee(Team::A), per_side, -6, 2);
    line_up(&mut battle, &UnitStats::ranged(Team::A), per_side, -9, 2);
    line_up(&mut battle, &UnitStats::melee(Team::B), per_side, 6, 2);
    line_up(&mut battle, &UnitStats::ranged(Team::B), per_side, 9, 2);
    battle
}

/// Observer that records every event it sees.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    /// Events in arrival order.
    pub events: Vec<BattleEvent>,
}

impl EventLog {
    /// Count events matching a predicate.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&BattleEvent) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }

    /// How many times `unit` was reported dead.
    #[must_use]
    pub fn deaths_of(&self, unit: UnitId) -> usize {
        self.count(|e| matches!(e, BattleEvent::UnitDied { unit: u, .. } if *u == unit))
    }
}

impl BattleObserver for EventLog {
    fn on_event(&mut self, event: &BattleEvent) {
        self.events.push(*event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_up_is_centred() {
        let mut battle = Battle::default();
        let ids = line_up(&mut battle, &UnitStats::melee(Team::A), 3, 4, 2);

        let zs: Vec<_> = ids
            .iter()
            .filter_map(|&id| battle.unit(id))
            .map(|u| u.position.z)
            .collect();
        assert_eq!(zs, vec![fixed(-2), fixed(0), fixed(2)]);
    }

    #[test]
    fn test_skirmish_sizes() {
        let battle = skirmish(3, BattleConfig::default());
        assert_eq!(battle.unit_count(), 12);
    }
}
