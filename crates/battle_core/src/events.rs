//! Battle events for presentation and analysis.
//!
//! The simulation never calls into rendering or audio. Every tick returns a
//! [`TickEvents`] list in the order things happened; a front end either
//! walks it directly or hands a [`BattleObserver`] to
//! [`TickEvents::dispatch`].

use serde::{Deserialize, Serialize};

use crate::components::{ProjectileId, Team, UnitId};
use crate::math::Vec3Fixed;
use crate::projectile::Resolution;

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// One side still has units.
    Victory(Team),
    /// Both sides were wiped out in the same tick (or never had units).
    Draw,
}

impl BattleOutcome {
    /// Winning team, if any.
    #[must_use]
    pub const fn winner(self) -> Option<Team> {
        match self {
            Self::Victory(team) => Some(team),
            Self::Draw => None,
        }
    }
}

impl std::fmt::Display for BattleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Victory(team) => write!(f, "{team} wins"),
            Self::Draw => write!(f, "Draw"),
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Something observable that happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleEvent {
    /// Rosters were built and units activated.
    BattleStarted {
        /// Members of team A.
        team_a: usize,
        /// Members of team B.
        team_b: usize,
    },
    /// A unit began an attack (animation trigger).
    AttackStarted {
        /// Attacker.
        unit: UnitId,
        /// Locked target.
        target: UnitId,
        /// Alternating attack variant.
        variant: u8,
    },
    /// The attack that just started is also a special attack.
    SpecialAttack {
        /// Attacker.
        unit: UnitId,
        /// 1-based attack number.
        counter: u32,
    },
    /// A projectile was launched.
    ProjectileSpawned {
        /// New projectile.
        projectile: ProjectileId,
        /// Shooter.
        source: UnitId,
        /// Homing target.
        target: UnitId,
        /// Launch position.
        position: Vec3Fixed,
    },
    /// A projectile resolved (impact effect trigger).
    ProjectileResolved {
        /// Projectile.
        projectile: ProjectileId,
        /// How it ended.
        resolution: Resolution,
        /// Where it ended.
        position: Vec3Fixed,
    },
    /// A unit lost health.
    DamageApplied {
        /// Damaged unit.
        unit: UnitId,
        /// Attacker responsible.
        source: UnitId,
        /// Health actually removed.
        amount: u32,
        /// Health left.
        remaining: u32,
    },
    /// A unit died. Emitted exactly once per unit.
    UnitDied {
        /// Dead unit.
        unit: UnitId,
        /// Its team.
        team: Team,
    },
    /// The battle ended.
    BattleEnded {
        /// Result.
        outcome: BattleOutcome,
    },
}

/// Events generated during one tick, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Tick that produced these events.
    pub tick: u64,
    /// Events in the order they happened.
    pub events: Vec<BattleEvent>,
}

impl TickEvents {
    /// Create an empty event list for `tick`.
    #[must_use]
    pub const fn new(tick: u64) -> Self {
        Self {
            tick,
            events: Vec::new(),
        }
    }

    /// Append an event.
    pub fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    /// Check if nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over events in order.
    pub fn iter(&self) -> impl Iterator<Item = &BattleEvent> {
        self.events.iter()
    }

    /// Units that died this tick.
    #[must_use]
    pub fn deaths(&self) -> Vec<UnitId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                BattleEvent::UnitDied { unit, .. } => Some(*unit),
                _ => None,
            })
            .collect()
    }

    /// Outcome, if the battle ended this tick.
    #[must_use]
    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.events.iter().find_map(|event| match event {
            BattleEvent::BattleEnded { outcome } => Some(*outcome),
            _ => None,
        })
    }

    /// Feed every event to `observer`, in order.
    pub fn dispatch(&self, observer: &mut dyn BattleObserver) {
        for event in &self.events {
            observer.on_event(event);
        }
    }
}

impl Extend<BattleEvent> for TickEvents {
    fn extend<I: IntoIterator<Item = BattleEvent>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

// ============================================================================
// Observer
// ============================================================================

/// Presentation sink. Every callback defaults to doing nothing.
pub trait BattleObserver {
    /// Rosters built.
    fn on_battle_started(&mut self, _team_a: usize, _team_b: usize) {}

    /// Attack animation should start.
    fn on_attack_started(&mut self, _unit: UnitId, _target: UnitId, _variant: u8) {}

    /// Special attack triggered.
    fn on_special_attack(&mut self, _unit: UnitId, _counter: u32) {}

    /// Projectile launched.
    fn on_projectile_spawned(
        &mut self,
        _projectile: ProjectileId,
        _source: UnitId,
        _target: UnitId,
        _position: Vec3Fixed,
    ) {
    }

    /// Projectile resolved; play the impact effect.
    fn on_projectile_resolved(
        &mut self,
        _projectile: ProjectileId,
        _resolution: Resolution,
        _position: Vec3Fixed,
    ) {
    }

    /// Health changed.
    fn on_damage_applied(&mut self, _unit: UnitId, _source: UnitId, _amount: u32, _remaining: u32) {
    }

    /// Unit died.
    fn on_unit_died(&mut self, _unit: UnitId, _team: Team) {}

    /// Battle over.
    fn on_battle_ended(&mut self, _outcome: BattleOutcome) {}

    /// Route an event to its callback.
    fn on_event(&mut self, event: &BattleEvent) {
        match *event {
            BattleEvent::BattleStarted { team_a, team_b } => self.on_battle_started(team_a, team_b),
            BattleEvent::AttackStarted {
                unit,
                target,
                variant,
            } => self.on_attack_started(unit, target, variant),
            BattleEvent::SpecialAttack { unit, counter } => self.on_special_attack(unit, counter),
            BattleEvent::ProjectileSpawned {
                projectile,
                source,
                target,
                position,
            } => self.on_projectile_spawned(projectile, source, target, position),
            BattleEvent::ProjectileResolved {
                projectile,
                resolution,
                position,
            } => self.on_projectile_resolved(projectile, resolution, position),
            BattleEvent::DamageApplied {
                unit,
                source,
                amount,
                remaining,
            } => self.on_damage_applied(unit, source, amount, remaining),
            BattleEvent::UnitDied { unit, team } => self.on_unit_died(unit, team),
            BattleEvent::BattleEnded { outcome } => self.on_battle_ended(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        deaths: Vec<UnitId>,
        ended: Option<BattleOutcome>,
    }

    impl BattleObserver for Counter {
        fn on_unit_died(&mut self, unit: UnitId, _team: Team) {
            self.deaths.push(unit);
        }

        fn on_battle_ended(&mut self, outcome: BattleOutcome) {
            self.ended = Some(outcome);
        }
    }

    #[test]
    fn test_dispatch_routes_in_order() {
        let mut events = TickEvents::new(3);
        events.push(BattleEvent::UnitDied {
            unit: 4,
            team: Team::A,
        });
        events.push(BattleEvent::UnitDied {
            unit: 2,
            team: Team::A,
        });
        events.push(BattleEvent::BattleEnded {
            outcome: BattleOutcome::Victory(Team::B),
        });

        let mut counter = Counter::default();
        events.dispatch(&mut counter);

        assert_eq!(counter.deaths, vec![4, 2]);
        assert_eq!(counter.ended, Some(BattleOutcome::Victory(Team::B)));
        assert_eq!(events.deaths(), vec![4, 2]);
        assert_eq!(events.outcome(), Some(BattleOutcome::Victory(Team::B)));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(BattleOutcome::Victory(Team::A).to_string(), "Team A wins");
        assert_eq!(BattleOutcome::Draw.to_string(), "Draw");
        assert_eq!(BattleOutcome::Draw.winner(), None);
    }
}
