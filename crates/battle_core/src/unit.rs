//! Per-unit battle state.

use serde::{Deserialize, Serialize};

use crate::components::{AttackKind, CombatPhase, Health, Team, UnitId};
use crate::data::UnitStats;
use crate::math::{fixed_serde, Fixed, Vec2Fixed, Vec3Fixed};

/// Result of [`Unit::take_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// The unit was already dead; nothing changed.
    Ignored,
    /// Damage applied and the unit survived.
    Wounded {
        /// Health actually removed.
        applied: u32,
        /// Health left.
        remaining: u32,
    },
    /// Damage applied and the unit died. Reported once per unit.
    Killed {
        /// Health actually removed.
        applied: u32,
    },
}

impl DamageOutcome {
    /// Health actually removed.
    #[must_use]
    pub const fn applied(self) -> u32 {
        match self {
            Self::Ignored => 0,
            Self::Wounded { applied, .. } | Self::Killed { applied } => applied,
        }
    }
}

/// A combatant on the field.
///
/// Targets are held as ids and re-resolved every tick; a unit never keeps
/// another unit alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// Configured stats.
    pub stats: UnitStats,
    /// Health pool.
    pub health: Health,
    /// World position.
    pub position: Vec3Fixed,
    /// Ground-plane heading (unit length).
    pub facing: Vec2Fixed,
    /// Combat state machine.
    pub phase: CombatPhase,
    /// Seconds until a new attack may start.
    #[serde(with = "fixed_serde")]
    pub cooldown_remaining: Fixed,
    /// Attacks started so far this battle.
    pub attack_counter: u32,
    /// Nearest enemy as of the last tick.
    pub current_target: Option<UnitId>,
    /// Target locked when the running attack started.
    pub attack_target: Option<UnitId>,
    /// Whether the unit has been activated for the current battle.
    pub in_battle: bool,
}

impl Unit {
    /// Create a unit at full health facing `+z`.
    ///
    /// A unit configured with zero max health starts dead.
    #[must_use]
    pub fn new(id: UnitId, stats: UnitStats, position: Vec3Fixed) -> Self {
        let health = Health::new(stats.max_health);
        let phase = if health.is_depleted() {
            CombatPhase::Dead
        } else {
            CombatPhase::Idle
        };
        Self {
            id,
            stats,
            health,
            position,
            facing: Vec2Fixed::FORWARD,
            phase,
            cooldown_remaining: Fixed::ZERO,
            attack_counter: 0,
            current_target: None,
            attack_target: None,
            in_battle: false,
        }
    }

    /// Owning side.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.stats.team
    }

    /// Attack delivery.
    #[must_use]
    pub const fn attack_kind(&self) -> AttackKind {
        self.stats.attack_kind
    }

    /// Whether the unit has died. Never reverts.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        matches!(self.phase, CombatPhase::Dead)
    }

    /// Whether an attack is in progress.
    #[must_use]
    pub const fn is_attacking(&self) -> bool {
        self.phase.is_attacking()
    }

    /// Remaining health as a fraction in `[0, 1]`.
    #[must_use]
    pub fn health_fraction(&self) -> Fixed {
        self.health.fraction()
    }

    /// Apply incoming damage.
    ///
    /// No-op on a dead unit. The transition to [`CombatPhase::Dead`]
    /// happens at most once and clears any pending attack.
    pub fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::Ignored;
        }

        let applied = self.health.apply_damage(amount);
        if self.health.is_depleted() {
            self.phase = CombatPhase::Dead;
            self.current_target = None;
            self.attack_target = None;
            DamageOutcome::Killed { applied }
        } else {
            DamageOutcome::Wounded {
                applied,
                remaining: self.health.current,
            }
        }
    }

    /// Count the attack cooldown down, flooring at zero.
    pub fn tick_cooldown(&mut self, dt: Fixed) {
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(Fixed::ZERO);
    }

    /// Whether a new attack may start now.
    #[must_use]
    pub fn ready_to_attack(&self) -> bool {
        !self.is_dead() && !self.is_attacking() && self.cooldown_remaining == Fixed::ZERO
    }

    /// Enter battle with fresh transient state. Health is kept.
    pub fn activate(&mut self) {
        if self.is_dead() {
            return;
        }
        self.phase = CombatPhase::Idle;
        self.cooldown_remaining = Fixed::ZERO;
        self.attack_counter = 0;
        self.current_target = None;
        self.attack_target = None;
        self.in_battle = true;
    }

    /// Leave battle. Any attack in progress is dropped.
    pub fn deactivate(&mut self) {
        if !self.is_dead() {
            self.phase = CombatPhase::Idle;
        }
        self.attack_target = None;
        self.in_battle = false;
    }

    /// Enter the attacking state against a locked target and restart the
    /// cooldown. `counter` is the 1-based number of this attack.
    pub fn begin_attack(&mut self, target: UnitId, variant: u8, counter: u32) {
        self.phase = CombatPhase::Attacking { variant };
        self.attack_counter = counter;
        self.attack_target = Some(target);
        self.cooldown_remaining = self.stats.cooldown_seconds();
    }

    /// Leave the attacking state. Does nothing unless an attack is running.
    pub fn finish_attack(&mut self) {
        if self.is_attacking() {
            self.phase = CombatPhase::Idle;
            self.attack_target = None;
        }
    }
}
