//! Combat decisions.
//!
//! Pure functions that look at a unit and its resolved target and say what
//! the unit should do this tick. The coordinator carries the decisions out
//! and schedules the delayed parts of an attack.

use crate::components::{AttackKind, UnitId};
use crate::math::{Fixed, Vec3Fixed};
use crate::unit::Unit;

/// Number of alternating attack variants.
pub const ATTACK_VARIANTS: u32 = 2;

/// What a unit does this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatDecision {
    /// Mid-attack; nothing else happens until it finishes.
    Busy,
    /// No living enemy.
    Hold,
    /// Target out of range: move towards it.
    Advance {
        /// Target to close on.
        target: UnitId,
    },
    /// In range and ready: start an attack.
    Engage {
        /// Target to lock.
        target: UnitId,
    },
    /// In range but cooling down: face the target and wait.
    Wait {
        /// Target to face.
        target: UnitId,
    },
}

/// Choose the action for `unit` given its nearest living enemy.
#[must_use]
pub fn decide(unit: &Unit, target: Option<(UnitId, Vec3Fixed)>) -> CombatDecision {
    if unit.is_dead() {
        return CombatDecision::Hold;
    }
    if unit.is_attacking() {
        return CombatDecision::Busy;
    }

    let Some((target, target_position)) = target else {
        return CombatDecision::Hold;
    };

    if !in_range(unit, target_position) {
        CombatDecision::Advance { target }
    } else if unit.ready_to_attack() {
        CombatDecision::Engage { target }
    } else {
        CombatDecision::Wait { target }
    }
}

/// Whether `target_position` is within the unit's attack range.
#[must_use]
pub fn in_range(unit: &Unit, target_position: Vec3Fixed) -> bool {
    let range = unit.stats.attack_range.max(Fixed::ZERO);
    unit.position.distance_squared(target_position) <= range.saturating_mul(range)
}

/// The numbers behind an attack that is about to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackPlan {
    /// 1-based index of this attack in the unit's battle.
    pub counter: u32,
    /// Alternating variant: 0, 1, 0, 1, ...
    pub variant: u8,
    /// Whether this attack also triggers the special attack.
    pub special: bool,
}

/// Plan the unit's next attack.
#[must_use]
pub fn plan_attack(unit: &Unit) -> AttackPlan {
    let counter = unit.attack_counter.saturating_add(1);
    let variant = u8::try_from((counter - 1) % ATTACK_VARIANTS).unwrap_or(0);
    AttackPlan {
        counter,
        variant,
        special: unit.stats.is_special_attack(counter),
    }
}

/// What happens at an attack's impact point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackEffect {
    /// Damage the locked target directly.
    Strike {
        /// Damage to apply.
        damage: u32,
    },
    /// Launch a homing projectile at the locked target.
    Launch {
        /// Damage carried by the projectile.
        damage: u32,
        /// Projectile speed.
        speed: Fixed,
    },
}

/// Effect delivered by `unit` at the impact point.
#[must_use]
pub fn attack_effect(unit: &Unit) -> AttackEffect {
    let damage = unit.stats.attack_damage;
    match unit.attack_kind() {
        AttackKind::Melee => AttackEffect::Strike { damage },
        AttackKind::Ranged => AttackEffect::Launch {
            damage,
            speed: unit.stats.effective_bullet_speed(),
        },
    }
}
