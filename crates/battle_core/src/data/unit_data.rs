//! Per-unit stat blocks.

use serde::{Deserialize, Serialize};

use crate::components::{AttackKind, Team};
use crate::math::{decimal_serde, Fixed};

/// Default attack reach for melee units.
const MELEE_RANGE: i32 = 2;
/// Default attack reach for ranged units.
const RANGED_RANGE: i32 = 5;

/// Configuration of a single unit.
///
/// Misconfigured values are tolerated rather than rejected: a non-positive
/// cooldown means the unit is always ready, a non-positive speed means it
/// never moves.
///
/// # Example RON
///
/// ```ron
/// UnitStats(
///     team: A,
///     attack_kind: Ranged,
///     max_health: 80,
///     move_speed: 1.2,
///     attack_damage: 12,
///     attack_range: 5.0,
///     attack_cooldown: 1.5,
///     bullet_speed: 10.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Owning side.
    pub team: Team,

    /// Melee strikes directly, ranged fires a projectile.
    #[serde(default)]
    pub attack_kind: AttackKind,

    /// Maximum (and starting) health.
    pub max_health: u32,

    /// Movement speed in units per second.
    #[serde(with = "decimal_serde")]
    pub move_speed: Fixed,

    /// Damage per attack.
    pub attack_damage: u32,

    /// Distance at which an attack may start.
    #[serde(with = "decimal_serde")]
    pub attack_range: Fixed,

    /// Seconds between attack starts.
    #[serde(with = "decimal_serde")]
    pub attack_cooldown: Fixed,

    /// Projectile speed for ranged units, in units per second.
    #[serde(with = "decimal_serde", default = "default_bullet_speed")]
    pub bullet_speed: Fixed,

    /// Every n-th attack is a special attack. Zero disables specials.
    #[serde(default = "default_special_interval")]
    pub special_attack_interval: u32,
}

fn default_bullet_speed() -> Fixed {
    Fixed::from_num(10)
}

const fn default_special_interval() -> u32 {
    4
}

impl UnitStats {
    /// Baseline melee unit for a team.
    #[must_use]
    pub fn melee(team: Team) -> Self {
        Self {
            team,
            attack_kind: AttackKind::Melee,
            max_health: 100,
            move_speed: Fixed::ONE,
            attack_damage: 10,
            attack_range: Fixed::from_num(MELEE_RANGE),
            attack_cooldown: Fixed::ONE,
            bullet_speed: default_bullet_speed(),
            special_attack_interval: default_special_interval(),
        }
    }

    /// Baseline ranged unit for a team.
    #[must_use]
    pub fn ranged(team: Team) -> Self {
        Self {
            attack_kind: AttackKind::Ranged,
            attack_range: Fixed::from_num(RANGED_RANGE),
            ..Self::melee(team)
        }
    }

    /// Builder method to set maximum health.
    #[must_use]
    pub const fn with_max_health(mut self, max_health: u32) -> Self {
        self.max_health = max_health;
        self
    }

    /// Builder method to set damage per attack.
    #[must_use]
    pub const fn with_attack_damage(mut self, damage: u32) -> Self {
        self.attack_damage = damage;
        self
    }

    /// Builder method to set the special attack interval.
    #[must_use]
    pub const fn with_special_attack_interval(mut self, interval: u32) -> Self {
        self.special_attack_interval = interval;
        self
    }

    /// Builder method to set movement speed.
    #[must_use]
    pub fn with_move_speed(mut self, speed: Fixed) -> Self {
        self.move_speed = speed;
        self
    }

    /// Builder method to set attack range.
    #[must_use]
    pub fn with_attack_range(mut self, range: Fixed) -> Self {
        self.attack_range = range;
        self
    }

    /// Builder method to set the attack cooldown in seconds.
    #[must_use]
    pub fn with_attack_cooldown(mut self, cooldown: Fixed) -> Self {
        self.attack_cooldown = cooldown;
        self
    }

    /// Builder method to set projectile speed.
    #[must_use]
    pub fn with_bullet_speed(mut self, speed: Fixed) -> Self {
        self.bullet_speed = speed;
        self
    }

    /// Cooldown in seconds, floored at zero.
    #[must_use]
    pub fn cooldown_seconds(&self) -> Fixed {
        self.attack_cooldown.max(Fixed::ZERO)
    }

    /// Movement speed, floored at zero.
    #[must_use]
    pub fn effective_move_speed(&self) -> Fixed {
        self.move_speed.max(Fixed::ZERO)
    }

    /// Projectile speed, floored at zero.
    #[must_use]
    pub fn effective_bullet_speed(&self) -> Fixed {
        self.bullet_speed.max(Fixed::ZERO)
    }

    /// Whether attack number `counter` (1-based) is a special attack.
    #[must_use]
    pub const fn is_special_attack(&self, counter: u32) -> bool {
        self.special_attack_interval > 0 && counter % self.special_attack_interval == 0
    }
}
