//! Small value types shared by every battle subsystem.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Unique identifier for units. Never reused within one battle.
pub type UnitId = u64;

/// Unique identifier for projectiles.
pub type ProjectileId = u64;

// ============================================================================
// Team & Attack Kind
// ============================================================================

/// The two opposing sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// First side (the player's allies in a typical setup).
    A,
    /// Second side.
    B,
}

impl Team {
    /// The side this team fights against.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "Team A"),
            Self::B => write!(f, "Team B"),
        }
    }
}

/// How a unit delivers damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttackKind {
    /// Damage is applied directly at the impact point of the attack.
    #[default]
    Melee,
    /// A homing projectile is launched at the impact point of the attack.
    Ranged,
}

// ============================================================================
// Health
// ============================================================================

/// Health pool. `current` never exceeds `max` and never underflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create a health pool at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if health is depleted.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning the amount actually removed.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current -= actual;
        actual
    }

    /// Remaining health as a fraction in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> Fixed {
        if self.max == 0 {
            return Fixed::ZERO;
        }
        Fixed::from_num(self.current) / Fixed::from_num(self.max)
    }
}

// ============================================================================
// Combat Phase
// ============================================================================

/// Per-unit combat state machine.
///
/// ```text
/// Idle <-> Moving -> Attacking { variant } -> Idle
///   any -> Dead (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombatPhase {
    /// Waiting: no target, or in range while the cooldown runs.
    #[default]
    Idle,
    /// Closing distance to the current target.
    Moving,
    /// Playing out an attack. Movement is suspended.
    Attacking {
        /// Which of the alternating attack variants is running (0 or 1).
        variant: u8,
    },
    /// Terminal.
    Dead,
}

impl CombatPhase {
    /// Whether an attack is in progress.
    #[must_use]
    pub const fn is_attacking(self) -> bool {
        matches!(self, Self::Attacking { .. })
    }
}
