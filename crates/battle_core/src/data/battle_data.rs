//! Battle-wide tuning.

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::math::{decimal_serde, deg_to_rad, Fixed};

/// Ticks per second for fixed-step simulation.
pub const TICK_RATE: u32 = 20;

/// Slowest allowed game speed multiplier.
pub const MIN_TIME_SCALE: f64 = 0.1;

/// Fastest allowed game speed multiplier.
pub const MAX_TIME_SCALE: f64 = 3.0;

/// Global knobs shared by every unit and projectile in a battle.
///
/// Every field has a default, so a RON file only needs the values it
/// changes: `BattleConfig(time_scale: 2.0)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Multiplier applied to every frame delta before it reaches the
    /// simulation. Clamped to `[MIN_TIME_SCALE, MAX_TIME_SCALE]` on use.
    #[serde(with = "decimal_serde")]
    pub(crate) time_scale: Fixed,

    /// Fixed steps per simulated second.
    pub tick_rate: u32,

    /// A projectile closer than this to its target counts as a hit.
    #[serde(with = "decimal_serde")]
    pub hit_threshold: Fixed,

    /// Seconds a projectile may fly before it expires.
    #[serde(with = "decimal_serde")]
    pub projectile_lifetime: Fixed,

    /// Height above the shooter at which projectiles are launched.
    #[serde(with = "decimal_serde")]
    pub projectile_spawn_height: Fixed,

    /// Deflection tried when the direct path is blocked.
    #[serde(with = "decimal_serde")]
    pub avoidance_angle_degrees: Fixed,

    /// Steer around allies in the forward cone, not just obstacles.
    pub crowd_avoidance: bool,

    /// Minimum cosine between heading and ally bearing for the ally to
    /// count as in the way.
    #[serde(with = "decimal_serde")]
    pub crowd_cone_dot: Fixed,

    /// Turn rate factor; the facing interpolates by `rotation_speed * dt`.
    #[serde(with = "decimal_serde")]
    pub rotation_speed: Fixed,

    /// Height kept above the ground after every move.
    #[serde(with = "decimal_serde")]
    pub vertical_offset: Fixed,

    /// Duration in seconds of attack variant 0.
    #[serde(with = "decimal_serde")]
    pub primary_attack_duration: Fixed,

    /// Duration in seconds of attack variant 1.
    #[serde(with = "decimal_serde")]
    pub alternate_attack_duration: Fixed,

    /// Point within an attack, as a fraction of its duration, at which the
    /// damage lands or the projectile is launched.
    #[serde(with = "decimal_serde")]
    pub impact_fraction: Fixed,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            time_scale: Fixed::ONE,
            tick_rate: TICK_RATE,
            hit_threshold: Fixed::from_num(0.5),
            projectile_lifetime: Fixed::from_num(5),
            projectile_spawn_height: Fixed::from_num(1.5),
            avoidance_angle_degrees: Fixed::from_num(45),
            crowd_avoidance: true,
            crowd_cone_dot: Fixed::from_num(0.7),
            rotation_speed: Fixed::from_num(5),
            vertical_offset: Fixed::ZERO,
            primary_attack_duration: Fixed::from_num(0.6),
            alternate_attack_duration: Fixed::from_num(0.8),
            impact_fraction: Fixed::from_num(0.5),
        }
    }
}

impl BattleConfig {
    /// Parse a config from RON and validate it.
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate == 0 {
            return Err(BattleError::InvalidConfig(
                "tick_rate must be positive".to_string(),
            ));
        }
        if self.impact_fraction < Fixed::ZERO || self.impact_fraction > Fixed::ONE {
            return Err(BattleError::InvalidConfig(format!(
                "impact_fraction must be within [0, 1], got {}",
                self.impact_fraction
            )));
        }
        if self.hit_threshold <= Fixed::ZERO {
            return Err(BattleError::InvalidConfig(format!(
                "hit_threshold must be positive, got {}",
                self.hit_threshold
            )));
        }
        Ok(())
    }

    /// Current game speed multiplier, clamped to the allowed range.
    #[must_use]
    pub fn time_scale(&self) -> Fixed {
        self.time_scale.clamp(
            Fixed::from_num(MIN_TIME_SCALE),
            Fixed::from_num(MAX_TIME_SCALE),
        )
    }

    /// Set the game speed multiplier. Out-of-range values are clamped.
    pub fn set_time_scale(&mut self, scale: Fixed) {
        self.time_scale = scale;
        self.time_scale = self.time_scale();
    }

    /// Builder variant of [`Self::set_time_scale`].
    #[must_use]
    pub fn with_time_scale(mut self, scale: Fixed) -> Self {
        self.set_time_scale(scale);
        self
    }

    /// Builder method to set where in an attack the effect lands.
    #[must_use]
    pub fn with_impact_fraction(mut self, fraction: Fixed) -> Self {
        self.impact_fraction = fraction;
        self
    }

    /// Builder method to set both attack variant durations.
    #[must_use]
    pub fn with_attack_durations(mut self, primary: Fixed, alternate: Fixed) -> Self {
        self.primary_attack_duration = primary;
        self.alternate_attack_duration = alternate;
        self
    }

    /// Builder method to set the projectile launch height.
    #[must_use]
    pub fn with_projectile_spawn_height(mut self, height: Fixed) -> Self {
        self.projectile_spawn_height = height;
        self
    }

    /// Seconds per fixed step.
    #[must_use]
    pub fn fixed_timestep(&self) -> Fixed {
        Fixed::ONE / Fixed::from_num(self.tick_rate.max(1))
    }

    /// Avoidance deflection in radians.
    #[must_use]
    pub fn avoidance_angle(&self) -> Fixed {
        deg_to_rad(self.avoidance_angle_degrees)
    }

    /// Duration of an attack variant. Variants other than 0 use the
    /// alternate duration. Negative durations count as instant.
    #[must_use]
    pub fn attack_duration(&self, variant: u8) -> Fixed {
        let duration = if variant == 0 {
            self.primary_attack_duration
        } else {
            self.alternate_attack_duration
        };
        duration.max(Fixed::ZERO)
    }

    /// Offset from attack start to the impact point of a variant.
    #[must_use]
    pub fn impact_offset(&self, variant: u8) -> Fixed {
        self.attack_duration(variant) * self.impact_fraction.clamp(Fixed::ZERO, Fixed::ONE)
    }
}
