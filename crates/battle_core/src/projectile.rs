//! Homing projectiles.
//!
//! A projectile chases its target's current position each tick and
//! resolves exactly once: it hits, it expires, or it fizzles because the
//! target is gone. Damage is applied by the coordinator on a hit, never by
//! the projectile itself.

use serde::{Deserialize, Serialize};

use crate::components::{ProjectileId, UnitId};
use crate::math::{fixed_serde, Fixed, Vec3Fixed};

/// How a projectile ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// Reached the target; damage should be applied.
    Hit,
    /// Lifetime ran out before arrival.
    Expired,
    /// Target vanished or died while in flight.
    Fizzled,
}

/// Result of [`Projectile::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileStatus {
    /// Still travelling.
    InFlight,
    /// Resolved during this tick.
    Resolved(Resolution),
    /// Already resolved on an earlier tick; nothing happened.
    Spent,
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique identifier.
    pub id: ProjectileId,
    /// Unit that fired it.
    pub source: UnitId,
    /// Unit it homes on.
    pub target: UnitId,
    /// Damage applied on a hit.
    pub damage: u32,
    /// Travel speed in units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Seconds left before expiry.
    #[serde(with = "fixed_serde")]
    pub remaining_lifetime: Fixed,
    /// Current position.
    pub position: Vec3Fixed,
    resolved: bool,
}

impl Projectile {
    /// Create a projectile at `position`.
    #[must_use]
    pub fn new(
        id: ProjectileId,
        source: UnitId,
        target: UnitId,
        damage: u32,
        speed: Fixed,
        lifetime: Fixed,
        position: Vec3Fixed,
    ) -> Self {
        Self {
            id,
            source,
            target,
            damage,
            speed: speed.max(Fixed::ZERO),
            remaining_lifetime: lifetime,
            position,
            resolved: false,
        }
    }

    /// Whether the projectile has resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Advance by `dt`.
    ///
    /// `target_position` is `None` when the target no longer exists or is
    /// dead. Order within a tick: validity check, move, arrival check,
    /// lifetime countdown.
    pub fn tick(
        &mut self,
        dt: Fixed,
        target_position: Option<Vec3Fixed>,
        hit_threshold: Fixed,
    ) -> ProjectileStatus {
        if self.resolved {
            return ProjectileStatus::Spent;
        }

        let Some(target_position) = target_position else {
            return self.resolve(Resolution::Fizzled);
        };

        self.position = self.position.move_towards(target_position, self.speed * dt);
        if self.position.distance_squared(target_position) < hit_threshold.saturating_mul(hit_threshold) {
            return self.resolve(Resolution::Hit);
        }

        self.remaining_lifetime -= dt;
        if self.remaining_lifetime <= Fixed::ZERO {
            return self.resolve(Resolution::Expired);
        }

        ProjectileStatus::InFlight
    }

    fn resolve(&mut self, resolution: Resolution) -> ProjectileStatus {
        self.resolved = true;
        ProjectileStatus::Resolved(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn threshold() -> Fixed {
        Fixed::from_num(0.5)
    }

    fn shot(speed: i32, lifetime: i32) -> Projectile {
        Projectile::new(1, 10, 20, 7, fixed(speed), fixed(lifetime), Vec3Fixed::ZERO)
    }

    #[test]
    fn test_hits_after_two_ticks() {
        let target = Vec3Fixed::new(fixed(10), Fixed::ZERO, Fixed::ZERO);
        let mut projectile = shot(5, 5);

        assert_eq!(
            projectile.tick(Fixed::ONE, Some(target), threshold()),
            ProjectileStatus::InFlight
        );
        assert_eq!(
            projectile.tick(Fixed::ONE, Some(target), threshold()),
            ProjectileStatus::Resolved(Resolution::Hit)
        );
        assert_eq!(
            projectile.tick(Fixed::ONE, Some(target), threshold()),
            ProjectileStatus::Spent
        );
    }

    #[test]
    fn test_fizzles_without_target() {
        let mut projectile = shot(5, 5);
        let start = projectile.position;

        assert_eq!(
            projectile.tick(Fixed::ONE, None, threshold()),
            ProjectileStatus::Resolved(Resolution::Fizzled)
        );
        assert_eq!(projectile.position, start);
        assert!(projectile.is_resolved());
    }

    #[test]
    fn test_expires_when_lifetime_runs_out() {
        let far = Vec3Fixed::new(fixed(100), Fixed::ZERO, Fixed::ZERO);
        let mut projectile = shot(1, 2);

        assert_eq!(projectile.tick(Fixed::ONE, Some(far), threshold()), ProjectileStatus::InFlight);
        assert_eq!(
            projectile.tick(Fixed::ONE, Some(far), threshold()),
            ProjectileStatus::Resolved(Resolution::Expired)
        );
    }

    #[test]
    fn test_homes_on_moving_target() {
        let mut projectile = shot(2, 5);
        projectile.tick(
            Fixed::ONE,
            Some(Vec3Fixed::new(fixed(10), Fixed::ZERO, Fixed::ZERO)),
            threshold(),
        );
        projectile.tick(
            Fixed::ONE,
            Some(Vec3Fixed::new(fixed(2), Fixed::ZERO, fixed(10))),
            threshold(),
        );
        assert!(projectile.position.z > Fixed::ZERO);
    }

    #[test]
    fn test_arrival_beats_expiry_on_same_tick() {
        let target = Vec3Fixed::new(fixed(1), Fixed::ZERO, Fixed::ZERO);
        let mut projectile = shot(5, 1);
        assert_eq!(
            projectile.tick(Fixed::ONE, Some(target), threshold()),
            ProjectileStatus::Resolved(Resolution::Hit)
        );
    }
}
