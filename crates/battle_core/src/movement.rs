//! Steering towards a target with obstacle and crowd avoidance.
//!
//! Movement works on the ground plane. Each step:
//!
//! 1. Face the target directly (height ignored).
//! 2. Probe that direction up to the unit's attack range, both against the
//!    environment and against allies standing in the forward cone.
//! 3. If the way is blocked, try deflecting left, then right. When both are
//!    blocked too, push on along the direct line.
//! 4. Advance by `move_speed * dt`, turn the facing towards the chosen
//!    direction, and snap to the ground.

use crate::data::BattleConfig;
use crate::math::{Fixed, Vec2Fixed, Vec3Fixed};
use crate::spatial::SpatialQuery;
use crate::unit::Unit;

/// Tuning for [`compute_step`], taken from [`BattleConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementParams {
    /// Deflection in radians tried when blocked.
    pub avoidance_angle: Fixed,
    /// Treat allies in the forward cone as obstacles.
    pub crowd_avoidance: bool,
    /// Minimum cosine for an ally to be in the forward cone.
    pub crowd_cone_dot: Fixed,
    /// Facing interpolation rate.
    pub rotation_speed: Fixed,
    /// Height kept above the ground.
    pub vertical_offset: Fixed,
}

impl MovementParams {
    /// Extract movement tuning from the battle config.
    #[must_use]
    pub fn from_config(config: &BattleConfig) -> Self {
        Self {
            avoidance_angle: config.avoidance_angle(),
            crowd_avoidance: config.crowd_avoidance,
            crowd_cone_dot: config.crowd_cone_dot,
            rotation_speed: config.rotation_speed,
            vertical_offset: config.vertical_offset,
        }
    }
}

impl Default for MovementParams {
    fn default() -> Self {
        Self::from_config(&BattleConfig::default())
    }
}

/// Which way the unit ended up going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steering {
    /// Straight at the target.
    Direct,
    /// Deflected counter-clockwise (seen from above).
    AvoidLeft,
    /// Deflected clockwise (seen from above).
    AvoidRight,
    /// Every candidate was blocked; went straight anyway.
    Blocked,
}

/// Outcome of one movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementStep {
    /// New world position, ground-snapped.
    pub position: Vec3Fixed,
    /// New heading.
    pub facing: Vec2Fixed,
    /// Chosen steering.
    pub steering: Steering,
}

/// Compute one movement step of `unit` towards `target`.
///
/// `allies` are the positions of the unit's living teammates (the unit
/// itself excluded). A unit standing on top of its target does not move.
#[must_use]
pub fn compute_step(
    unit: &Unit,
    target: Vec3Fixed,
    dt: Fixed,
    allies: &[Vec3Fixed],
    spatial: &dyn SpatialQuery,
    params: &MovementParams,
) -> MovementStep {
    let desired = (target.ground() - unit.position.ground()).normalize();
    if desired == Vec2Fixed::ZERO {
        return MovementStep {
            position: unit.position,
            facing: unit.facing,
            steering: Steering::Direct,
        };
    }

    let probe = unit.stats.attack_range.max(Fixed::ZERO);
    let (direction, steering) = steer(unit.position, desired, probe, allies, spatial, params);

    let displacement = direction * (unit.stats.effective_move_speed() * dt);
    let moved = Vec3Fixed::from_ground(unit.position.ground() + displacement, unit.position.y);

    MovementStep {
        position: ground_snap(moved, spatial, params.vertical_offset),
        facing: turn_towards(unit.facing, direction, params.rotation_speed, dt),
        steering,
    }
}

/// Pick a travel direction around obstacles and crowding allies.
#[must_use]
pub fn steer(
    origin: Vec3Fixed,
    desired: Vec2Fixed,
    probe: Fixed,
    allies: &[Vec3Fixed],
    spatial: &dyn SpatialQuery,
    params: &MovementParams,
) -> (Vec2Fixed, Steering) {
    let clear = |direction: Vec2Fixed| {
        !spatial.raycast_blocked(origin, direction, probe)
            && !(params.crowd_avoidance
                && crowded(origin, direction, probe, allies, params.crowd_cone_dot))
    };

    if clear(desired) {
        return (desired, Steering::Direct);
    }

    let left = desired.rotated(-params.avoidance_angle);
    if clear(left) {
        return (left, Steering::AvoidLeft);
    }

    let right = desired.rotated(params.avoidance_angle);
    if clear(right) {
        return (right, Steering::AvoidRight);
    }

    (desired, Steering::Blocked)
}

/// Whether an ally within `reach` stands inside the forward cone.
fn crowded(
    origin: Vec3Fixed,
    direction: Vec2Fixed,
    reach: Fixed,
    allies: &[Vec3Fixed],
    cone_dot: Fixed,
) -> bool {
    let reach_sq = reach * reach;
    allies.iter().any(|ally| {
        let offset = ally.ground() - origin.ground();
        let dist_sq = offset.length_squared();
        dist_sq > Fixed::ZERO
            && dist_sq <= reach_sq
            && offset.normalize().dot(direction) > cone_dot
    })
}

/// Turn `facing` towards `desired` by `rotation_speed * dt`, capped at a
/// full turn.
#[must_use]
pub fn turn_towards(
    facing: Vec2Fixed,
    desired: Vec2Fixed,
    rotation_speed: Fixed,
    dt: Fixed,
) -> Vec2Fixed {
    facing.rotate_towards(desired, rotation_speed * dt)
}

/// Place `position` at ground height plus `vertical_offset`.
#[must_use]
pub fn ground_snap(
    position: Vec3Fixed,
    spatial: &dyn SpatialQuery,
    vertical_offset: Fixed,
) -> Vec3Fixed {
    position.with_y(spatial.ground_height(position) + vertical_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Team;
    use crate::data::UnitStats;
    use crate::spatial::{CircleObstacle, ObstacleField, OpenField};

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn at(x: i32, z: i32) -> Vec3Fixed {
        Vec3Fixed::new(fixed(x), Fixed::ZERO, fixed(z))
    }

    fn close(a: Fixed, b: Fixed) -> bool {
        (a - b).abs() < Fixed::from_num(0.001)
    }

    fn walker() -> Unit {
        Unit::new(1, UnitStats::melee(Team::A), Vec3Fixed::ZERO)
    }

    /// Ground rising one unit per unit of X.
    struct Ramp;

    impl SpatialQuery for Ramp {
        fn raycast_blocked(&self, _: Vec3Fixed, _: Vec2Fixed, _: Fixed) -> bool {
            false
        }

        fn ground_height(&self, position: Vec3Fixed) -> Fixed {
            position.x
        }
    }

    #[test]
    fn test_direct_step_moves_speed_times_dt() {
        let step = compute_step(
            &walker(),
            at(0, 10),
            Fixed::from_num(0.5),
            &[],
            &OpenField::default(),
            &MovementParams::default(),
        );

        assert_eq!(step.steering, Steering::Direct);
        assert!(close(step.position.z, Fixed::from_num(0.5)));
        assert!(close(step.position.x, Fixed::ZERO));
    }

    #[test]
    fn test_height_difference_is_ignored_for_direction() {
        let target = Vec3Fixed::new(Fixed::ZERO, fixed(50), fixed(10));
        let step = compute_step(
            &walker(),
            target,
            Fixed::ONE,
            &[],
            &OpenField::default(),
            &MovementParams::default(),
        );
        assert!(close(step.position.z, Fixed::ONE));
        assert_eq!(step.position.y, Fixed::ZERO);
    }

    #[test]
    fn test_obstacle_deflects_left_first() {
        let field =
            ObstacleField::default().with_obstacle(CircleObstacle::new(fixed(0), fixed(2), fixed(1)));
        let step = compute_step(
            &walker(),
            at(0, 10),
            Fixed::ONE,
            &[],
            &field,
            &MovementParams::default(),
        );

        assert_eq!(step.steering, Steering::AvoidLeft);
        assert!(step.position.x < Fixed::ZERO);
        assert!(step.position.z > Fixed::ZERO);
    }

    #[test]
    fn test_falls_back_to_right_then_direct() {
        let params = MovementParams::default();
        let left_blocked = ObstacleField::default()
            .with_obstacle(CircleObstacle::new(fixed(0), fixed(2), fixed(1)))
            .with_obstacle(CircleObstacle::new(fixed(-2), fixed(2), fixed(1)));
        let (_, steering) = steer(
            Vec3Fixed::ZERO,
            Vec2Fixed::FORWARD,
            fixed(3),
            &[],
            &left_blocked,
            &params,
        );
        assert_eq!(steering, Steering::AvoidRight);

        let boxed_in = left_blocked.with_obstacle(CircleObstacle::new(fixed(2), fixed(2), fixed(1)));
        let (direction, steering) = steer(
            Vec3Fixed::ZERO,
            Vec2Fixed::FORWARD,
            fixed(3),
            &[],
            &boxed_in,
            &params,
        );
        assert_eq!(steering, Steering::Blocked);
        assert_eq!(direction, Vec2Fixed::FORWARD);
    }

    #[test]
    fn test_ally_in_cone_counts_as_blocking() {
        let params = MovementParams::default();
        let ahead_right = Vec3Fixed::new(Fixed::from_num(0.5), Fixed::ZERO, Fixed::from_num(1.5));
        let (_, steering) = steer(
            Vec3Fixed::ZERO,
            Vec2Fixed::FORWARD,
            fixed(2),
            &[ahead_right],
            &OpenField::default(),
            &params,
        );
        assert_eq!(steering, Steering::AvoidLeft);

        // Beside the path, out of the cone.
        let (_, steering) = steer(
            Vec3Fixed::ZERO,
            Vec2Fixed::FORWARD,
            fixed(2),
            &[at(1, 0)],
            &OpenField::default(),
            &params,
        );
        assert_eq!(steering, Steering::Direct);

        let ignore_crowd = MovementParams {
            crowd_avoidance: false,
            ..params
        };
        let (_, steering) = steer(
            Vec3Fixed::ZERO,
            Vec2Fixed::FORWARD,
            fixed(2),
            &[at(0, 1)],
            &OpenField::default(),
            &ignore_crowd,
        );
        assert_eq!(steering, Steering::Direct);
    }

    #[test]
    fn test_stationary_unit_does_not_move() {
        let mut unit = walker();
        unit.stats = unit.stats.with_move_speed(fixed(-2));
        let step = compute_step(
            &unit,
            at(0, 10),
            Fixed::ONE,
            &[],
            &OpenField::default(),
            &MovementParams::default(),
        );
        assert_eq!(step.position, Vec3Fixed::ZERO);
    }

    #[test]
    fn test_ground_snap_follows_terrain() {
        let params = MovementParams {
            vertical_offset: Fixed::from_num(0.5),
            ..MovementParams::default()
        };
        let step = compute_step(&walker(), at(10, 0), fixed(2), &[], &Ramp, &params);
        assert!(close(step.position.x, fixed(2)));
        assert!(close(step.position.y, Fixed::from_num(2.5)));
    }

    #[test]
    fn test_turn_is_bounded_per_step() {
        let east = Vec2Fixed::new(Fixed::ONE, Fixed::ZERO);
        let partial = turn_towards(Vec2Fixed::FORWARD, east, fixed(5), Fixed::from_num(0.1));
        // Half of a quarter turn.
        assert!(close(partial.heading(), Fixed::from_num(std::f64::consts::FRAC_PI_4)));

        let snapped = turn_towards(Vec2Fixed::FORWARD, east, fixed(5), Fixed::ONE);
        assert!(close(snapped.heading(), Fixed::from_num(std::f64::consts::FRAC_PI_2)));
    }
}
