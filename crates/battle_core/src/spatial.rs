//! Spatial environment queries.
//!
//! The simulation does not own a physics world. Whoever embeds it supplies
//! a [`SpatialQuery`] that answers two questions: is a straight path
//! blocked, and how high is the ground at a point.

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, fixed_sqrt, Fixed, Vec2Fixed, Vec3Fixed};

/// Environment collaborator consulted by movement.
pub trait SpatialQuery {
    /// Whether an obstacle lies within `max_distance` of `origin` along the
    /// ground-plane `direction` (unit length).
    fn raycast_blocked(&self, origin: Vec3Fixed, direction: Vec2Fixed, max_distance: Fixed)
        -> bool;

    /// Ground height below `position`.
    fn ground_height(&self, position: Vec3Fixed) -> Fixed;
}

/// Flat field with no obstacles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenField {
    /// Ground height everywhere.
    #[serde(with = "decimal_serde")]
    pub height: Fixed,
}

impl SpatialQuery for OpenField {
    fn raycast_blocked(&self, _origin: Vec3Fixed, _direction: Vec2Fixed, _max: Fixed) -> bool {
        false
    }

    fn ground_height(&self, _position: Vec3Fixed) -> Fixed {
        self.height
    }
}

/// Vertical cylinder that blocks movement, described by its footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleObstacle {
    /// Center X.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,
    /// Center Z.
    #[serde(with = "decimal_serde")]
    pub z: Fixed,
    /// Footprint radius.
    #[serde(with = "decimal_serde")]
    pub radius: Fixed,
}

impl CircleObstacle {
    /// Create an obstacle.
    #[must_use]
    pub const fn new(x: Fixed, z: Fixed, radius: Fixed) -> Self {
        Self { x, z, radius }
    }

    /// Whether the ray touches the footprint within `max_distance`.
    fn ray_hit(&self, origin: Vec2Fixed, direction: Vec2Fixed, max_distance: Fixed) -> bool {
        let offset = origin - Vec2Fixed::new(self.x, self.z);
        let c = offset.length_squared() - self.radius.saturating_mul(self.radius);
        if c <= Fixed::ZERO {
            // Starting inside the footprint.
            return true;
        }

        let b = offset.dot(direction);
        if b > Fixed::ZERO {
            return false;
        }

        let discriminant = b * b - c;
        if discriminant < Fixed::ZERO {
            return false;
        }

        let distance = -b - fixed_sqrt(discriminant);
        distance <= max_distance
    }
}

/// Flat field scattered with circular obstacles.
///
/// # Example RON
///
/// ```ron
/// (
///     ground_height: 0.0,
///     obstacles: [(x: 0.0, z: 4.0, radius: 1.0)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObstacleField {
    /// Ground height everywhere.
    #[serde(with = "decimal_serde", default)]
    pub ground_height: Fixed,
    /// Obstacles.
    #[serde(default)]
    pub obstacles: Vec<CircleObstacle>,
}

impl ObstacleField {
    /// Builder method to add an obstacle.
    #[must_use]
    pub fn with_obstacle(mut self, obstacle: CircleObstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }
}

impl SpatialQuery for ObstacleField {
    fn raycast_blocked(
        &self,
        origin: Vec3Fixed,
        direction: Vec2Fixed,
        max_distance: Fixed,
    ) -> bool {
        if max_distance <= Fixed::ZERO || direction == Vec2Fixed::ZERO {
            return false;
        }
        self.obstacles
            .iter()
            .any(|obstacle| obstacle.ray_hit(origin.ground(), direction, max_distance))
    }

    fn ground_height(&self, _position: Vec3Fixed) -> Fixed {
        self.ground_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn field() -> ObstacleField {
        ObstacleField::default().with_obstacle(CircleObstacle::new(fixed(0), fixed(4), fixed(1)))
    }

    #[test]
    fn test_ray_hits_obstacle_ahead() {
        assert!(field().raycast_blocked(Vec3Fixed::ZERO, Vec2Fixed::FORWARD, fixed(5)));
    }

    #[test]
    fn test_ray_stops_short() {
        // Contact is at distance 3.
        assert!(!field().raycast_blocked(Vec3Fixed::ZERO, Vec2Fixed::FORWARD, fixed(2)));
    }

    #[test]
    fn test_ray_misses_sideways_and_behind() {
        let east = Vec2Fixed::new(fixed(1), fixed(0));
        assert!(!field().raycast_blocked(Vec3Fixed::ZERO, east, fixed(10)));
        assert!(!field().raycast_blocked(Vec3Fixed::ZERO, -Vec2Fixed::FORWARD, fixed(10)));
    }

    #[test]
    fn test_ray_from_inside_is_blocked() {
        let inside = Vec3Fixed::new(fixed(0), fixed(0), fixed(4));
        assert!(field().raycast_blocked(inside, Vec2Fixed::FORWARD, fixed(1)));
    }

    #[test]
    fn test_open_field() {
        let open = OpenField { height: fixed(2) };
        assert!(!open.raycast_blocked(Vec3Fixed::ZERO, Vec2Fixed::FORWARD, fixed(100)));
        assert_eq!(open.ground_height(Vec3Fixed::ZERO), fixed(2));
    }

    #[test]
    fn test_obstacle_field_from_ron() {
        let parsed: ObstacleField =
            ron::from_str("(ground_height: 0.5, obstacles: [(x: 1.0, z: 2.0, radius: 0.5)])")
                .unwrap();
        assert_eq!(parsed.ground_height, Fixed::from_num(0.5));
        assert_eq!(parsed.obstacles[0].radius, Fixed::from_num(0.5));
    }
}
