//! Fixed-point math utilities for deterministic simulation.
//!
//! All battle math is fixed-point so two runs of the same battle produce
//! bit-identical state on every platform. That includes the trigonometry
//! used for steering and facing, which is evaluated with short Taylor
//! series over reduced ranges instead of the platform's `f64` routines.
//!
//! Coordinates follow a Y-up convention: units stand on the `(x, z)` ground
//! plane and `y` is height. Headings are measured from `+z` towards `+x`, so
//! a heading of zero faces `+z` and a positive rotation turns clockwise when
//! seen from above.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Half-width of the world box, in world units, on every axis.
///
/// Two points inside the box are at most about 34,700 units apart, so their
/// squared distance stays well inside the range of [`Fixed`].
pub const WORLD_LIMIT: i32 = 10_000;

/// π as a fixed-point value.
#[must_use]
pub fn pi() -> Fixed {
    Fixed::from_num(fixed::consts::PI)
}

/// Converts degrees to radians.
#[must_use]
pub fn deg_to_rad(degrees: Fixed) -> Fixed {
    degrees * pi() / Fixed::from_num(180)
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// so snapshots restore the exact same value.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for fixed-point numbers written by hand.
///
/// Configuration files carry plain decimals (`move_speed: 1.5`). Values are
/// converted once at load time, so the simulation itself never sees a float.
pub mod decimal_serde {
    use super::Fixed;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a decimal into a fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(raw)
            .ok_or_else(|| D::Error::custom(format!("{raw} is out of fixed-point range")))
    }
}

// ============================================================================
// Scalar Functions
// ============================================================================

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    // One past the answer so exact roots such as sqrt(1) are reachable.
    let mut high = if value > Fixed::ONE {
        value
    } else {
        Fixed::ONE + Fixed::DELTA
    };

    for _ in 0..48 {
        let mid = low + (high - low) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Wraps an angle into `[-π, π]`.
#[must_use]
pub fn wrap_angle(angle: Fixed) -> Fixed {
    let two_pi = pi() * Fixed::from_num(2);
    let mut wrapped = angle % two_pi;
    if wrapped > pi() {
        wrapped -= two_pi;
    } else if wrapped < -pi() {
        wrapped += two_pi;
    }
    wrapped
}

/// Sine and cosine of an angle in radians.
#[must_use]
pub fn sin_cos(angle: Fixed) -> (Fixed, Fixed) {
    let half_pi = pi() / Fixed::from_num(2);
    let x = wrap_angle(angle);

    // Reflect into [-π/2, π/2]; sine is symmetric about ±π/2, cosine flips.
    if x > half_pi {
        let (s, c) = sin_cos_reduced(pi() - x);
        (s, -c)
    } else if x < -half_pi {
        let (s, c) = sin_cos_reduced(-pi() - x);
        (s, -c)
    } else {
        sin_cos_reduced(x)
    }
}

fn sin_cos_reduced(x: Fixed) -> (Fixed, Fixed) {
    let x2 = x * x;

    let mut sin = Fixed::ZERO;
    let mut sin_term = x;
    let mut cos = Fixed::ZERO;
    let mut cos_term = Fixed::ONE;

    for n in 0..7_i32 {
        sin += sin_term;
        cos += cos_term;
        sin_term = -sin_term * x2 / Fixed::from_num((2 * n + 2) * (2 * n + 3));
        cos_term = -cos_term * x2 / Fixed::from_num((2 * n + 1) * (2 * n + 2));
    }

    (sin, cos)
}

/// Four-quadrant arctangent of `y / x`, in `[-π, π]`.
#[must_use]
pub fn atan2(y: Fixed, x: Fixed) -> Fixed {
    if y == Fixed::ZERO {
        return if x < Fixed::ZERO { pi() } else { Fixed::ZERO };
    }

    // atan2(y, x) = 2 * atan(y / (r + x))
    let r = fixed_sqrt(x * x + y * y);
    let denom = r + x;
    let straight_back = if y > Fixed::ZERO { pi() } else { -pi() };
    if denom <= Fixed::ZERO {
        return straight_back;
    }

    match y.checked_div(denom) {
        Some(t) => atan(t) * Fixed::from_num(2),
        None => straight_back,
    }
}

fn atan(t: Fixed) -> Fixed {
    if t.abs() <= Fixed::ONE {
        return atan_unit(t);
    }

    let half_pi = pi() / Fixed::from_num(2);
    let inner = atan_unit(Fixed::ONE / t);
    if t > Fixed::ZERO {
        half_pi - inner
    } else {
        -half_pi - inner
    }
}

/// Arctangent for `|t| <= 1` using one half-angle reduction and a series.
fn atan_unit(t: Fixed) -> Fixed {
    let w = t / (Fixed::ONE + fixed_sqrt(Fixed::ONE + t * t));
    let w2 = w * w;

    let mut sum = Fixed::ZERO;
    let mut power = w;
    for n in 0..9_i32 {
        let term = power / Fixed::from_num(2 * n + 1);
        if n % 2 == 0 {
            sum += term;
        } else {
            sum -= term;
        }
        power *= w2;
    }

    sum * Fixed::from_num(2)
}

// ============================================================================
// Ground Plane Vector
// ============================================================================

/// Fixed-point vector on the ground plane.
///
/// Used for headings and steering where height is irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Z coordinate.
    #[serde(with = "fixed_serde")]
    pub z: Fixed,
}

impl Vec2Fixed {
    /// Create a new ground-plane vector.
    #[must_use]
    pub const fn new(x: Fixed, z: Fixed) -> Self {
        Self { x, z }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// Unit vector facing `+z` (heading zero).
    pub const FORWARD: Self = Self {
        x: Fixed::ZERO,
        z: Fixed::ONE,
    };

    /// Unit vector for a heading in radians.
    #[must_use]
    pub fn from_heading(heading: Fixed) -> Self {
        let (sin, cos) = sin_cos(heading);
        Self::new(sin, cos)
    }

    /// Heading of this vector in radians. Zero for the zero vector.
    #[must_use]
    pub fn heading(self) -> Fixed {
        atan2(self.x, self.z)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.z * other.z
    }

    /// Squared length. Saturates instead of overflowing.
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.x
            .saturating_mul(self.x)
            .saturating_add(self.z.saturating_mul(self.z))
    }

    /// Length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.length_squared())
    }

    /// Normalize vector using fixed-point math. The zero vector stays zero.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.z / len)
    }

    /// Rotate by `angle` radians (positive turns clockwise seen from above).
    #[must_use]
    pub fn rotated(self, angle: Fixed) -> Self {
        let (sin, cos) = sin_cos(angle);
        Self::new(self.x * cos + self.z * sin, self.z * cos - self.x * sin)
    }

    /// Spherical interpolation of a heading towards `target`.
    ///
    /// `t` is clamped to `[0, 1]`; the turn follows the shorter arc. The
    /// result is a unit vector. Zero-length inputs keep the current heading.
    #[must_use]
    pub fn rotate_towards(self, target: Self, t: Fixed) -> Self {
        if target == Self::ZERO {
            return self;
        }
        if self == Self::ZERO {
            return target.normalize();
        }

        let t = t.clamp(Fixed::ZERO, Fixed::ONE);
        let from = self.heading();
        let delta = wrap_angle(target.heading() - from);
        Self::from_heading(from + delta * t)
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.z - rhs.z)
    }
}

impl std::ops::Mul<Fixed> for Vec2Fixed {
    type Output = Self;

    fn mul(self, rhs: Fixed) -> Self::Output {
        Self::new(self.x * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.z)
    }
}

// ============================================================================
// World Vector
// ============================================================================

/// Fixed-point 3D vector (Y up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Height.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
    /// Z coordinate.
    #[serde(with = "fixed_serde")]
    pub z: Fixed,
}

impl Vec3Fixed {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// Build from a ground-plane position and a height.
    #[must_use]
    pub const fn from_ground(ground: Vec2Fixed, y: Fixed) -> Self {
        Self::new(ground.x, y, ground.z)
    }

    /// Projection onto the ground plane.
    #[must_use]
    pub const fn ground(self) -> Vec2Fixed {
        Vec2Fixed::new(self.x, self.z)
    }

    /// Same position at a different height.
    #[must_use]
    pub const fn with_y(self, y: Fixed) -> Self {
        Self::new(self.x, y, self.z)
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates at `Fixed::MAX`, so far-apart points compare as "very far"
    /// instead of wrapping around.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x.saturating_sub(other.x);
        let dy = self.y.saturating_sub(other.y);
        let dz = self.z.saturating_sub(other.z);
        dx.saturating_mul(dx)
            .saturating_add(dy.saturating_mul(dy))
            .saturating_add(dz.saturating_mul(dz))
    }

    /// Whether every coordinate lies within [`WORLD_LIMIT`] of the origin.
    #[must_use]
    pub fn within_world(self) -> bool {
        let limit = Fixed::from_num(WORLD_LIMIT);
        [self.x, self.y, self.z].iter().all(|c| c.abs() <= limit)
    }

    /// Clamp every coordinate into the world box.
    #[must_use]
    pub fn clamp_to_world(self) -> Self {
        let limit = Fixed::from_num(WORLD_LIMIT);
        Self::new(
            self.x.clamp(-limit, limit),
            self.y.clamp(-limit, limit),
            self.z.clamp(-limit, limit),
        )
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Step towards `target` by at most `max_step`, never overshooting.
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: Fixed) -> Self {
        let distance = self.distance(target);
        if distance <= max_step || distance == Fixed::ZERO {
            return target;
        }
        let t = max_step / distance;
        self + (target - self) * t
    }
}

impl std::ops::Add for Vec3Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<Fixed> for Vec3Fixed {
    type Output = Self;

    fn mul(self, rhs: Fixed) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}
