//! # Battle Core
//!
//! Deterministic combat simulation for a two-team auto-battler.
//!
//! Units are placed on a field, the battle starts, and every unit then acts
//! on its own: it finds the nearest living enemy, walks towards it around
//! obstacles and crowding allies, and attacks on a cooldown until one side
//! is wiped out.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! Presentation hooks in through [`events::BattleObserver`] and the
//! environment through [`spatial::SpatialQuery`].
//!
//! ## Crate Structure
//!
//! - [`battle`] - Coordinator: rosters, lifecycle, tick loop
//! - [`unit`] - Per-unit state and damage intake
//! - [`targeting`] - Nearest living enemy selection
//! - [`movement`] - Steering, facing, ground snapping
//! - [`combat`] - Attack decisions and effects
//! - [`projectile`] - Homing projectiles
//! - [`scheduler`] - Delayed attack impacts and ends
//! - [`events`] - Battle events and the observer trait
//! - [`data`] - Unit stats and battle configuration
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battle;
pub mod combat;
pub mod components;
pub mod data;
pub mod error;
pub mod events;
pub mod math;
pub mod movement;
pub mod projectile;
pub mod roster;
pub mod scheduler;
pub mod spatial;
pub mod storage;
pub mod targeting;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battle::Battle;
    pub use crate::components::{AttackKind, CombatPhase, Health, Team, UnitId};
    pub use crate::data::{BattleConfig, UnitStats, TICK_RATE};
    pub use crate::error::{BattleError, Result};
    pub use crate::events::{BattleEvent, BattleObserver, BattleOutcome, TickEvents};
    pub use crate::math::{Fixed, Vec2Fixed, Vec3Fixed};
    pub use crate::projectile::{Projectile, Resolution};
    pub use crate::spatial::{CircleObstacle, ObstacleField, OpenField, SpatialQuery};
    pub use crate::unit::{DamageOutcome, Unit};
}
