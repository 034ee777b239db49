//! Scenario loading and configuration.
//!
//! A scenario is everything needed to reproduce one battle: the battle
//! config, the terrain, where every unit stands, and a tick limit.

use std::path::Path;

use battle_core::battle::Battle;
use battle_core::components::Team;
use battle_core::data::{BattleConfig, UnitStats};
use battle_core::error::BattleError;
use battle_core::math::{decimal_serde, Fixed, Vec2Fixed, Vec3Fixed, WORLD_LIMIT};
use battle_core::spatial::{CircleObstacle, ObstacleField};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default tick limit: five minutes of battle time at 20 ticks/second.
pub const DEFAULT_MAX_TICKS: u64 = 5 * 60 * 20;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read or write a file.
    #[error("Failed to access scenario file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Failed to write RON.
    #[error("Failed to write scenario: {0}")]
    WriteError(#[from] ron::Error),
    /// Parsed, but the contents are unusable.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] BattleError),
}

/// A complete battle setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Battle tuning.
    #[serde(default)]
    pub config: BattleConfig,
    /// Ground height and obstacles.
    #[serde(default)]
    pub terrain: ObstacleField,
    /// Unit groups to place before the battle starts.
    pub units: Vec<UnitPlacement>,
    /// Tick limit; a battle still running after this many ticks times out.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

const fn default_max_ticks() -> u64 {
    DEFAULT_MAX_TICKS
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check the config and that every unit and obstacle lies inside the
    /// world box.
    pub fn validate(&self) -> Result<(), BattleError> {
        self.config.validate()?;
        let inside = |p: Vec2Fixed| Vec3Fixed::from_ground(p, Fixed::ZERO).within_world();
        for group in &self.units {
            if let Some(point) = group.points().into_iter().find(|&p| !inside(p)) {
                return Err(BattleError::InvalidConfig(format!(
                    "unit group '{}' reaches ({}, {}), outside +/-{WORLD_LIMIT}",
                    group.label, point.x, point.z
                )));
            }
        }
        for obstacle in &self.terrain.obstacles {
            let reach = obstacle.x.abs().max(obstacle.z.abs()).saturating_add(obstacle.radius);
            if reach > Fixed::from_num(WORLD_LIMIT) {
                return Err(BattleError::InvalidConfig(format!(
                    "obstacle at ({}, {}) extends outside +/-{WORLD_LIMIT}",
                    obstacle.x, obstacle.z
                )));
            }
        }
        Ok(())
    }

    /// Write the scenario as pretty RON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ScenarioError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let ron = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, ron)?;
        Ok(())
    }

    /// Number of units the scenario places.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.units.iter().map(|group| group.count).sum()
    }

    /// Place every unit on a fresh, unstarted battle.
    #[must_use]
    pub fn build_battle(&self) -> Battle {
        let mut battle = Battle::new(self.config.clone());
        for group in &self.units {
            for point in group.points() {
                battle.place_unit_grounded(group.stats.clone(), point, &self.terrain);
            }
        }
        tracing::debug!(
            scenario = %self.name,
            units = battle.unit_count(),
            "Scenario placed"
        );
        battle
    }

    /// The same battle with the sides swapped: every unit changes team and
    /// its X coordinate is mirrored.
    ///
    /// Running both versions exposes any advantage a side gets from
    /// placement order rather than from its army.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        let units = self
            .units
            .iter()
            .map(|group| {
                let mut flipped = group.clone();
                flipped.stats.team = group.stats.team.opponent();
                flipped.x = -group.x;
                flipped
            })
            .collect();
        Self {
            name: format!("{} (mirrored)", self.name),
            units,
            terrain: ObstacleField {
                obstacles: self
                    .terrain
                    .obstacles
                    .iter()
                    .map(|o| CircleObstacle::new(-o.x, o.z, o.radius))
                    .collect(),
                ..self.terrain.clone()
            },
            ..self.clone()
        }
    }

    /// Create a standard mixed skirmish: melee lines in front, ranged
    /// lines behind, a pair of rocks in the middle.
    #[must_use]
    pub fn skirmish() -> Self {
        let rock = |z: i32| CircleObstacle::new(Fixed::ZERO, Fixed::from_num(z), Fixed::ONE);
        Self {
            name: "Standard Skirmish".to_string(),
            description: "Four melee and three ranged units per side".to_string(),
            config: BattleConfig::default(),
            terrain: ObstacleField::default()
                .with_obstacle(rock(-3))
                .with_obstacle(rock(3)),
            units: vec![
                UnitPlacement::new("melee", UnitStats::melee(Team::A), -8, 0, 4),
                UnitPlacement::new("ranged", UnitStats::ranged(Team::A), -12, 0, 3),
                UnitPlacement::new("melee", UnitStats::melee(Team::B), 8, 0, 4),
                UnitPlacement::new("ranged", UnitStats::ranged(Team::B), 12, 0, 3),
            ],
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }
}

/// A group of identical units standing in a column along Z.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Free-form label for reports.
    #[serde(default)]
    pub label: String,
    /// Stats, team included.
    pub stats: UnitStats,
    /// Column X.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,
    /// Column centre Z.
    #[serde(with = "decimal_serde")]
    pub z: Fixed,
    /// Number of units.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Gap between neighbours.
    #[serde(with = "decimal_serde", default = "default_spacing")]
    pub spacing: Fixed,
}

const fn default_count() -> u32 {
    1
}

fn default_spacing() -> Fixed {
    Fixed::from_num(2)
}

impl UnitPlacement {
    /// Create a new placement with the default spacing.
    #[must_use]
    pub fn new(label: impl Into<String>, stats: UnitStats, x: i32, z: i32, count: u32) -> Self {
        Self {
            label: label.into(),
            stats,
            x: Fixed::from_num(x),
            z: Fixed::from_num(z),
            count,
            spacing: default_spacing(),
        }
    }

    /// Ground-plane points of the column, centred on `z`.
    #[must_use]
    pub fn points(&self) -> Vec<Vec2Fixed> {
        let count = Fixed::from_num(self.count);
        let first = self.z - self.spacing * (count - Fixed::ONE) / 2;
        (0..self.count)
            .map(|i| Vec2Fixed::new(self.x, first + self.spacing * Fixed::from_num(i)))
            .collect()
    }
}
