//! Error types for the battle simulation.
//!
//! Nothing inside a tick can fail: vanished targets and empty rosters are
//! ordinary states. Errors only surface at the API edge.

use thiserror::Error;

use crate::components::UnitId;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Top-level error type for the battle simulation.
#[derive(Debug, Error)]
pub enum BattleError {
    /// No placed unit has this identifier.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Configuration values that cannot be simulated.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to parse a configuration file.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Snapshot encoding or decoding failed.
    #[error("Invalid battle state: {0}")]
    InvalidState(String),
}
