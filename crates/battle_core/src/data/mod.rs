//! Data structures for battle configuration.
//!
//! These are plain data types meant to be written by hand in RON files.
//! Numbers are written as decimals and converted to fixed-point on load.
//!
//! **Note:** This module contains no IO. File loading is handled by
//! `battle_headless`.

mod battle_data;
mod unit_data;

pub use battle_data::{BattleConfig, MAX_TIME_SCALE, MIN_TIME_SCALE, TICK_RATE};
pub use unit_data::UnitStats;
