//! Headless battle runner for balance testing and CI verification.
//!
//! Loads battles from RON scenario files, runs them on the real simulation
//! without presentation, and writes JSON metrics. This enables:
//!
//! - **Balance testing**: Run many scenarios in parallel and compare sides
//! - **CI verification**: Check that battles are deterministic and that
//!   snapshots resume cleanly
//!
//! # Example
//!
//! ```bash
//! # Write a starter scenario
//! cargo run -p battle_headless -- sample --output scenarios/mine.ron
//!
//! # Run it
//! cargo run -p battle_headless -- run --scenario scenarios/mine.ron
//!
//! # Verify determinism
//! cargo run -p battle_headless -- verify --scenario scenarios/mine.ron
//! ```

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, BattleMetrics, MetricsCollector, TeamMetrics};
pub use runner::{run_scenario, verify_determinism, DeterminismReport};
pub use scenario::{Scenario, ScenarioError, UnitPlacement};
