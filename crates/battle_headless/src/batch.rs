//! Batch battle runner for balance testing.
//!
//! Runs many scenarios in parallel using rayon and aggregates their
//! metrics. Battles are deterministic, so a batch varies the scenarios
//! rather than repeating one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, BattleMetrics};
use crate::runner::run_scenario;
use crate::scenario::Scenario;

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario files to run. Empty means the built-in skirmish.
    pub scenarios: Vec<PathBuf>,
    /// Also run every scenario with the sides swapped.
    pub mirror: bool,
    /// Maximum parallel battles (0 = use rayon default).
    pub parallel_battles: u32,
    /// Output directory for results.
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenarios: Vec::new(),
            mirror: true,
            parallel_battles: 0,
            output_dir: PathBuf::from("results"),
        }
    }
}

impl BatchConfig {
    /// Create config for a set of scenario files.
    #[must_use]
    pub fn new(scenarios: Vec<PathBuf>) -> Self {
        Self {
            scenarios,
            ..Default::default()
        }
    }

    /// Set output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Enable or disable mirrored runs.
    #[must_use]
    pub const fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual battle metrics.
    pub battles: Vec<BattleMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Scenarios that could not be run.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// A scenario that failed to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Scenario path.
    pub scenario: PathBuf,
    /// Error message.
    pub message: String,
}

fn load_scenarios(config: &BatchConfig) -> (Vec<Scenario>, Vec<BatchError>) {
    if config.scenarios.is_empty() {
        return (vec![Scenario::skirmish()], Vec::new());
    }

    let mut scenarios = Vec::new();
    let mut errors = Vec::new();
    for path in &config.scenarios {
        match Scenario::load(path) {
            Ok(scenario) => scenarios.push(scenario),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping scenario");
                errors.push(BatchError {
                    scenario: path.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    (scenarios, errors)
}

/// Run a batch of battles.
#[must_use]
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let (loaded, errors) = load_scenarios(&config);

    let jobs: Vec<Scenario> = if config.mirror {
        loaded
            .into_iter()
            .flat_map(|scenario| {
                let mirrored = scenario.mirrored();
                [scenario, mirrored]
            })
            .collect()
    } else {
        loaded
    };

    info!(
        battles = jobs.len(),
        failed_loads = errors.len(),
        mirror = config.mirror,
        "Starting batch run"
    );

    // Configure thread pool if specified
    if config.parallel_battles > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_battles as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let completed = AtomicU32::new(0);
    let total = jobs.len();
    let battles: Vec<BattleMetrics> = jobs
        .into_par_iter()
        .map(|scenario| {
            let metrics = run_scenario(&scenario);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("Progress: {}/{}", done, total);
            metrics
        })
        .collect();

    let summary = BatchSummary::from_battles(&battles);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} battles in {:.1}s ({:.1} battles/sec)",
        battles.len(),
        duration_seconds,
        battles.len() as f64 / duration_seconds.max(0.001)
    );

    BatchResults {
        config,
        battles,
        summary,
        duration_seconds,
        errors,
    }
}
