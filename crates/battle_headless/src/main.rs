//! Headless battle runner.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in skirmish and print its metrics as JSON
//! cargo run -p battle_headless -- run
//!
//! # Run a batch of scenarios, each also with the sides swapped
//! cargo run -p battle_headless -- batch scenarios/*.ron --output results/
//!
//! # Verify determinism
//! cargo run -p battle_headless -- verify --scenario scenarios/skirmish.ron --runs 5
//! ```
//!
//! Metrics go to stdout as JSON; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use battle_headless::{
    batch::{run_batch, BatchConfig},
    runner::{run_scenario, verify_determinism},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "battle_headless")]
#[command(about = "Headless battle runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single battle to completion
    Run {
        /// Scenario file to load (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Override the scenario's tick limit
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Write metrics here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run many scenarios in parallel for balance testing
    Batch {
        /// Scenario files (defaults to the built-in skirmish)
        scenarios: Vec<PathBuf>,

        /// Skip the side-swapped run of each scenario
        #[arg(long)]
        no_mirror: bool,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Verify determinism by running the same scenario several times
    Verify {
        /// Scenario to test (defaults to the built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Write the built-in skirmish as a starter scenario file
    Sample {
        /// Where to write the scenario
        #[arg(short, long, default_value = "scenarios/skirmish.ron")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            max_ticks,
            output,
        } => cmd_run(scenario, max_ticks, output),
        Commands::Batch {
            scenarios,
            no_mirror,
            parallel,
            output,
        } => cmd_batch(scenarios, !no_mirror, parallel, output),
        Commands::Verify { scenario, runs } => cmd_verify(scenario, runs),
        Commands::Sample { output } => cmd_sample(output),
    }
}

fn load_or_default(path: Option<PathBuf>) -> Scenario {
    let Some(path) = path else {
        return Scenario::skirmish();
    };
    match Scenario::load(&path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run a single battle
fn cmd_run(scenario: Option<PathBuf>, max_ticks: Option<u64>, output: Option<PathBuf>) {
    let mut scenario = load_or_default(scenario);
    if let Some(limit) = max_ticks {
        scenario.max_ticks = limit;
    }

    tracing::info!(
        scenario = %scenario.name,
        units = scenario.unit_count(),
        max_ticks = scenario.max_ticks,
        "Running battle"
    );

    let metrics = run_scenario(&scenario);
    let json = match serde_json::to_string_pretty(&metrics) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to encode metrics: {}", e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &json) {
                eprintln!("Failed to write metrics: {}", e);
                std::process::exit(1);
            }
            eprintln!("Metrics saved to: {}", path.display());
        }
        None => println!("{}", json),
    }
}

/// Run a batch of battles
fn cmd_batch(scenarios: Vec<PathBuf>, mirror: bool, parallel: u32, output: PathBuf) {
    // Ensure output directory exists
    if let Err(e) = std::fs::create_dir_all(&output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to create output directory");
        eprintln!(
            "FATAL: Cannot create output directory '{}': {}",
            output.display(),
            e
        );
        std::process::exit(1);
    }

    let config = BatchConfig {
        scenarios,
        mirror,
        parallel_battles: parallel,
        output_dir: output.clone(),
    };
    let results = run_batch(config);

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {}", e);
        std::process::exit(1);
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Battles: {}", summary.total_battles);
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("\nOutcomes:");
    eprintln!("  Team A: {:.1}%", summary.win_rate_a * 100.0);
    eprintln!("  Team B: {:.1}%", summary.win_rate_b * 100.0);
    eprintln!("  Draws: {}  Timeouts: {}", summary.draws, summary.timeouts);
    eprintln!(
        "  Ticks: avg {:.0}, min {}, max {}",
        summary.avg_duration_ticks, summary.min_duration_ticks, summary.max_duration_ticks
    );
    if let Some(team) = summary.dominant_team(0.2) {
        eprintln!("\n{} is favoured; check placements and stats", team);
    }

    if !results.errors.is_empty() {
        eprintln!("\nSCENARIO FAILURES:");
        for error in &results.errors {
            eprintln!("  {}: {}", error.scenario.display(), error.message);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Verify determinism
fn cmd_verify(scenario: Option<PathBuf>, runs: u32) {
    let scenario = load_or_default(scenario);
    tracing::info!("Verifying determinism: {} ({} runs)", scenario.name, runs);

    let report = match verify_determinism(&scenario, runs) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("FAIL: Error during verification: {}", e);
            std::process::exit(1);
        }
    };

    if report.is_deterministic() {
        eprintln!("PASS: All {} runs produced identical results", report.hashes.len());
        if let Some(hash) = report.hashes.first() {
            eprintln!("  State hash: {:016x}", hash);
        }
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (run, (hash, ticks)) in report.hashes.iter().zip(&report.ticks).enumerate() {
            eprintln!("  Run {}: {:016x} after {} ticks", run + 1, hash, ticks);
        }
        if !report.snapshot_consistent {
            eprintln!("  Snapshot resume diverged");
        }
        std::process::exit(1);
    }
}

/// Write a starter scenario
fn cmd_sample(output: PathBuf) {
    if let Err(e) = Scenario::skirmish().save(&output) {
        eprintln!("Failed to write scenario: {}", e);
        std::process::exit(1);
    }
    eprintln!("Scenario written to: {}", output.display());
}
