//! End-to-end tests for the headless runner.
//!
//! Scenarios are written to disk, loaded back, run, and checked against
//! the determinism harness from `battle_test_utils`.

use battle_headless::{run_batch, run_scenario, BatchConfig, BatchResults, Scenario};

// =============================================================================
// Scenario Files
// =============================================================================

mod files {
    use super::*;

    #[test]
    fn sample_scenario_runs_like_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skirmish.ron");
        Scenario::skirmish().save(&path).unwrap();

        let loaded = Scenario::load(&path).unwrap();
        let from_file = run_scenario(&loaded);
        let builtin = run_scenario(&Scenario::skirmish());

        assert_eq!(from_file.final_state_hash, builtin.final_state_hash);
        assert_eq!(from_file.duration_ticks, builtin.duration_ticks);
        assert_eq!(from_file.winner, builtin.winner);
    }

    #[test]
    fn batch_writes_loadable_results() {
        let dir = tempfile::tempdir().unwrap();
        let scenario_path = dir.path().join("skirmish.ron");
        Scenario::skirmish().save(&scenario_path).unwrap();

        let output = dir.path().join("results");
        let results = run_batch(BatchConfig::new(vec![scenario_path]).with_output(output.clone()));
        let results_path = output.join("batch_results.json");
        results.save(&results_path).unwrap();

        let loaded = BatchResults::load(&results_path).unwrap();
        assert_eq!(loaded.battles.len(), 2);
        assert_eq!(loaded.summary.total_battles, 2);
        assert!(loaded.errors.is_empty());
    }
}

// =============================================================================
// Determinism
// =============================================================================

mod determinism {
    use super::*;
    use battle_test_utils::determinism::{find_first_divergence, verify_battle_determinism_on};

    #[test]
    fn scenario_battles_are_deterministic_on_their_terrain() {
        let scenario = Scenario::skirmish();
        assert!(verify_battle_determinism_on(
            || scenario.build_battle(),
            300,
            &scenario.terrain
        ));
    }

    #[test]
    fn mirrored_scenario_does_not_diverge_between_runs() {
        let mirrored = Scenario::skirmish().mirrored();
        assert_eq!(find_first_divergence(|| mirrored.build_battle(), 300), None);
    }

    #[test]
    fn mirrored_skirmish_leaves_one_side_standing() {
        let scenario = Scenario::skirmish();
        for metrics in [run_scenario(&scenario), run_scenario(&scenario.mirrored())] {
            assert_ne!(metrics.end_condition, "timeout");
            assert!(metrics.team_a.survivors == 0 || metrics.team_b.survivors == 0);
            assert_eq!(metrics.team_a.starting_units, 7);
        }
    }
}
