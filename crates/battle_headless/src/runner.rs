//! Single-battle execution.
//!
//! Runs a [`Scenario`] to completion on the real simulation and collects
//! [`BattleMetrics`] along the way.

use std::time::Instant;

use battle_core::battle::Battle;
use battle_core::error::Result;
use battle_core::events::{BattleObserver, BattleOutcome};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BattleMetrics, MetricsCollector};
use crate::scenario::Scenario;

/// Run `scenario` until one side is wiped out or its tick limit is reached.
#[must_use]
pub fn run_scenario(scenario: &Scenario) -> BattleMetrics {
    let wall_clock = Instant::now();
    let mut battle = scenario.build_battle();

    let participants: Vec<_> = battle
        .unit_ids()
        .into_iter()
        .filter_map(|id| battle.unit(id).map(|unit| (id, unit.team())))
        .collect();
    let mut collector = MetricsCollector::new(&scenario.name, participants);

    for event in battle.start_battle() {
        collector.on_event(&event);
    }

    let mut ticks = 0u64;
    while battle.is_started() && ticks < scenario.max_ticks {
        let events = battle.step(&scenario.terrain);
        collector.set_tick(events.tick);
        events.dispatch(&mut collector);
        ticks += 1;
    }

    let outcome = finished_outcome(&battle);
    if outcome.is_none() {
        warn!(
            scenario = %scenario.name,
            max_ticks = scenario.max_ticks,
            "Battle hit its tick limit"
        );
    }

    let metrics = collector.finalize(
        outcome,
        ticks,
        battle.elapsed().to_num::<f64>(),
        battle.state_hash(),
    );

    info!(
        scenario = %scenario.name,
        end = %metrics.end_condition,
        ticks = metrics.duration_ticks,
        survivors_a = metrics.team_a.survivors,
        survivors_b = metrics.team_b.survivors,
        wall_ms = wall_clock.elapsed().as_millis(),
        "Battle finished"
    );

    metrics
}

fn finished_outcome(battle: &Battle) -> Option<BattleOutcome> {
    if battle.is_started() {
        None
    } else {
        battle.outcome()
    }
}

/// Result of a determinism check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Ticks each run lasted.
    pub ticks: Vec<u64>,
    /// Whether a battle restored from a mid-battle snapshot ended in the
    /// same state as one that ran straight through.
    pub snapshot_consistent: bool,
}

impl DeterminismReport {
    /// Every run ended identically and the snapshot resumed cleanly.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        let same_hash = self.hashes.windows(2).all(|pair| pair[0] == pair[1]);
        let same_length = self.ticks.windows(2).all(|pair| pair[0] == pair[1]);
        same_hash && same_length && self.snapshot_consistent
    }
}

/// Run `scenario` `runs` times and check that every run ends in the same
/// state, then check that snapshotting halfway changes nothing.
pub fn verify_determinism(scenario: &Scenario, runs: u32) -> Result<DeterminismReport> {
    let results: Vec<BattleMetrics> = (0..runs.max(1)).map(|_| run_scenario(scenario)).collect();
    let hashes: Vec<u64> = results.iter().map(|m| m.final_state_hash).collect();
    let ticks: Vec<u64> = results.iter().map(|m| m.duration_ticks).collect();

    let split = ticks.first().copied().unwrap_or(0) / 2;
    let snapshot_consistent = verify_snapshot_resume(scenario, split)?;

    let report = DeterminismReport {
        hashes,
        ticks,
        snapshot_consistent,
    };
    debug!(
        scenario = %scenario.name,
        runs,
        deterministic = report.is_deterministic(),
        "Determinism check complete"
    );
    Ok(report)
}

/// Run `split` ticks, round-trip the battle through its binary snapshot,
/// finish both copies, and compare their final hashes.
pub fn verify_snapshot_resume(scenario: &Scenario, split: u64) -> Result<bool> {
    let mut original = scenario.build_battle();
    original.start_battle();
    for _ in 0..split {
        if !original.is_started() {
            break;
        }
        original.step(&scenario.terrain);
    }

    let mut restored = Battle::deserialize(&original.serialize()?)?;
    if restored.state_hash() != original.state_hash() {
        return Ok(false);
    }

    let remaining = scenario.max_ticks.saturating_sub(split);
    for battle in [&mut original, &mut restored] {
        let mut ticks = 0;
        while battle.is_started() && ticks < remaining {
            battle.step(&scenario.terrain);
            ticks += 1;
        }
    }

    Ok(original.state_hash() == restored.state_hash())
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::components::Team;
    use battle_core::data::UnitStats;
    use crate::scenario::UnitPlacement;

    fn duel() -> Scenario {
        Scenario {
            name: "duel".to_string(),
            units: vec![
                UnitPlacement::new("a", UnitStats::melee(Team::A), -3, 0, 1),
                UnitPlacement::new("b", UnitStats::melee(Team::B), 3, 0, 1),
            ],
            terrain: Default::default(),
            ..Scenario::skirmish()
        }
    }

    #[test]
    fn test_run_skirmish_finishes() {
        let metrics = run_scenario(&Scenario::skirmish());

        assert_ne!(metrics.end_condition, "timeout");
        assert_eq!(metrics.team_a.starting_units, 7);
        assert_eq!(metrics.team_b.starting_units, 7);
        assert_eq!(metrics.team_a.kills, metrics.team_b.losses);
        assert_eq!(metrics.team_b.kills, metrics.team_a.losses);
        assert_eq!(metrics.team_a.damage_dealt, metrics.team_b.damage_taken);
        assert!(metrics.team_a.projectiles_fired > 0);
        assert!(metrics.duration_seconds > 0.0);
    }

    #[test]
    fn test_every_fired_projectile_resolves_by_battle_end() {
        let metrics = run_scenario(&Scenario::skirmish());
        assert_ne!(metrics.end_condition, "timeout");
        for side in [&metrics.team_a, &metrics.team_b] {
            let resolved =
                side.projectiles_hit + side.projectiles_expired + side.projectiles_fizzled;
            assert_eq!(resolved, side.projectiles_fired);
        }
    }

    #[test]
    fn test_winner_has_survivors() {
        let metrics = run_scenario(&Scenario::skirmish());
        if let Some(team) = metrics.winner {
            assert!(metrics.team(team).survivors > 0);
            assert_eq!(metrics.team(team.opponent()).survivors, 0);
        }
    }

    #[test]
    fn test_tick_limit_times_out() {
        let scenario = Scenario {
            max_ticks: 3,
            ..duel()
        };
        let metrics = run_scenario(&scenario);

        assert_eq!(metrics.end_condition, "timeout");
        assert_eq!(metrics.winner, None);
        assert_eq!(metrics.duration_ticks, 3);
        assert_eq!(metrics.team_a.survivors, 1);
    }

    #[test]
    fn test_one_sided_scenario_ends_at_start() {
        let scenario = Scenario {
            units: vec![UnitPlacement::new("a", UnitStats::melee(Team::A), 0, 0, 2)],
            ..duel()
        };
        let metrics = run_scenario(&scenario);

        assert_eq!(metrics.winner, Some(Team::A));
        assert_eq!(metrics.duration_ticks, 0);
        assert_eq!(metrics.team_a.survivors, 2);
    }

    #[test]
    fn test_verify_determinism() {
        let report = verify_determinism(&Scenario::skirmish(), 3).unwrap();
        assert_eq!(report.hashes.len(), 3);
        assert!(report.snapshot_consistent);
        assert!(report.is_deterministic());
    }

    #[test]
    fn test_report_flags_mismatch() {
        let report = DeterminismReport {
            hashes: vec![1, 2],
            ticks: vec![10, 10],
            snapshot_consistent: true,
        };
        assert!(!report.is_deterministic());
    }
}
