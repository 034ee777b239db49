//! Balance testing utilities for headless battles.
//!
//! Runs many simulated battles between army compositions and aggregates
//! the outcomes, to check that matchups stay within an acceptable win-rate
//! band when unit presets change.

use battle_core::battle::Battle;
use battle_core::components::Team;
use battle_core::data::{BattleConfig, UnitStats};
use battle_core::events::BattleOutcome;
use battle_core::spatial::OpenField;
use serde::Serialize;

use crate::fixtures::{line_up, EventLog};

/// Result of a simulated battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BattleResult {
    /// Outcome (None on timeout).
    pub outcome: Option<BattleOutcome>,
    /// Ticks elapsed.
    pub ticks: u64,
    /// Starting health pool of team A.
    pub army_hp_a: u32,
    /// Starting health pool of team B.
    pub army_hp_b: u32,
    /// Health left on team A.
    pub remaining_hp_a: u32,
    /// Health left on team B.
    pub remaining_hp_b: u32,
}

impl BattleResult {
    /// Winning team, if any.
    #[must_use]
    pub fn winner(&self) -> Option<Team> {
        self.outcome.and_then(BattleOutcome::winner)
    }
}

/// Statistics for a set of battles.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BattleStats {
    /// Total battles run.
    pub total_battles: u32,
    /// Wins for team A.
    pub wins_a: u32,
    /// Wins for team B.
    pub wins_b: u32,
    /// Draws (simultaneous elimination).
    pub draws: u32,
    /// Battles that hit the tick limit.
    pub timeouts: u32,
    /// Average ticks to resolution.
    pub avg_ticks: f64,
}

impl BattleStats {
    /// Aggregate a set of results.
    #[must_use]
    pub fn from_results(results: &[BattleResult]) -> Self {
        let mut stats = Self::default();
        let mut total_ticks = 0u64;

        for result in results {
            stats.total_battles += 1;
            total_ticks += result.ticks;
            match result.outcome {
                Some(BattleOutcome::Victory(Team::A)) => stats.wins_a += 1,
                Some(BattleOutcome::Victory(Team::B)) => stats.wins_b += 1,
                Some(BattleOutcome::Draw) => stats.draws += 1,
                None => stats.timeouts += 1,
            }
        }

        if stats.total_battles > 0 {
            stats.avg_ticks = total_ticks as f64 / f64::from(stats.total_battles);
        }
        stats
    }

    /// Calculate win rate for team A (0.0 to 1.0).
    #[must_use]
    pub fn win_rate_a(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.wins_a) / f64::from(self.total_battles)
    }

    /// Calculate win rate for team B (0.0 to 1.0).
    #[must_use]
    pub fn win_rate_b(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.wins_b) / f64::from(self.total_battles)
    }

    /// Check if the matchup is balanced (team A's rate within range).
    #[must_use]
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.win_rate_a();
        rate >= min_rate && rate <= max_rate
    }
}

/// Unit composition for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArmyComposition {
    /// Number of melee units.
    pub melee: u32,
    /// Number of ranged units.
    pub ranged: u32,
}

impl ArmyComposition {
    /// Create a new army composition.
    #[must_use]
    pub const fn new(melee: u32, ranged: u32) -> Self {
        Self { melee, ranged }
    }

    /// Total unit count.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.melee + self.ranged
    }

    /// Total starting health with the default presets.
    #[must_use]
    pub fn total_hp(&self) -> u32 {
        let melee = UnitStats::melee(Team::A).max_health;
        let ranged = UnitStats::ranged(Team::A).max_health;
        self.melee * melee + self.ranged * ranged
    }

    /// Place this army for `team`: melee in front, ranged behind.
    ///
    /// Team A deploys on negative X, team B on positive X, both
    /// `front` units from the centre line.
    pub fn deploy(&self, battle: &mut Battle, team: Team, front: i32) {
        let side = match team {
            Team::A => -1,
            Team::B => 1,
        };
        line_up(
            battle,
            &UnitStats::melee(team),
            self.melee as usize,
            side * front,
            2,
        );
        line_up(
            battle,
            &UnitStats::ranged(team),
            self.ranged as usize,
            side * (front + 3),
            2,
        );
    }
}

/// Fight one battle between two compositions on open ground.
#[must_use]
pub fn run_matchup(
    a: ArmyComposition,
    b: ArmyComposition,
    config: &BattleConfig,
    max_ticks: u64,
) -> BattleResult {
    let mut battle = Battle::new(config.clone());
    a.deploy(&mut battle, Team::A, 6);
    b.deploy(&mut battle, Team::B, 6);

    let mut log = EventLog::default();
    let outcome = battle.run_until_finished(&OpenField::default(), max_ticks, &mut log);

    let remaining = |team: Team| -> u32 {
        battle
            .unit_ids()
            .into_iter()
            .filter_map(|id| battle.unit(id))
            .filter(|unit| unit.team() == team && !unit.is_dead())
            .map(|unit| unit.health.current)
            .sum()
    };

    tracing::debug!(
        ?outcome,
        ticks = battle.current_tick(),
        events = log.events.len(),
        "Matchup finished"
    );

    BattleResult {
        outcome,
        ticks: battle.current_tick(),
        army_hp_a: a.total_hp(),
        army_hp_b: b.total_hp(),
        remaining_hp_a: remaining(Team::A),
        remaining_hp_b: remaining(Team::B),
    }
}

/// Fight a matchup under each config and aggregate the results.
#[must_use]
pub fn run_series(
    a: ArmyComposition,
    b: ArmyComposition,
    configs: &[BattleConfig],
    max_ticks: u64,
) -> BattleStats {
    let results: Vec<_> = configs
        .iter()
        .map(|config| run_matchup(a, b, config, max_ticks))
        .collect();
    BattleStats::from_results(&results)
}
