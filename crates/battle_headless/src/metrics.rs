//! Battle metrics collection for balance analysis.
//!
//! A [`MetricsCollector`] listens to battle events and builds a
//! [`BattleMetrics`] record; [`BatchSummary`] aggregates many of them.

use std::collections::HashMap;

use battle_core::components::{ProjectileId, Team, UnitId};
use battle_core::events::{BattleObserver, BattleOutcome};
use battle_core::math::Vec3Fixed;
use battle_core::projectile::Resolution;
use serde::{Deserialize, Serialize};

/// Complete metrics for a single battle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleMetrics {
    /// Scenario name.
    pub scenario: String,
    /// Ticks simulated.
    pub duration_ticks: u64,
    /// Battle time in seconds.
    pub duration_seconds: f64,
    /// Winning team (None = draw or timeout).
    pub winner: Option<Team>,
    /// How the battle ended: "victory", "draw" or "timeout".
    pub end_condition: String,
    /// Team A metrics.
    pub team_a: TeamMetrics,
    /// Team B metrics.
    pub team_b: TeamMetrics,
    /// Final battle state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl BattleMetrics {
    /// Metrics for one side.
    #[must_use]
    pub const fn team(&self, team: Team) -> &TeamMetrics {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }

    fn team_mut(&mut self, team: Team) -> &mut TeamMetrics {
        match team {
            Team::A => &mut self.team_a,
            Team::B => &mut self.team_b,
        }
    }
}

/// Metrics for one side in a battle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMetrics {
    /// Units that started the battle.
    pub starting_units: u32,
    /// Units alive at the end.
    pub survivors: u32,
    /// Units lost.
    pub losses: u32,
    /// Enemy units killed.
    pub kills: u32,

    // === Combat ===
    /// Attacks started.
    pub attacks: u32,
    /// Special attacks triggered.
    pub special_attacks: u32,
    /// Total damage dealt.
    pub damage_dealt: u64,
    /// Total damage taken.
    pub damage_taken: u64,

    // === Projectiles ===
    /// Projectiles launched.
    pub projectiles_fired: u32,
    /// Projectiles that reached their target.
    pub projectiles_hit: u32,
    /// Projectiles that ran out of lifetime.
    pub projectiles_expired: u32,
    /// Projectiles whose target vanished.
    pub projectiles_fizzled: u32,

    /// Tick of the first damage dealt.
    pub first_damage_tick: Option<u64>,
}

impl TeamMetrics {
    /// Share of launched projectiles that hit, 0 when none were fired.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.projectiles_fired == 0 {
            return 0.0;
        }
        f64::from(self.projectiles_hit) / f64::from(self.projectiles_fired)
    }
}

/// Summary statistics across multiple battles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total battles run.
    pub total_battles: u32,
    /// Battles won by team A.
    pub wins_a: u32,
    /// Battles won by team B.
    pub wins_b: u32,
    /// Draws.
    pub draws: u32,
    /// Battles that hit their tick limit.
    pub timeouts: u32,
    /// Win rate of team A.
    pub win_rate_a: f64,
    /// Win rate of team B.
    pub win_rate_b: f64,
    /// Average battle duration in ticks.
    pub avg_duration_ticks: f64,
    /// Shortest battle.
    pub min_duration_ticks: u64,
    /// Longest battle.
    pub max_duration_ticks: u64,
    /// Average survivors of team A.
    pub avg_survivors_a: f64,
    /// Average survivors of team B.
    pub avg_survivors_b: f64,
}

impl BatchSummary {
    /// Calculate summary from a list of battle metrics.
    #[must_use]
    pub fn from_battles(battles: &[BattleMetrics]) -> Self {
        if battles.is_empty() {
            return Self::default();
        }

        let total = u32::try_from(battles.len()).unwrap_or(u32::MAX);
        let mut summary = Self {
            total_battles: total,
            min_duration_ticks: u64::MAX,
            ..Default::default()
        };

        let mut duration_sum = 0u64;
        let mut survivors_a = 0u64;
        let mut survivors_b = 0u64;

        for battle in battles {
            duration_sum += battle.duration_ticks;
            summary.min_duration_ticks = summary.min_duration_ticks.min(battle.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(battle.duration_ticks);
            survivors_a += u64::from(battle.team_a.survivors);
            survivors_b += u64::from(battle.team_b.survivors);

            match (battle.winner, battle.end_condition.as_str()) {
                (Some(Team::A), _) => summary.wins_a += 1,
                (Some(Team::B), _) => summary.wins_b += 1,
                (None, "timeout") => summary.timeouts += 1,
                (None, _) => summary.draws += 1,
            }
        }

        let n = f64::from(total);
        summary.avg_duration_ticks = duration_sum as f64 / n;
        summary.avg_survivors_a = survivors_a as f64 / n;
        summary.avg_survivors_b = survivors_b as f64 / n;
        summary.win_rate_a = f64::from(summary.wins_a) / n;
        summary.win_rate_b = f64::from(summary.wins_b) / n;
        summary
    }

    /// Check if both win rates are within `threshold` of each other's.
    #[must_use]
    pub fn is_balanced(&self, threshold: f64) -> bool {
        (self.win_rate_a - self.win_rate_b).abs() <= threshold
    }

    /// Team with a win rate more than `threshold` above the other's.
    #[must_use]
    pub fn dominant_team(&self, threshold: f64) -> Option<Team> {
        if self.win_rate_a - self.win_rate_b > threshold {
            Some(Team::A)
        } else if self.win_rate_b - self.win_rate_a > threshold {
            Some(Team::B)
        } else {
            None
        }
    }
}

/// Observer that turns battle events into [`BattleMetrics`].
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: BattleMetrics,
    /// Team of every unit that took part.
    teams: HashMap<UnitId, Team>,
    /// Team of the shooter of every projectile seen.
    shooters: HashMap<ProjectileId, Team>,
    current_tick: u64,
}

impl MetricsCollector {
    /// Create a collector that knows the team of every participant.
    pub fn new(scenario: &str, units: impl IntoIterator<Item = (UnitId, Team)>) -> Self {
        Self {
            metrics: BattleMetrics {
                scenario: scenario.to_string(),
                ..Default::default()
            },
            teams: units.into_iter().collect(),
            shooters: HashMap::new(),
            current_tick: 0,
        }
    }

    /// Update the current tick.
    pub fn set_tick(&mut self, tick: u64) {
        self.current_tick = tick;
    }

    fn side(&mut self, unit: UnitId) -> Option<&mut TeamMetrics> {
        let team = *self.teams.get(&unit)?;
        Some(self.metrics.team_mut(team))
    }

    /// Finalize and return the metrics.
    #[must_use]
    pub fn finalize(
        mut self,
        outcome: Option<BattleOutcome>,
        duration_ticks: u64,
        duration_seconds: f64,
        final_state_hash: u64,
    ) -> BattleMetrics {
        self.metrics.duration_ticks = duration_ticks;
        self.metrics.duration_seconds = duration_seconds;
        self.metrics.final_state_hash = final_state_hash;
        self.metrics.winner = outcome.and_then(BattleOutcome::winner);
        self.metrics.end_condition = match outcome {
            Some(BattleOutcome::Victory(_)) => "victory",
            Some(BattleOutcome::Draw) => "draw",
            None => "timeout",
        }
        .to_string();

        for team in [Team::A, Team::B] {
            let side = self.metrics.team_mut(team);
            side.survivors = side.starting_units.saturating_sub(side.losses);
        }

        self.metrics
    }

    /// Get current metrics (immutable).
    #[must_use]
    pub const fn current(&self) -> &BattleMetrics {
        &self.metrics
    }
}

impl BattleObserver for MetricsCollector {
    fn on_battle_started(&mut self, team_a: usize, team_b: usize) {
        self.metrics.team_a.starting_units = u32::try_from(team_a).unwrap_or(u32::MAX);
        self.metrics.team_b.starting_units = u32::try_from(team_b).unwrap_or(u32::MAX);
    }

    fn on_attack_started(&mut self, unit: UnitId, _target: UnitId, _variant: u8) {
        if let Some(side) = self.side(unit) {
            side.attacks += 1;
        }
    }

    fn on_special_attack(&mut self, unit: UnitId, _counter: u32) {
        if let Some(side) = self.side(unit) {
            side.special_attacks += 1;
        }
    }

    fn on_projectile_spawned(
        &mut self,
        projectile: ProjectileId,
        source: UnitId,
        _target: UnitId,
        _position: Vec3Fixed,
    ) {
        if let Some(&team) = self.teams.get(&source) {
            self.shooters.insert(projectile, team);
            self.metrics.team_mut(team).projectiles_fired += 1;
        }
    }

    fn on_projectile_resolved(
        &mut self,
        projectile: ProjectileId,
        resolution: Resolution,
        _position: Vec3Fixed,
    ) {
        let Some(team) = self.shooters.remove(&projectile) else {
            return;
        };
        let side = self.metrics.team_mut(team);
        match resolution {
            Resolution::Hit => side.projectiles_hit += 1,
            Resolution::Expired => side.projectiles_expired += 1,
            Resolution::Fizzled => side.projectiles_fizzled += 1,
        }
    }

    fn on_damage_applied(&mut self, unit: UnitId, source: UnitId, amount: u32, _remaining: u32) {
        let tick = self.current_tick;
        if let Some(side) = self.side(source) {
            side.damage_dealt += u64::from(amount);
            if amount > 0 && side.first_damage_tick.is_none() {
                side.first_damage_tick = Some(tick);
            }
        }
        if let Some(side) = self.side(unit) {
            side.damage_taken += u64::from(amount);
        }
    }

    fn on_unit_died(&mut self, _unit: UnitId, team: Team) {
        self.metrics.team_mut(team).losses += 1;
        self.metrics.team_mut(team.opponent()).kills += 1;
    }
}
