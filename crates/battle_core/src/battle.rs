//! Battle coordinator and tick driver.
//!
//! [`Battle`] owns every unit, projectile, roster, and pending timer. It is
//! the only writer of the rosters and the only place where damage is
//! applied, so every death flows through one path and is reported once.
//!
//! # Tick Order
//!
//! Each tick of a running battle:
//! 1. **Clock** - advance battle time by `dt`
//! 2. **Timers** - run attack impacts and attack ends that came due
//! 3. **Units** - in ascending id order: cooldown, targeting, then move,
//!    attack, or wait
//! 4. **Projectiles** - in ascending id order: home, hit, expire, or fizzle
//! 5. **Sweep** - drop units that died this tick from storage
//! 6. **Outcome** - end the battle if a roster is empty
//!
//! # Example
//!
//! ```
//! use battle_core::prelude::*;
//!
//! let mut battle = Battle::new(BattleConfig::default());
//! battle.place_unit(UnitStats::melee(Team::A), Vec3Fixed::ZERO);
//! battle.place_unit(
//!     UnitStats::melee(Team::B),
//!     Vec3Fixed::new(Fixed::from_num(6), Fixed::ZERO, Fixed::ZERO),
//! );
//!
//! battle.start_battle();
//! let field = OpenField::default();
//! while battle.is_started() {
//!     battle.step(&field);
//! }
//! assert!(battle.outcome().is_some());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::{attack_effect, decide, plan_attack, AttackEffect, CombatDecision};
use crate::components::{CombatPhase, Team, UnitId};
use crate::data::{BattleConfig, UnitStats};
use crate::error::{BattleError, Result};
use crate::events::{BattleEvent, BattleObserver, BattleOutcome, TickEvents};
use crate::math::{fixed_serde, Fixed, Vec2Fixed, Vec3Fixed};
use crate::movement::{compute_step, ground_snap, turn_towards, MovementParams};
use crate::projectile::{Projectile, ProjectileStatus, Resolution};
use crate::roster::Rosters;
use crate::scheduler::{ScheduledAction, Scheduler};
use crate::spatial::SpatialQuery;
use crate::storage::Storage;
use crate::targeting::find_nearest_living;
use crate::unit::{DamageOutcome, Unit};

/// A battle between two teams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battle {
    config: BattleConfig,
    units: Storage<Unit>,
    projectiles: Storage<Projectile>,
    rosters: Rosters,
    scheduler: Scheduler,
    started: bool,
    outcome: Option<BattleOutcome>,
    /// Ticks simulated while the battle was running.
    tick: u64,
    /// Battle time in seconds.
    #[serde(with = "fixed_serde")]
    elapsed: Fixed,
}

impl Battle {
    /// Create an empty battle in the placement phase.
    #[must_use]
    pub fn new(config: BattleConfig) -> Self {
        Self {
            config,
            units: Storage::new(),
            projectiles: Storage::new(),
            rosters: Rosters::default(),
            scheduler: Scheduler::new(),
            started: false,
            outcome: None,
            tick: 0,
            elapsed: Fixed::ZERO,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Battle configuration.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Change the game speed. Clamped to the allowed range.
    pub fn set_time_scale(&mut self, scale: Fixed) {
        self.config.set_time_scale(scale);
    }

    /// Whether the battle is running.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Result of the last battle, if one has ended.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        self.outcome
    }

    /// Ticks simulated while running.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Battle time in seconds.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// All unit ids in ascending order.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.sorted_ids()
    }

    /// Number of units on the field, dead ones awaiting removal included.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Both rosters.
    #[must_use]
    pub const fn rosters(&self) -> &Rosters {
        &self.rosters
    }

    /// Look up a projectile in flight.
    #[must_use]
    pub fn projectile(&self, id: u64) -> Option<&Projectile> {
        self.projectiles.get(id)
    }

    /// Number of projectiles in flight.
    #[must_use]
    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Number of pending attack timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    // ------------------------------------------------------------------------
    // Placement & Lifecycle
    // ------------------------------------------------------------------------

    /// Place a unit. It joins the fight at the next [`Self::start_battle`].
    ///
    /// Positions outside the world box are clamped onto its edge.
    pub fn place_unit(&mut self, stats: UnitStats, position: Vec3Fixed) -> UnitId {
        let position = position.clamp_to_world();
        let id = self
            .units
            .insert_with(|id| Unit::new(id, stats, position));
        tracing::trace!(unit = id, "Unit placed");
        id
    }

    /// Place a unit on the ground at a ground-plane point.
    pub fn place_unit_grounded(
        &mut self,
        stats: UnitStats,
        ground: Vec2Fixed,
        spatial: &dyn SpatialQuery,
    ) -> UnitId {
        let position = ground_snap(
            Vec3Fixed::from_ground(ground, Fixed::ZERO),
            spatial,
            self.config.vertical_offset,
        );
        self.place_unit(stats, position)
    }

    /// Start the battle.
    ///
    /// Idempotent: does nothing while a battle is running. Otherwise builds
    /// both rosters from the living units in id order, activates them,
    /// drops stale timers and fizzles stale projectiles. A side with no units
    /// loses on the spot.
    pub fn start_battle(&mut self) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        if self.started {
            return events;
        }

        self.started = true;
        self.outcome = None;
        self.rosters.clear();
        self.scheduler.clear();
        self.fizzle_projectiles(&mut events);

        for id in self.units.sorted_ids() {
            let Some(unit) = self.units.get_mut(id) else {
                continue;
            };
            if unit.is_dead() {
                continue;
            }
            unit.activate();
            self.rosters.of_mut(unit.team()).add(id);
        }

        let team_a = self.rosters.of(Team::A).len();
        let team_b = self.rosters.of(Team::B).len();
        tracing::info!(team_a, team_b, "Battle started");
        events.push(BattleEvent::BattleStarted { team_a, team_b });

        self.resolve_outcome(&mut events);
        events
    }

    /// Remove a unit from the field.
    ///
    /// The unit leaves its roster; during a battle this can end it.
    pub fn remove_unit(&mut self, id: UnitId) -> Result<Vec<BattleEvent>> {
        let unit = self.units.remove(id).ok_or(BattleError::UnitNotFound(id))?;
        self.scheduler.cancel_unit(id);

        let mut events = Vec::new();
        if self.rosters.of_mut(unit.team()).remove(id) {
            tracing::debug!(unit = id, team = %unit.team(), "Unit removed from battle");
            self.resolve_outcome(&mut events);
        }
        Ok(events)
    }

    // ------------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------------

    /// Advance by a frame delta scaled by the game speed.
    pub fn advance(&mut self, frame_dt: Fixed, spatial: &dyn SpatialQuery) -> TickEvents {
        let scaled = frame_dt * self.config.time_scale();
        self.tick(scaled, spatial)
    }

    /// Advance by one fixed timestep.
    pub fn step(&mut self, spatial: &dyn SpatialQuery) -> TickEvents {
        let dt = self.config.fixed_timestep();
        self.tick(dt, spatial)
    }

    /// Advance the battle by `dt` seconds.
    ///
    /// Does nothing unless the battle is running. Negative deltas count
    /// as zero.
    pub fn tick(&mut self, dt: Fixed, spatial: &dyn SpatialQuery) -> TickEvents {
        let mut events = TickEvents::new(self.tick);
        if !self.started {
            return events;
        }

        let dt = dt.max(Fixed::ZERO);
        self.elapsed += dt;

        let mut out = Vec::new();
        self.run_timers(&mut out);

        let params = MovementParams::from_config(&self.config);
        for id in self.units.sorted_ids() {
            self.advance_unit(id, dt, spatial, &params, &mut out);
        }

        self.advance_projectiles(dt, &mut out);
        self.sweep_dead();
        self.resolve_outcome(&mut out);

        self.tick += 1;
        events.extend(out);

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Battle state hash");
        }

        events
    }

    /// Start the battle if needed and step it until it ends or `max_ticks`
    /// ticks have run, feeding every event to `observer`.
    ///
    /// Returns the outcome, or `None` if the tick limit was hit first.
    pub fn run_until_finished(
        &mut self,
        spatial: &dyn SpatialQuery,
        max_ticks: u64,
        observer: &mut dyn BattleObserver,
    ) -> Option<BattleOutcome> {
        if !self.started {
            let mut start = TickEvents::new(self.tick);
            start.extend(self.start_battle());
            start.dispatch(observer);
        }

        let mut ticks = 0;
        while self.started && ticks < max_ticks {
            self.step(spatial).dispatch(observer);
            ticks += 1;
        }

        if self.started {
            None
        } else {
            self.outcome
        }
    }

    // ------------------------------------------------------------------------
    // Tick Phases
    // ------------------------------------------------------------------------

    fn run_timers(&mut self, events: &mut Vec<BattleEvent>) {
        for entry in self.scheduler.drain_due(self.elapsed) {
            match entry.action {
                ScheduledAction::AttackImpact => self.deliver_impact(entry.unit, events),
                ScheduledAction::AttackFinished => {
                    if let Some(unit) = self.units.get_mut(entry.unit) {
                        unit.finish_attack();
                    }
                }
            }
        }
    }

    fn advance_unit(
        &mut self,
        id: UnitId,
        dt: Fixed,
        spatial: &dyn SpatialQuery,
        params: &MovementParams,
        events: &mut Vec<BattleEvent>,
    ) {
        let Some(unit) = self.units.get_mut(id) else {
            return;
        };
        if unit.is_dead() || !unit.in_battle {
            return;
        }
        unit.tick_cooldown(dt);

        let Some(unit) = self.units.get(id) else {
            return;
        };
        let target = find_nearest_living(unit.position, self.rosters.enemies_of(unit.team()), &self.units)
            .and_then(|target| self.units.get(target).map(|t| (target, t.position)));

        match decide(unit, target) {
            CombatDecision::Busy => {}
            CombatDecision::Hold => {
                if let Some(unit) = self.units.get_mut(id) {
                    unit.current_target = None;
                    unit.phase = CombatPhase::Idle;
                }
            }
            CombatDecision::Advance { target: target_id } => {
                let target_position = target.map_or(unit.position, |(_, position)| position);
                let allies = if params.crowd_avoidance {
                    self.ally_positions(unit)
                } else {
                    Vec::new()
                };
                let step = compute_step(unit, target_position, dt, &allies, spatial, params);

                if let Some(unit) = self.units.get_mut(id) {
                    unit.position = step.position.clamp_to_world();
                    unit.facing = step.facing;
                    unit.phase = CombatPhase::Moving;
                    unit.current_target = Some(target_id);
                }
            }
            CombatDecision::Engage { target: target_id } => {
                self.face(id, target, dt, params);
                self.start_attack(id, target_id, events);
            }
            CombatDecision::Wait { target: target_id } => {
                self.face(id, target, dt, params);
                if let Some(unit) = self.units.get_mut(id) {
                    unit.phase = CombatPhase::Idle;
                    unit.current_target = Some(target_id);
                }
            }
        }
    }

    fn ally_positions(&self, unit: &Unit) -> Vec<Vec3Fixed> {
        self.rosters
            .of(unit.team())
            .members()
            .iter()
            .filter(|&&ally| ally != unit.id)
            .filter_map(|&ally| self.units.get(ally))
            .filter(|ally| !ally.is_dead())
            .map(|ally| ally.position)
            .collect()
    }

    fn face(
        &mut self,
        id: UnitId,
        target: Option<(UnitId, Vec3Fixed)>,
        dt: Fixed,
        params: &MovementParams,
    ) {
        let Some((_, target_position)) = target else {
            return;
        };
        let Some(unit) = self.units.get_mut(id) else {
            return;
        };
        let desired = (target_position.ground() - unit.position.ground()).normalize();
        if desired != Vec2Fixed::ZERO {
            unit.facing = turn_towards(unit.facing, desired, params.rotation_speed, dt);
        }
    }

    fn start_attack(&mut self, id: UnitId, target: UnitId, events: &mut Vec<BattleEvent>) {
        let Some(unit) = self.units.get_mut(id) else {
            return;
        };
        let plan = plan_attack(unit);
        unit.begin_attack(target, plan.variant, plan.counter);
        unit.current_target = Some(target);

        tracing::trace!(unit = id, target, variant = plan.variant, "Attack started");
        events.push(BattleEvent::AttackStarted {
            unit: id,
            target,
            variant: plan.variant,
        });
        if plan.special {
            events.push(BattleEvent::SpecialAttack {
                unit: id,
                counter: plan.counter,
            });
        }

        let impact = self.config.impact_offset(plan.variant);
        let duration = self.config.attack_duration(plan.variant);

        if impact == Fixed::ZERO {
            self.deliver_impact(id, events);
        } else {
            self.scheduler
                .schedule(self.elapsed + impact, id, ScheduledAction::AttackImpact);
        }

        if duration == Fixed::ZERO {
            if let Some(unit) = self.units.get_mut(id) {
                unit.finish_attack();
            }
        } else {
            self.scheduler
                .schedule(self.elapsed + duration, id, ScheduledAction::AttackFinished);
        }
    }

    /// Deliver the running attack of `attacker` at its impact point. A
    /// locked target that is gone or dead makes this a no-op.
    fn deliver_impact(&mut self, attacker: UnitId, events: &mut Vec<BattleEvent>) {
        let Some(unit) = self.units.get(attacker) else {
            return;
        };
        if unit.is_dead() || !unit.is_attacking() {
            return;
        }
        let Some(target) = unit.attack_target else {
            return;
        };
        if !self.units.get(target).is_some_and(|t| !t.is_dead()) {
            return;
        }

        match attack_effect(unit) {
            AttackEffect::Strike { damage } => self.apply_damage(target, attacker, damage, events),
            AttackEffect::Launch { damage, speed } => {
                let origin = unit.position
                    + Vec3Fixed::new(Fixed::ZERO, self.config.projectile_spawn_height, Fixed::ZERO);
                let lifetime = self.config.projectile_lifetime;
                let projectile = self.projectiles.insert_with(|pid| {
                    Projectile::new(pid, attacker, target, damage, speed, lifetime, origin)
                });
                events.push(BattleEvent::ProjectileSpawned {
                    projectile,
                    source: attacker,
                    target,
                    position: origin,
                });
            }
        }
    }

    fn advance_projectiles(&mut self, dt: Fixed, events: &mut Vec<BattleEvent>) {
        let threshold = self.config.hit_threshold;

        for pid in self.projectiles.sorted_ids() {
            let Some(projectile) = self.projectiles.get(pid) else {
                continue;
            };
            let target_position = self
                .units
                .get(projectile.target)
                .filter(|target| !target.is_dead())
                .map(|target| target.position);

            let Some(projectile) = self.projectiles.get_mut(pid) else {
                continue;
            };
            let ProjectileStatus::Resolved(resolution) =
                projectile.tick(dt, target_position, threshold)
            else {
                continue;
            };

            let Some(projectile) = self.projectiles.remove(pid) else {
                continue;
            };
            events.push(BattleEvent::ProjectileResolved {
                projectile: pid,
                resolution,
                position: projectile.position,
            });
            if resolution == Resolution::Hit {
                self.apply_damage(projectile.target, projectile.source, projectile.damage, events);
            }
        }
    }

    /// The single place where damage lands.
    fn apply_damage(
        &mut self,
        target: UnitId,
        source: UnitId,
        amount: u32,
        events: &mut Vec<BattleEvent>,
    ) {
        let Some(unit) = self.units.get_mut(target) else {
            return;
        };
        let team = unit.team();

        match unit.take_damage(amount) {
            DamageOutcome::Ignored => {}
            DamageOutcome::Wounded { applied, remaining } => {
                events.push(BattleEvent::DamageApplied {
                    unit: target,
                    source,
                    amount: applied,
                    remaining,
                });
            }
            DamageOutcome::Killed { applied } => {
                events.push(BattleEvent::DamageApplied {
                    unit: target,
                    source,
                    amount: applied,
                    remaining: 0,
                });
                self.retire(target, team, events);
            }
        }
    }

    /// Death bookkeeping: leave the roster, drop timers, report once.
    ///
    /// The outcome is not checked here. Deaths within a tick all land
    /// first and the end of the tick decides, so a mutual kill is a draw.
    fn retire(&mut self, id: UnitId, team: Team, events: &mut Vec<BattleEvent>) {
        self.rosters.of_mut(team).remove(id);
        self.scheduler.cancel_unit(id);
        tracing::debug!(unit = id, team = %team, "Unit died");
        events.push(BattleEvent::UnitDied { unit: id, team });
    }

    /// Resolve every projectile still in flight as fizzled.
    fn fizzle_projectiles(&mut self, events: &mut Vec<BattleEvent>) {
        for pid in self.projectiles.sorted_ids() {
            if let Some(projectile) = self.projectiles.remove(pid) {
                events.push(BattleEvent::ProjectileResolved {
                    projectile: pid,
                    resolution: Resolution::Fizzled,
                    position: projectile.position,
                });
            }
        }
    }

    fn sweep_dead(&mut self) {
        for id in self.units.sorted_ids() {
            if self.units.get(id).is_some_and(Unit::is_dead) {
                self.units.remove(id);
            }
        }
    }

    fn resolve_outcome(&mut self, events: &mut Vec<BattleEvent>) {
        if !self.started {
            return;
        }

        let a_empty = self.rosters.of(Team::A).is_empty();
        let b_empty = self.rosters.of(Team::B).is_empty();
        let outcome = match (a_empty, b_empty) {
            (true, true) => BattleOutcome::Draw,
            (true, false) => BattleOutcome::Victory(Team::B),
            (false, true) => BattleOutcome::Victory(Team::A),
            (false, false) => return,
        };

        self.started = false;
        self.outcome = Some(outcome);
        self.scheduler.clear();
        self.fizzle_projectiles(events);
        for id in self.units.sorted_ids() {
            if let Some(unit) = self.units.get_mut(id) {
                unit.deactivate();
            }
        }

        tracing::info!(tick = self.tick, %outcome, "Battle ended");
        events.push(BattleEvent::BattleEnded { outcome });
    }

    // ------------------------------------------------------------------------
    // Determinism
    // ------------------------------------------------------------------------

    /// Hash of the battle state, for desync and determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.elapsed.to_bits().hash(&mut hasher);
        self.started.hash(&mut hasher);
        self.outcome.hash(&mut hasher);

        let ids = self.units.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(unit) = self.units.get(id) {
                id.hash(&mut hasher);
                unit.health.current.hash(&mut hasher);
                unit.position.hash(&mut hasher);
                unit.facing.hash(&mut hasher);
                unit.phase.hash(&mut hasher);
                unit.cooldown_remaining.to_bits().hash(&mut hasher);
                unit.attack_counter.hash(&mut hasher);
                unit.current_target.hash(&mut hasher);
            }
        }

        let pids = self.projectiles.sorted_ids();
        pids.len().hash(&mut hasher);
        for pid in pids {
            if let Some(projectile) = self.projectiles.get(pid) {
                pid.hash(&mut hasher);
                projectile.position.hash(&mut hasher);
                projectile.remaining_lifetime.to_bits().hash(&mut hasher);
            }
        }

        self.rosters.of(Team::A).members().hash(&mut hasher);
        self.rosters.of(Team::B).members().hash(&mut hasher);
        self.scheduler.len().hash(&mut hasher);

        hasher.finish()
    }

    /// Serialize the battle to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| BattleError::InvalidState(format!("Failed to serialize battle: {e}")))
    }

    /// Deserialize a battle from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| BattleError::InvalidState(format!("Failed to deserialize battle: {e}")))
    }
}

impl Default for Battle {
    fn default() -> Self {
        Self::new(BattleConfig::default())
    }
}
