//! End-to-end battle behaviour through the public API.

use battle_core::battle::Battle;
use battle_core::components::{CombatPhase, Team};
use battle_core::data::{BattleConfig, UnitStats};
use battle_core::events::{BattleEvent, BattleOutcome};
use battle_core::math::{Fixed, Vec3Fixed};
use battle_core::projectile::Resolution;
use battle_core::roster::Roster;
use battle_core::spatial::OpenField;
use battle_core::storage::Storage;
use battle_core::targeting::find_nearest_living;
use battle_core::unit::{DamageOutcome, Unit};
use battle_test_utils::determinism::strategies::{arb_army, build_battle};
use battle_test_utils::determinism::verify_battle_determinism;
use battle_test_utils::fixtures::{at, duel_with, fixed, fixed_f, skirmish, EventLog};
use proptest::prelude::*;

/// Attacks land the moment they start and end immediately.
fn instant_config() -> BattleConfig {
    BattleConfig::default()
        .with_impact_fraction(Fixed::ZERO)
        .with_attack_durations(Fixed::ZERO, Fixed::ZERO)
        .with_projectile_spawn_height(Fixed::ZERO)
}

fn health_of(battle: &Battle, id: u64) -> Option<u32> {
    battle.unit(id).map(|u| u.health.current)
}

fn attack_times(log: &[(Fixed, BattleEvent)], unit: u64) -> Vec<Fixed> {
    log.iter()
        .filter_map(|(elapsed, event)| match event {
            BattleEvent::AttackStarted { unit: u, .. } if *u == unit => Some(*elapsed),
            _ => None,
        })
        .collect()
}

// =========================================================================
// Damage intake
// =========================================================================

proptest! {
    #[test]
    fn prop_health_stays_within_bounds(
        max_health in 1u32..500,
        hits in proptest::collection::vec(0u32..200, 0..30),
    ) {
        let stats = UnitStats::melee(Team::A).with_max_health(max_health);
        let mut unit = Unit::new(1, stats, Vec3Fixed::ZERO);
        let mut deaths = 0;

        for amount in hits {
            let before = unit.health;
            let was_dead = unit.is_dead();

            match unit.take_damage(amount) {
                DamageOutcome::Killed { .. } => deaths += 1,
                DamageOutcome::Ignored => {
                    prop_assert!(was_dead);
                    prop_assert_eq!(unit.health, before);
                }
                DamageOutcome::Wounded { remaining, .. } => {
                    prop_assert!(remaining > 0);
                }
            }

            prop_assert!(unit.health.current <= max_health);
            prop_assert_eq!(unit.is_dead(), unit.health.current == 0);
        }

        prop_assert!(deaths <= 1);
    }
}

#[test]
fn damage_on_dead_unit_is_noop() {
    let mut unit = Unit::new(1, UnitStats::melee(Team::B).with_max_health(20), Vec3Fixed::ZERO);

    assert_eq!(unit.take_damage(25), DamageOutcome::Killed { applied: 20 });
    assert_eq!(unit.take_damage(5), DamageOutcome::Ignored);
    assert_eq!(unit.health.current, 0);
    assert_eq!(unit.phase, CombatPhase::Dead);
}

// =========================================================================
// Targeting
// =========================================================================

#[test]
fn nearest_living_enemy_is_chosen() {
    let mut units = Storage::new();
    let mut roster = Roster::new();
    for x in [5, 2, 8] {
        let id = units.insert_with(|id| Unit::new(id, UnitStats::melee(Team::B), at(x, 0)));
        roster.add(id);
    }

    assert_eq!(find_nearest_living(Vec3Fixed::ZERO, &roster, &units), Some(2));

    for id in roster.members().to_vec() {
        if let Some(unit) = units.get_mut(id) {
            unit.take_damage(u32::MAX);
        }
    }
    assert_eq!(find_nearest_living(Vec3Fixed::ZERO, &roster, &units), None);
    assert_eq!(find_nearest_living(Vec3Fixed::ZERO, &Roster::new(), &units), None);
}

#[test]
fn unit_locks_nearest_enemy_in_battle() {
    let mut battle = Battle::default();
    let attacker = battle.place_unit(UnitStats::melee(Team::A), at(0, 0));
    battle.place_unit(UnitStats::melee(Team::B), at(5, 0));
    let closest = battle.place_unit(UnitStats::melee(Team::B), at(2, 0));
    battle.place_unit(UnitStats::melee(Team::B), at(8, 0));
    battle.start_battle();

    let events = battle.step(&OpenField::default());
    assert!(events.iter().any(|e| matches!(
        e,
        BattleEvent::AttackStarted { unit, target, .. } if *unit == attacker && *target == closest
    )));
    assert_eq!(
        battle.unit(attacker).and_then(|u| u.current_target),
        Some(closest)
    );
}

// =========================================================================
// Projectiles
// =========================================================================

#[test]
fn projectile_hits_after_two_ticks_and_only_once() {
    let mut battle = Battle::new(instant_config());
    battle.place_unit(
        UnitStats::ranged(Team::A)
            .with_attack_range(fixed(10))
            .with_bullet_speed(fixed(5))
            .with_attack_cooldown(fixed(100)),
        at(0, 0),
    );
    let target = battle.place_unit(
        UnitStats::melee(Team::B).with_move_speed(Fixed::ZERO),
        at(10, 0),
    );
    battle.start_battle();
    let field = OpenField::default();

    let first = battle.tick(Fixed::ONE, &field);
    assert!(first
        .iter()
        .any(|e| matches!(e, BattleEvent::ProjectileSpawned { .. })));
    assert_eq!(health_of(&battle, target), Some(100));
    assert_eq!(battle.projectile_count(), 1);

    let second = battle.tick(Fixed::ONE, &field);
    assert!(second.iter().any(|e| matches!(
        e,
        BattleEvent::ProjectileResolved {
            resolution: Resolution::Hit,
            ..
        }
    )));
    assert_eq!(health_of(&battle, target), Some(90));
    assert_eq!(battle.projectile_count(), 0);

    for _ in 0..5 {
        battle.tick(Fixed::ONE, &field);
    }
    assert_eq!(health_of(&battle, target), Some(90));
}

#[test]
fn projectile_fizzles_when_target_removed() {
    let mut battle = Battle::new(instant_config());
    battle.place_unit(
        UnitStats::ranged(Team::A)
            .with_attack_range(fixed(10))
            .with_bullet_speed(fixed(1))
            .with_attack_cooldown(fixed(100)),
        at(0, 0),
    );
    let target = battle.place_unit(
        UnitStats::melee(Team::B).with_move_speed(Fixed::ZERO),
        at(8, 0),
    );
    battle.place_unit(
        UnitStats::melee(Team::B).with_move_speed(Fixed::ZERO),
        at(-50, 0),
    );
    battle.start_battle();
    let field = OpenField::default();

    battle.tick(Fixed::ONE, &field);
    assert_eq!(battle.projectile_count(), 1);

    let removed = battle.remove_unit(target).unwrap();
    assert!(removed.is_empty(), "team B still has a unit");

    let events = battle.tick(Fixed::ONE, &field);
    assert!(events.iter().any(|e| matches!(
        e,
        BattleEvent::ProjectileResolved {
            resolution: Resolution::Fizzled,
            ..
        }
    )));
    assert!(!events
        .iter()
        .any(|e| matches!(e, BattleEvent::DamageApplied { .. })));
    assert_eq!(battle.projectile_count(), 0);
}

// =========================================================================
// Attacks
// =========================================================================

#[test]
fn committed_attack_on_dead_target_does_nothing() {
    let mut battle = Battle::default();
    let first = battle.place_unit(UnitStats::melee(Team::A), at(0, 0));
    let victim = battle.place_unit(
        UnitStats::melee(Team::B)
            .with_max_health(10)
            .with_attack_damage(0),
        at(1, 0),
    );
    let second = battle.place_unit(UnitStats::melee(Team::A), at(2, 0));
    battle.place_unit(
        UnitStats::melee(Team::B).with_move_speed(Fixed::ZERO),
        at(50, 0),
    );
    battle.start_battle();
    let field = OpenField::default();

    let opening = battle.tick(fixed_f(0.05), &field);
    let attackers: Vec<_> = opening
        .iter()
        .filter_map(|e| match e {
            BattleEvent::AttackStarted { unit, target, .. } if *target == victim => Some(*unit),
            _ => None,
        })
        .collect();
    assert_eq!(attackers, vec![first, second]);

    let impact = battle.tick(fixed_f(0.35), &field);
    let hits = impact
        .iter()
        .filter(|e| matches!(e, BattleEvent::DamageApplied { unit, .. } if *unit == victim))
        .count();
    assert_eq!(hits, 1);
    assert_eq!(impact.deaths(), vec![victim]);
    assert!(battle.is_started());
    assert!(battle.unit(second).is_some_and(Unit::is_attacking));
}

#[test]
fn cooldown_gates_attacks_with_coarse_steps() {
    let mut battle = Battle::default();
    let attacker = battle.place_unit(UnitStats::melee(Team::A), at(0, 0));
    battle.place_unit(
        UnitStats::melee(Team::B)
            .with_max_health(10_000)
            .with_attack_damage(0),
        at(1, 0),
    );
    battle.start_battle();
    let field = OpenField::default();
    let dt = fixed_f(0.3);

    let mut log = Vec::new();
    for _ in 0..20 {
        let events = battle.tick(dt, &field);
        log.extend(events.iter().map(|e| (battle.elapsed(), *e)));
    }

    let times = attack_times(&log, attacker);
    assert!(times.len() >= 3, "expected repeated attacks, got {times:?}");
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Fixed::ONE, "attacks too close: {pair:?}");
    }
}

#[test]
fn variants_alternate_and_every_fourth_attack_is_special() {
    let mut battle = duel_with(
        UnitStats::melee(Team::A).with_attack_damage(0),
        UnitStats::melee(Team::B)
            .with_attack_damage(0)
            .with_max_health(1000),
        1,
    );
    let mut log = EventLog::default();
    battle.run_until_finished(&OpenField::default(), 200, &mut log);

    let variants: Vec<_> = log
        .events
        .iter()
        .filter_map(|e| match e {
            BattleEvent::AttackStarted { unit: 1, variant, .. } => Some(*variant),
            _ => None,
        })
        .collect();
    assert!(variants.len() >= 8);
    for (index, variant) in variants.iter().enumerate() {
        assert_eq!(usize::from(*variant), index % 2);
    }

    let specials: Vec<_> = log
        .events
        .iter()
        .filter_map(|e| match e {
            BattleEvent::SpecialAttack { unit: 1, counter } => Some(*counter),
            _ => None,
        })
        .collect();
    assert_eq!(specials, vec![4, 8]);
}

// =========================================================================
// Lifecycle
// =========================================================================

#[test]
fn start_battle_twice_sets_up_once() {
    let mut battle = duel_with(UnitStats::melee(Team::A), UnitStats::melee(Team::B), 1);
    let field = OpenField::default();

    assert_eq!(
        battle.start_battle(),
        vec![BattleEvent::BattleStarted {
            team_a: 1,
            team_b: 1
        }]
    );
    for _ in 0..30 {
        battle.step(&field);
    }
    let counter = battle.unit(1).map(|u| u.attack_counter);
    let rosters = battle.rosters().clone();
    assert!(counter.is_some_and(|c| c > 0));

    assert!(battle.start_battle().is_empty());
    assert_eq!(battle.rosters(), &rosters);
    assert_eq!(battle.unit(1).map(|u| u.attack_counter), counter);
}

#[test]
fn wiping_team_a_ends_battle_and_restart_rearms() {
    let mut battle = duel_with(
        UnitStats::melee(Team::A).with_max_health(10),
        UnitStats::melee(Team::B),
        1,
    );
    let mut log = EventLog::default();
    let outcome = battle.run_until_finished(&OpenField::default(), 400, &mut log);

    assert_eq!(outcome, Some(BattleOutcome::Victory(Team::B)));
    assert!(!battle.is_started());
    assert_eq!(log.deaths_of(1), 1);
    assert_eq!(
        log.count(|e| matches!(e, BattleEvent::BattleEnded { .. })),
        1
    );
    assert_eq!(battle.pending_timers(), 0);

    let fresh = battle.place_unit(UnitStats::melee(Team::A), at(-3, 0));
    let events = battle.start_battle();
    assert_eq!(
        events,
        vec![BattleEvent::BattleStarted {
            team_a: 1,
            team_b: 1
        }]
    );
    assert!(battle.is_started());
    assert_eq!(battle.outcome(), None);
    assert_eq!(battle.rosters().of(Team::A).members(), &[fresh]);
    assert_eq!(battle.rosters().of(Team::B).members(), &[2]);
}

#[test]
fn time_scale_is_clamped() {
    let mut battle = duel_with(UnitStats::melee(Team::A), UnitStats::melee(Team::B), 40);
    battle.set_time_scale(fixed(10));
    battle.start_battle();

    battle.advance(Fixed::ONE, &OpenField::default());
    assert_eq!(battle.elapsed(), fixed(3));
}

// =========================================================================
// Whole battles
// =========================================================================

#[test]
fn skirmish_is_deterministic() {
    assert!(verify_battle_determinism(
        || skirmish(4, BattleConfig::default()),
        1200
    ));
}

#[test]
fn skirmish_finishes() {
    let mut battle = skirmish(3, BattleConfig::default());
    let mut log = EventLog::default();
    let outcome = battle.run_until_finished(&OpenField::default(), 20_000, &mut log);

    assert!(outcome.is_some());
    assert_eq!(
        log.count(|e| matches!(e, BattleEvent::UnitDied { .. })),
        12 - battle.unit_count()
    );
}

#[test]
fn finished_skirmish_resolves_every_projectile_once() {
    let mut battle = skirmish(3, BattleConfig::default());
    let mut log = EventLog::default();
    let outcome = battle.run_until_finished(&OpenField::default(), 20_000, &mut log);

    assert!(outcome.is_some());
    assert_eq!(battle.projectile_count(), 0);
    let spawned = log.count(|e| matches!(e, BattleEvent::ProjectileSpawned { .. }));
    let resolved = log.count(|e| matches!(e, BattleEvent::ProjectileResolved { .. }));
    assert!(spawned > 0);
    assert_eq!(spawned, resolved);
}

#[test]
fn instant_config_builders_apply_outside_the_crate() {
    let config = instant_config();
    assert!(config.validate().is_ok());
    assert_eq!(config.impact_offset(0), Fixed::ZERO);
    assert_eq!(config.attack_duration(1), Fixed::ZERO);
    assert_eq!(config.projectile_spawn_height, Fixed::ZERO);
    assert_eq!(config.time_scale(), BattleConfig::default().time_scale());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every unit that leaves the field was reported dead exactly once.
    #[test]
    fn prop_deaths_reported_once(army in arb_army(10)) {
        let mut battle = build_battle(&army, &BattleConfig::default());
        let ids = battle.unit_ids();
        let mut log = EventLog::default();
        let outcome = battle.run_until_finished(&OpenField::default(), 3000, &mut log);

        for id in ids {
            let expected = usize::from(battle.unit(id).is_none());
            prop_assert_eq!(log.deaths_of(id), expected);
        }
        let ended = log.count(|e| matches!(e, BattleEvent::BattleEnded { .. }));
        prop_assert_eq!(ended, usize::from(outcome.is_some()));
    }
}
