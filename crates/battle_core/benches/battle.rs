//! Battle benchmarks for battle_core.
//!
//! Run with: `cargo bench -p battle_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use battle_core::battle::Battle;
use battle_core::components::Team;
use battle_core::data::{BattleConfig, UnitStats};
use battle_core::math::{Fixed, Vec3Fixed};
use battle_core::spatial::{CircleObstacle, ObstacleField, OpenField, SpatialQuery};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn army_battle(per_side: i32) -> Battle {
    let mut battle = Battle::new(BattleConfig::default());
    for i in 0..per_side {
        let z = Fixed::from_num(i * 2 - per_side);
        let (stats_a, stats_b) = if i % 2 == 0 {
            (UnitStats::melee(Team::A), UnitStats::melee(Team::B))
        } else {
            (UnitStats::ranged(Team::A), UnitStats::ranged(Team::B))
        };
        battle.place_unit(stats_a, Vec3Fixed::new(Fixed::from_num(-10), Fixed::ZERO, z));
        battle.place_unit(stats_b, Vec3Fixed::new(Fixed::from_num(10), Fixed::ZERO, z));
    }
    battle.start_battle();
    battle
}

fn run_ticks(mut battle: Battle, ticks: u32, spatial: &dyn SpatialQuery) -> u64 {
    for _ in 0..ticks {
        battle.step(spatial);
    }
    battle.state_hash()
}

/// Runs battle benchmarks for the battle_core crate.
pub fn battle_benchmark(c: &mut Criterion) {
    let open = OpenField::default();
    let rocks = (-3..=3).fold(ObstacleField::default(), |field, i| {
        field.with_obstacle(CircleObstacle::new(
            Fixed::ZERO,
            Fixed::from_num(i * 4),
            Fixed::ONE,
        ))
    });

    c.bench_function("20v20 open field 200 ticks", |b| {
        b.iter(|| run_ticks(black_box(army_battle(20)), 200, &open));
    });

    c.bench_function("20v20 obstacles 200 ticks", |b| {
        b.iter(|| run_ticks(black_box(army_battle(20)), 200, &rocks));
    });

    let snapshot = army_battle(20);
    c.bench_function("state hash 40 units", |b| {
        b.iter(|| black_box(&snapshot).state_hash());
    });
}

criterion_group!(benches, battle_benchmark);
criterion_main!(benches);
