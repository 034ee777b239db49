//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays, headless balance runs, and saved snapshots all assume the
//! simulation is 100% deterministic. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`battle_core::math::Fixed`] throughout,
//!   trigonometry included.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units and projectiles are always visited in ascending id order.
//!
//! - **System randomness**: The battle has none. Attack variants and
//!   special attacks are driven by counters.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual pieces (steering, projectiles, timers)
//! 2. **Property tests**: Random armies must still fight deterministically
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N battles in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use battle_core::battle::Battle;
use battle_core::spatial::{OpenField, SpatialQuery};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelBattleResult {
    /// Final state hash from each battle.
    pub hashes: Vec<u64>,
    /// Number of ticks each battle ran.
    pub ticks: u64,
    /// Number of battles run.
    pub num_battles: usize,
}

impl ParallelBattleResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_battles,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run any state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```
/// use battle_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 10, || 0u64, |n| *n += 2, |n| *n);
/// result.assert_deterministic();
/// assert_eq!(result.hashes, vec![20, 20, 20]);
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Set up a battle and start it.
fn started(setup_fn: impl Fn() -> Battle) -> Battle {
    let mut battle = setup_fn();
    battle.start_battle();
    battle
}

/// Run a battle twice from identical setup on open ground and compare
/// the final state hashes.
///
/// The battle is started before stepping.
pub fn verify_battle_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Battle,
{
    verify_battle_determinism_on(setup_fn, num_ticks, &OpenField::default())
}

/// Like [`verify_battle_determinism`] but on custom terrain.
pub fn verify_battle_determinism_on<F>(
    setup_fn: F,
    num_ticks: u64,
    spatial: &dyn SpatialQuery,
) -> bool
where
    F: Fn() -> Battle,
{
    let result = verify_determinism(
        2,
        num_ticks,
        || started(&setup_fn),
        |battle| {
            battle.step(spatial);
        },
        Battle::state_hash,
    );
    result.is_deterministic
}

/// Run N battles on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling
/// variations or memory layout differences.
///
/// # Example
///
/// ```
/// use battle_test_utils::determinism::run_parallel_battles_scoped;
/// use battle_test_utils::fixtures::duel;
///
/// let result = run_parallel_battles_scoped(|| duel(6), 4, 100);
/// result.assert_deterministic();
/// ```
pub fn run_parallel_battles_scoped<F>(
    setup_fn: F,
    num_battles: usize,
    num_ticks: u64,
) -> ParallelBattleResult
where
    F: Fn() -> Battle + Sync,
{
    let field = OpenField::default();
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = started(&setup_fn);
                    for _ in 0..num_ticks {
                        battle.step(&field);
                    }
                    battle.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });

    ParallelBattleResult {
        hashes,
        ticks: num_ticks,
        num_battles,
    }
}

/// Compare two battle runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match throughout, `Some(tick)` for the first tick
/// whose state hashes differ (0 is the freshly started state).
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Battle,
{
    let field = OpenField::default();
    let mut first = started(&setup_fn);
    let mut second = started(&setup_fn);

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.step(&field);
        second.step(&field);

        if first.state_hash() != second.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a snapshot round-trip preserves battle state exactly, and
/// that the restored battle keeps evolving identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Battle,
{
    let field = OpenField::default();
    let mut battle = started(setup_fn);

    for _ in 0..num_ticks {
        battle.step(&field);
    }

    let Ok(bytes) = battle.serialize() else {
        return false;
    };
    let Ok(mut restored) = Battle::deserialize(&bytes) else {
        return false;
    };

    if battle.state_hash() != restored.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        battle.step(&field);
        restored.step(&field);
    }
    battle.state_hash() == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle testing.
///
/// These strategies generate random but reproducible armies for
/// property-based testing.
pub mod strategies {
    use battle_core::battle::Battle;
    use battle_core::components::{AttackKind, Team};
    use battle_core::data::{BattleConfig, UnitStats};
    use battle_core::math::{Fixed, Vec3Fixed};
    use proptest::prelude::*;

    /// Generate a coordinate on a small battlefield.
    ///
    /// Range: -30 to 30 in quarter-unit steps.
    pub fn arb_coordinate() -> impl Strategy<Value = Fixed> {
        (-120i32..120i32).prop_map(|quarters| Fixed::from_num(quarters) / 4)
    }

    /// Generate a ground-level position.
    pub fn arb_position() -> impl Strategy<Value = Vec3Fixed> {
        (arb_coordinate(), arb_coordinate()).prop_map(|(x, z)| Vec3Fixed::new(x, Fixed::ZERO, z))
    }

    /// Generate a team.
    pub fn arb_team() -> impl Strategy<Value = Team> {
        prop_oneof![Just(Team::A), Just(Team::B)]
    }

    /// Generate an attack kind.
    pub fn arb_attack_kind() -> impl Strategy<Value = AttackKind> {
        prop_oneof![Just(AttackKind::Melee), Just(AttackKind::Ranged)]
    }

    /// Generate health values (1-300).
    pub fn arb_health() -> impl Strategy<Value = u32> {
        1u32..300u32
    }

    /// Generate damage values (0-60).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        0u32..60u32
    }

    /// Generate a speed in tenths (0.0 - 4.0).
    pub fn arb_speed() -> impl Strategy<Value = Fixed> {
        (0i32..=40i32).prop_map(|tenths| Fixed::from_num(tenths) / 10)
    }

    /// Generate unit stats for `team`.
    pub fn arb_unit_stats(team: Team) -> impl Strategy<Value = UnitStats> {
        (
            arb_attack_kind(),
            arb_health(),
            arb_damage(),
            arb_speed(),
            1i32..=8,
            1i32..=20,
            1u32..=6,
        )
            .prop_map(
                move |(kind, health, damage, speed, range, cooldown_tenths, special)| {
                    let base = match kind {
                        AttackKind::Melee => UnitStats::melee(team),
                        AttackKind::Ranged => UnitStats::ranged(team),
                    };
                    base.with_max_health(health)
                        .with_attack_damage(damage)
                        .with_move_speed(speed)
                        .with_attack_range(Fixed::from_num(range))
                        .with_attack_cooldown(Fixed::from_num(cooldown_tenths) / 10)
                        .with_special_attack_interval(special)
                },
            )
    }

    /// A unit to place before the battle starts.
    #[derive(Debug, Clone)]
    pub struct Placement {
        /// Stats, team included.
        pub stats: UnitStats,
        /// Starting position.
        pub position: Vec3Fixed,
    }

    /// Generate a placement on either team.
    pub fn arb_placement() -> impl Strategy<Value = Placement> {
        arb_team()
            .prop_flat_map(arb_unit_stats)
            .prop_flat_map(|stats| {
                arb_position().prop_map(move |position| Placement {
                    stats: stats.clone(),
                    position,
                })
            })
    }

    /// Generate a mixed army of up to `max_units` placements.
    pub fn arb_army(max_units: usize) -> impl Strategy<Value = Vec<Placement>> {
        proptest::collection::vec(arb_placement(), 1..max_units)
    }

    /// Build an unstarted battle from placements.
    #[must_use]
    pub fn build_battle(placements: &[Placement], config: &BattleConfig) -> Battle {
        let mut battle = Battle::new(config.clone());
        for placement in placements {
            battle.place_unit(placement.stats.clone(), placement.position);
        }
        battle
    }
}
