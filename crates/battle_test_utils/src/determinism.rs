//! Determinism testing utilities.
//!
//! Provides a harness for verifying that battles produce identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! A battle must replay exactly from its seed and its round plans.
//! Sources of non-determinism include:
//!
//! - **Extra draws**: a formula that consumes a draw on one path but not
//!   another shifts every later roll. Draw order is part of the contract.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Battle records use `Vec` and `BTreeMap` only.
//!
//! - **Ambient randomness**: nothing may call `rand::thread_rng()`. All
//!   draws come from the injected [`Prng`](battle_core::rng::Prng).
//!
//! # Test Levels
//!
//! 1. **Unit tests**: single formulas with scripted draws
//! 2. **Property tests**: random inputs must respect formula bounds
//! 3. **Integration tests**: whole battles reproduce from a seed
//! 4. **Parallel tests**: running N battles on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use battle_core::battle::{execute_round, BattleState};
use battle_core::replay::{deserialize_state, serialize_state, state_hash};
use battle_core::rng::SeededRng;

use crate::fixtures::queue_basic_attacks;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of rounds simulated.
    pub rounds: u32,
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
    /// Panics if runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Rounds: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.rounds,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a scenario multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the scenario
/// * `rounds` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    rounds: u32,
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

        for _ in 0..rounds {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        rounds,
    }
}

/// A battle paired with its generator.
#[derive(Debug, Clone)]
pub struct SeededBattle {
    /// Current state.
    pub state: BattleState,
    /// Generator shared by every round.
    pub rng: SeededRng,
}

impl SeededBattle {
    /// Start from `state` with a generator seeded by `seed`.
    #[must_use]
    pub fn new(state: BattleState, seed: u64) -> Self {
        Self {
            state,
            rng: SeededRng::new(seed),
        }
    }

    /// Queue basic attacks and execute one round. No-op once the battle is over.
    pub fn step(&mut self) {
        if self.state.is_over() {
            return;
        }
        let queued = queue_basic_attacks(&self.state);
        if let Ok(round) = execute_round(&queued, &mut self.rng) {
            self.state = round.state;
        }
    }

    /// Hash of the current state.
    #[must_use]
    pub fn hash(&self) -> u64 {
        state_hash(&self.state)
    }
}

/// Run the same seeded battle twice and compare final hashes.
pub fn verify_battle_determinism<F>(setup_fn: F, seed: u64, rounds: u32) -> bool
where
    F: Fn() -> BattleState,
{
    let result = verify_determinism(
        2,
        rounds,
        || SeededBattle::new(setup_fn(), seed),
        SeededBattle::step,
        SeededBattle::hash,
    );
    result.is_deterministic
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelBattleResult {
    /// Final state hash from each battle.
    pub hashes: Vec<u64>,
    /// Rounds each battle ran.
    pub rounds: u32,
}

impl ParallelBattleResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Run N copies of a seeded battle on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_battles<F>(
    setup_fn: F,
    seed: u64,
    num_battles: usize,
    rounds: u32,
) -> ParallelBattleResult
where
    F: Fn() -> BattleState + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = SeededBattle::new(setup_fn(), seed);
                    for _ in 0..rounds {
                        battle.step();
                    }
                    battle.hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelBattleResult { hashes, rounds }
}

/// Compare two runs round by round, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(round)` if they diverge after that
/// round (0 means the initial states differ).
pub fn find_first_divergence<F>(setup_fn: F, seed: u64, rounds: u32) -> Option<u32>
where
    F: Fn() -> BattleState,
{
    let mut a = SeededBattle::new(setup_fn(), seed);
    let mut b = SeededBattle::new(setup_fn(), seed);

    if a.hash() != b.hash() {
        return Some(0);
    }

    for round in 1..=rounds {
        a.step();
        b.step();

        if a.hash() != b.hash() {
            return Some(round);
        }
    }

    None
}

/// Verify that a bincode round-trip preserves a mid-battle state exactly.
pub fn verify_serialization_determinism<F>(setup_fn: F, seed: u64, rounds: u32) -> bool
where
    F: Fn() -> BattleState,
{
    let mut battle = SeededBattle::new(setup_fn(), seed);
    for _ in 0..rounds {
        battle.step();
    }

    let hash_before = battle.hash();
    let Ok(bytes) = serialize_state(&battle.state) else {
        return false;
    };
    let Ok(restored) = deserialize_state(&bytes) else {
        return false;
    };

    hash_before == state_hash(&restored)
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle formulas.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use battle_core::element::Element;
    use battle_core::stats::Stats;
    use battle_core::unit::Unit;
    use proptest::prelude::*;

    use crate::fixtures::unit_with_stats;

    /// Generate a stat block in the range seen in content.
    pub fn arb_stats() -> impl Strategy<Value = Stats> {
        (1i32..500, 0i32..100, 1i32..200, 0i32..200, 1i32..200, 1i32..100)
            .prop_map(|(hp, pp, atk, def, mag, spd)| Stats::new(hp, pp, atk, def, mag, spd))
    }

    /// Generate any element.
    pub fn arb_element() -> impl Strategy<Value = Element> {
        prop_oneof![
            Just(Element::Venus),
            Just(Element::Mars),
            Just(Element::Jupiter),
            Just(Element::Mercury),
            Just(Element::Neutral),
        ]
    }

    /// Generate a unit with random stats and element.
    pub fn arb_unit(id: &'static str) -> impl Strategy<Value = Unit> {
        (arb_stats(), arb_element()).prop_map(move |(stats, element)| {
            let mut unit = unit_with_stats(id, stats);
            unit.element = element;
            unit
        })
    }

    /// Generate an armor-pierce fraction in `[0, 1]`.
    pub fn arb_ignore_defense() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }

    /// Generate a PRNG draw in `[0, 1)`.
    pub fn arb_draw() -> impl Strategy<Value = f64> {
        0.0f64..1.0
    }

    /// Generate an ability power.
    pub fn arb_power() -> impl Strategy<Value = u32> {
        0u32..200
    }

    /// Generate an XP gain.
    pub fn arb_xp() -> impl Strategy<Value = u32> {
        0u32..120_000
    }
}
