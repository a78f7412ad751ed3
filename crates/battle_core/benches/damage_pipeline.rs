//! Damage pipeline and round benchmarks for battle_core.
//!
//! Run with: `cargo bench -p battle_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use battle_core::action::execute_ability;
use battle_core::battle::execute_round;
use battle_core::combat::calculate_damage;
use battle_core::element::Element;
use battle_core::rng::SeededRng;
use battle_test_utils::fixtures::{
    basic_enemy, basic_unit, battle_against, physical, psynergy, queue_basic_attacks,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Single-target damage formulas and a full ability execution.
pub fn damage_benchmark(c: &mut Criterion) {
    let attacker = basic_unit("isaac");
    let defender = basic_enemy("wolf", 500);
    let state = battle_against(vec![defender.clone()]);
    let strike = physical("strike", 20);
    let quake = psynergy("quake", Element::Venus, 40, 2);

    c.bench_function("physical_damage", |b| {
        let mut rng = SeededRng::new(1);
        b.iter(|| {
            calculate_damage(
                black_box(&attacker),
                black_box(&defender),
                &state.player_team,
                &strike,
                &mut rng,
            )
        });
    });

    c.bench_function("execute_ability_psynergy", |b| {
        let mut rng = SeededRng::new(2);
        let all = state.all_units();
        b.iter(|| {
            execute_ability(
                black_box(&attacker),
                &quake,
                &[&defender],
                &all,
                &state.player_team,
                &mut rng,
            )
        });
    });
}

/// One planning/execution round with four players and three enemies.
pub fn round_benchmark(c: &mut Criterion) {
    let state = battle_against(vec![
        basic_enemy("wolf", 5000),
        basic_enemy("bat", 5000),
        basic_enemy("slime", 5000),
    ]);
    let queued = queue_basic_attacks(&state);

    c.bench_function("execute_round", |b| {
        let mut rng = SeededRng::new(3);
        b.iter(|| execute_round(black_box(&queued), &mut rng));
    });
}

criterion_group!(benches, damage_benchmark, round_benchmark);
criterion_main!(benches);
