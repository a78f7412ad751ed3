//! Test fixtures and helpers.
//!
//! Pre-built units, parties and battles for consistent testing.

use battle_core::battle::{queue_action, BattleState};
use battle_core::config::BattleConfig;
use battle_core::data::{Ability, AbilityType, TargetKind, BASIC_ATTACK_ID};
use battle_core::element::Element;
use battle_core::rng::Prng;
use battle_core::stats::Stats;
use battle_core::team::Team;
use battle_core::unit::{create_unit, Unit, UnitDefinition};

/// Replays a fixed script of draws, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: Vec<f64>,
    draws: usize,
}

impl ScriptedRng {
    /// Cycle through `values`.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "ScriptedRng needs at least one value");
        Self { values, draws: 0 }
    }

    /// Always return `value`.
    #[must_use]
    pub fn always(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Draws taken so far.
    #[must_use]
    pub const fn draws(&self) -> usize {
        self.draws
    }
}

impl Prng for ScriptedRng {
    fn next_f64(&mut self) -> f64 {
        let value = self.values[self.draws % self.values.len()];
        self.draws += 1;
        value
    }
}

/// Level 1 Neutral unit with the given stats and no abilities.
#[must_use]
pub fn unit_with_stats(id: &str, stats: Stats) -> Unit {
    create_unit(
        &UnitDefinition {
            id: id.to_string(),
            name: id.to_string(),
            element: Element::Neutral,
            role: "Fixture".to_string(),
            base_stats: stats,
            growth_rates: Stats::default(),
            abilities: Vec::new(),
            mana_contribution: 1,
        },
        1,
        0,
    )
}

/// A sturdy all-rounder.
#[must_use]
pub fn basic_unit(id: &str) -> Unit {
    unit_with_stats(id, Stats::new(100, 20, 15, 10, 12, 10))
}

/// Four [`basic_unit`]s with distinct speeds, fastest first.
///
/// # Panics
///
/// Never: the roster always has four units.
#[must_use]
pub fn basic_team() -> Team {
    let units = ["isaac", "garet", "ivan", "mia"]
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let mut unit = basic_unit(id);
            unit.base_stats.spd = 14 - i as i32;
            unit
        })
        .collect();
    Team::new(units).expect("four units")
}

/// Enemy with the given HP and a low speed.
#[must_use]
pub fn basic_enemy(id: &str, hp: i32) -> Unit {
    unit_with_stats(id, Stats::new(hp, 0, 12, 6, 8, 4))
}

/// Physical single-target ability.
#[must_use]
pub fn physical(id: &str, base_power: u32) -> Ability {
    Ability {
        id: id.to_string(),
        name: id.to_string(),
        base_power,
        ..Ability::basic_attack()
    }
}

/// Elemental psynergy ability.
#[must_use]
pub fn psynergy(id: &str, element: Element, base_power: u32, mana_cost: u32) -> Ability {
    Ability {
        ability_type: AbilityType::Psynergy,
        element: Some(element),
        mana_cost,
        ..physical(id, base_power)
    }
}

/// Single-ally heal.
#[must_use]
pub fn healing(id: &str, base_power: u32) -> Ability {
    Ability {
        ability_type: AbilityType::Healing,
        targets: TargetKind::SingleAlly,
        ..physical(id, base_power)
    }
}

/// `unit` with `ability` learned.
#[must_use]
pub fn with_ability(mut unit: Unit, ability: Ability) -> Unit {
    unit.unlocked_ability_ids.insert(ability.id.clone());
    unit.abilities.push(ability);
    unit
}

/// A battle in round 1 planning against `enemies`.
#[must_use]
pub fn battle_against(enemies: Vec<Unit>) -> BattleState {
    BattleState::new(basic_team(), enemies, BattleConfig::default())
}

/// Queue a basic attack on the first living enemy for every living unit.
///
/// Returns `state` unchanged once no enemy is standing.
#[must_use]
pub fn queue_basic_attacks(state: &BattleState) -> BattleState {
    let Some(target) = state.enemies.iter().find(|e| !e.is_ko()) else {
        return state.clone();
    };
    let target = vec![target.id.clone()];
    let mut next = state.clone();
    for unit in state.player_team.units.iter().filter(|u| !u.is_ko()) {
        if let Ok(queued) = queue_action(&next, &unit.id, BASIC_ATTACK_ID, &target) {
            next = queued;
        }
    }
    next
}
