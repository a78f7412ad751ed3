//! Builders shared by this crate's unit tests.

use crate::data::{Ability, AbilityType, TargetKind};
use crate::element::Element;
use crate::rng::Prng;
use crate::stats::Stats;
use crate::unit::{create_unit, Unit, UnitDefinition};

/// Replays a fixed list of draws, cycling. Field 1 counts draws.
pub struct FixedRng(pub Vec<f64>, pub usize);

impl FixedRng {
    pub fn always(value: f64) -> Self {
        Self(vec![value], 0)
    }
}

impl Prng for FixedRng {
    fn next_f64(&mut self) -> f64 {
        let v = self.0[self.1 % self.0.len()];
        self.1 += 1;
        v
    }
}

pub fn unit_with_stats(id: &str, stats: Stats) -> Unit {
    create_unit(
        &UnitDefinition {
            id: id.into(),
            name: id.into(),
            element: Element::Neutral,
            role: "Test".into(),
            base_stats: stats,
            growth_rates: Stats::default(),
            abilities: Vec::new(),
            mana_contribution: 1,
        },
        1,
        0,
    )
}

pub fn unit_with_hp(max_hp: i32) -> Unit {
    unit_with_stats("mia", Stats::new(max_hp, 30, 8, 9, 15, 10))
}

pub fn ability(id: &str, ability_type: AbilityType, base_power: u32, targets: TargetKind) -> Ability {
    Ability {
        id: id.into(),
        name: id.into(),
        ability_type,
        base_power,
        targets,
        ..Ability::basic_attack()
    }
}
