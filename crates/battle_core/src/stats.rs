//! Stat blocks and effective stat resolution.
//!
//! Effective stats are a pure projection over a unit and its team. They are
//! never cached or written back, so status expiry and Djinn state changes
//! are reflected on the very next formula evaluation.

use serde::{Deserialize, Serialize};

use crate::djinn::djinn_stat_bonus;
use crate::status::StatusEffect;
use crate::team::Team;
use crate::unit::Unit;

/// Six-stat block used for base stats, growth rates, bonuses and results.
///
/// # Example RON
///
/// ```ron
/// Stats(hp: 100, pp: 20, atk: 14, def: 10, mag: 8, spd: 12)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Stats {
    /// Hit points.
    pub hp: i32,
    /// Psynergy points.
    pub pp: i32,
    /// Attack.
    pub atk: i32,
    /// Defense.
    pub def: i32,
    /// Magic.
    pub mag: i32,
    /// Speed.
    pub spd: i32,
}

impl Stats {
    /// Create a stat block.
    #[must_use]
    pub const fn new(hp: i32, pp: i32, atk: i32, def: i32, mag: i32, spd: i32) -> Self {
        Self {
            hp,
            pp,
            atk,
            def,
            mag,
            spd,
        }
    }

    /// Component-wise sum.
    #[must_use]
    pub const fn plus(self, other: Stats) -> Self {
        Self {
            hp: self.hp + other.hp,
            pp: self.pp + other.pp,
            atk: self.atk + other.atk,
            def: self.def + other.def,
            mag: self.mag + other.mag,
            spd: self.spd + other.spd,
        }
    }

    /// Every component multiplied by `factor`.
    #[must_use]
    pub const fn scaled(self, factor: i32) -> Self {
        Self {
            hp: self.hp * factor,
            pp: self.pp * factor,
            atk: self.atk * factor,
            def: self.def * factor,
            mag: self.mag * factor,
            spd: self.spd * factor,
        }
    }

    /// Read one buffable stat.
    #[must_use]
    pub const fn get(&self, kind: StatKind) -> i32 {
        match kind {
            StatKind::Atk => self.atk,
            StatKind::Def => self.def,
            StatKind::Mag => self.mag,
            StatKind::Spd => self.spd,
        }
    }

    /// Add `delta` to one buffable stat.
    #[must_use]
    pub fn with_delta(mut self, kind: StatKind, delta: i32) -> Self {
        match kind {
            StatKind::Atk => self.atk += delta,
            StatKind::Def => self.def += delta,
            StatKind::Mag => self.mag += delta,
            StatKind::Spd => self.spd += delta,
        }
        self
    }

    /// Apply the minimum floors every effective stat respects.
    #[must_use]
    pub fn floored(self) -> Self {
        Self {
            hp: self.hp.max(1),
            pp: self.pp.max(0),
            atk: self.atk.max(1),
            def: self.def.max(0),
            mag: self.mag.max(1),
            spd: self.spd.max(1),
        }
    }

    /// Whether every component is non-negative.
    #[must_use]
    pub const fn is_non_negative(&self) -> bool {
        self.hp >= 0
            && self.pp >= 0
            && self.atk >= 0
            && self.def >= 0
            && self.mag >= 0
            && self.spd >= 0
    }
}

/// Stats that buffs and debuffs can modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatKind {
    /// Attack.
    Atk,
    /// Defense.
    Def,
    /// Magic.
    Mag,
    /// Speed.
    Spd,
}

/// Resolve a unit's effective stats.
///
/// Sums, in order: base stats, level growth, equipment bonuses, Djinn grants
/// (only when the unit belongs to `team`), and every buff/debuff modifier.
/// The sum is left unclamped until the final floors are applied.
#[must_use]
pub fn effective_stats(unit: &Unit, team: &Team) -> Stats {
    let mut stats = unit.leveled_stats().plus(unit.equipment.stat_bonus());

    if team.contains(&unit.id) {
        stats = stats.plus(djinn_stat_bonus(unit.element, team));
    }

    for status in &unit.status_effects {
        if let StatusEffect::Buff {
            stat, modifier, ..
        }
        | StatusEffect::Debuff {
            stat, modifier, ..
        } = status
        {
            stats = stats.with_delta(*stat, *modifier);
        }
    }

    stats.floored()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::unit::{create_unit, UnitDefinition};

    fn definition() -> UnitDefinition {
        UnitDefinition {
            id: "isaac".into(),
            name: "Isaac".into(),
            element: Element::Venus,
            role: "Warrior".into(),
            base_stats: Stats::new(100, 20, 14, 10, 8, 12),
            growth_rates: Stats::new(10, 2, 3, 2, 1, 1),
            abilities: Vec::new(),
            mana_contribution: 1,
        }
    }

    #[test]
    fn test_level_growth_applied() {
        let unit = create_unit(&definition(), 3, 0);
        let team = Team::default();
        let stats = effective_stats(&unit, &team);
        assert_eq!(stats.hp, 120);
        assert_eq!(stats.atk, 20);
        assert_eq!(stats.spd, 14);
    }

    #[test]
    fn test_buffs_and_debuffs_sum() {
        let mut unit = create_unit(&definition(), 1, 0);
        unit.status_effects = vec![
            StatusEffect::Buff {
                stat: StatKind::Atk,
                modifier: 5,
                duration: 2,
            },
            StatusEffect::Buff {
                stat: StatKind::Atk,
                modifier: 3,
                duration: 1,
            },
            StatusEffect::Debuff {
                stat: StatKind::Def,
                modifier: -4,
                duration: 2,
            },
        ];
        let stats = effective_stats(&unit, &Team::default());
        assert_eq!(stats.atk, 22);
        assert_eq!(stats.def, 6);
    }

    #[test]
    fn test_floors_applied_after_sum() {
        let mut unit = create_unit(&definition(), 1, 0);
        unit.status_effects = vec![StatusEffect::Debuff {
            stat: StatKind::Spd,
            modifier: -50,
            duration: 3,
        }];
        let stats = effective_stats(&unit, &Team::default());
        assert_eq!(stats.spd, 1);
    }

    #[test]
    fn test_stored_stats_untouched() {
        let mut unit = create_unit(&definition(), 1, 0);
        unit.status_effects = vec![StatusEffect::Buff {
            stat: StatKind::Mag,
            modifier: 10,
            duration: 3,
        }];
        let _ = effective_stats(&unit, &Team::default());
        assert_eq!(unit.base_stats.mag, 8);
    }
}
