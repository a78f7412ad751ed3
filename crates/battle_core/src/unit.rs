//! Combatant records.
//!
//! Units are value types. Every effect (damage, healing, status change,
//! XP gain) returns a new snapshot; nothing mutates a unit held by a
//! battle state in place.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::{Ability, Equipment, EquipmentLoadout};
use crate::element::Element;
use crate::stats::Stats;
use crate::status::StatusEffect;

/// Resolved unit definition: stats plus the abilities it can learn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Definition id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Elemental affinity.
    pub element: Element,
    /// Role label.
    pub role: String,
    /// Level 1 stats.
    pub base_stats: Stats,
    /// Stats added per level beyond 1.
    pub growth_rates: Stats,
    /// Learnable abilities.
    pub abilities: Vec<Ability>,
    /// Shared mana contributed to the team.
    pub mana_contribution: u32,
}

/// Aggregate per-battle counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct BattleStats {
    /// Actual damage dealt after mitigation.
    pub damage_dealt: u32,
    /// Actual damage taken after mitigation.
    pub damage_taken: u32,
    /// HP restored to others or self.
    pub healing_done: u32,
    /// Critical hits landed.
    pub critical_hits: u32,
}

/// A single combatant instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique id within a battle.
    pub id: String,
    /// Definition the unit was created from.
    pub definition_id: String,
    /// Display name.
    pub name: String,
    /// Elemental affinity.
    pub element: Element,
    /// Role label.
    pub role: String,
    /// Current level, at least 1.
    pub level: u32,
    /// Cumulative XP.
    pub xp: u32,
    /// Level 1 stats.
    pub base_stats: Stats,
    /// Stats added per level beyond 1.
    pub growth_rates: Stats,
    /// Current HP, always within `[0, max_hp]`.
    pub current_hp: u32,
    /// Active statuses in application order.
    pub status_effects: Vec<StatusEffect>,
    /// Per-battle counters.
    pub battle_stats: BattleStats,
    /// Abilities the unit can learn.
    pub abilities: Vec<Ability>,
    /// Learned ability ids. Only ever grows.
    pub unlocked_ability_ids: BTreeSet<String>,
    /// Worn items.
    pub equipment: EquipmentLoadout,
    /// Shared mana contributed to the team.
    pub mana_contribution: u32,
}

/// Create a unit at `level` with full HP.
///
/// Abilities whose unlock level is at or below `level` start unlocked.
#[must_use]
pub fn create_unit(definition: &UnitDefinition, level: u32, xp: u32) -> Unit {
    let level = level.max(1);
    let unlocked_ability_ids = definition
        .abilities
        .iter()
        .filter(|a| a.unlock_level <= level)
        .map(|a| a.id.clone())
        .collect();

    let mut unit = Unit {
        id: definition.id.clone(),
        definition_id: definition.id.clone(),
        name: definition.name.clone(),
        element: definition.element,
        role: definition.role.clone(),
        level,
        xp,
        base_stats: definition.base_stats,
        growth_rates: definition.growth_rates,
        current_hp: 0,
        status_effects: Vec::new(),
        battle_stats: BattleStats::default(),
        abilities: definition.abilities.clone(),
        unlocked_ability_ids,
        equipment: EquipmentLoadout::default(),
        mana_contribution: definition.mana_contribution,
    };
    unit.current_hp = unit.max_hp();
    unit
}

impl Unit {
    /// Base stats plus level growth.
    #[must_use]
    pub fn leveled_stats(&self) -> Stats {
        let levels = self.level.saturating_sub(1) as i32;
        self.base_stats.plus(self.growth_rates.scaled(levels))
    }

    /// Maximum HP: leveled HP plus equipment HP, at least 1.
    #[must_use]
    pub fn max_hp(&self) -> u32 {
        let hp = self.leveled_stats().hp + self.equipment.stat_bonus().hp;
        hp.max(1) as u32
    }

    /// Knocked out units stay in the roster with 0 HP.
    #[must_use]
    pub const fn is_ko(&self) -> bool {
        self.current_hp == 0
    }

    /// Whether the unit currently carries a status of this kind.
    #[must_use]
    pub fn has_status(&self, kind: crate::status::StatusKind) -> bool {
        self.status_effects.iter().any(|s| s.kind() == kind)
    }

    /// Snapshot with a different HP, clamped to `[0, max_hp]`.
    #[must_use]
    pub fn with_hp(&self, hp: u32) -> Self {
        let mut next = self.clone();
        next.current_hp = hp.min(self.max_hp());
        next
    }

    /// Snapshot with a new status list.
    #[must_use]
    pub fn with_statuses(&self, statuses: Vec<StatusEffect>) -> Self {
        let mut next = self.clone();
        next.status_effects = statuses;
        next
    }

    /// Snapshot wearing `item`. HP is re-clamped to the new maximum.
    #[must_use]
    pub fn with_equipment(mut self, item: Equipment) -> Self {
        let was_full = self.current_hp == self.max_hp();
        self.equipment = self.equipment.with_item(item);
        let max = self.max_hp();
        self.current_hp = if was_full { max } else { self.current_hp.min(max) };
        self
    }

    /// Look up a learned ability by id.
    #[must_use]
    pub fn unlocked_ability(&self, ability_id: &str) -> Option<&Ability> {
        if !self.unlocked_ability_ids.contains(ability_id) {
            return None;
        }
        self.abilities.iter().find(|a| a.id == ability_id)
    }

    /// Learned abilities in definition order.
    pub fn unlocked_abilities(&self) -> impl Iterator<Item = &Ability> {
        self.abilities
            .iter()
            .filter(|a| self.unlocked_ability_ids.contains(&a.id))
    }
}
