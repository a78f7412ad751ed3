//! Unit, enemy and encounter definitions as authored in content files.

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::stats::Stats;

/// Playable or enemy unit definition referencing abilities by id.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "isaac",
///     name: "Isaac",
///     element: Venus,
///     role: "Balanced Warrior",
///     base_stats: Stats(hp: 100, pp: 20, atk: 14, def: 10, mag: 8, spd: 12),
///     growth_rates: Stats(hp: 10, pp: 2, atk: 3, def: 2, mag: 1, spd: 1),
///     abilities: ["slash", "quake"],
///     equipment: ["long-sword"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Elemental affinity.
    #[serde(default)]
    pub element: Element,
    /// Free-form role label.
    #[serde(default)]
    pub role: String,
    /// Level 1 stats.
    pub base_stats: Stats,
    /// Stats added per level beyond 1.
    #[serde(default)]
    pub growth_rates: Stats,
    /// Ability ids.
    #[serde(default)]
    pub abilities: Vec<String>,
    /// Starting equipment ids.
    #[serde(default)]
    pub equipment: Vec<String>,
    /// Shared mana this unit adds to its team.
    #[serde(default = "default_mana_contribution")]
    pub mana_contribution: u32,
}

const fn default_mana_contribution() -> u32 {
    1
}

impl UnitData {
    /// Check local constraints.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.id.is_empty() {
            errors.push("Unit with empty id".to_string());
        }
        if self.base_stats.hp < 1 {
            errors.push(format!("Unit '{}' must have at least 1 base HP", self.id));
        }
        if !self.base_stats.is_non_negative() {
            errors.push(format!("Unit '{}' has negative base stats", self.id));
        }
        if !self.growth_rates.is_non_negative() {
            errors.push(format!("Unit '{}' has negative growth rates", self.id));
        }
        let mut seen = std::collections::BTreeSet::new();
        for ability_id in &self.abilities {
            if !seen.insert(ability_id) {
                errors.push(format!(
                    "Unit '{}' lists ability '{}' twice",
                    self.id, ability_id
                ));
            }
        }
        errors
    }
}

/// Experience and gold an enemy is worth per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardValues {
    /// XP per enemy level.
    pub base_xp: u32,
    /// Gold per enemy level.
    pub base_gold: u32,
}

impl Default for RewardValues {
    fn default() -> Self {
        Self {
            base_xp: 10,
            base_gold: 5,
        }
    }
}

/// Enemy definition: a unit plus its level and rewards.
///
/// # Example RON
///
/// ```ron
/// EnemyData(
///     unit: UnitData(
///         id: "slime",
///         name: "Slime",
///         base_stats: Stats(hp: 40, atk: 9, def: 6, mag: 4, spd: 7),
///     ),
///     level: 2,
///     rewards: RewardValues(base_xp: 12, base_gold: 6),
///     drops: [EquipmentDrop(equipment: "leather-armor", chance: 0.1)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyData {
    /// Combat definition.
    pub unit: UnitData,
    /// Level the enemy spawns at.
    #[serde(default = "default_enemy_level")]
    pub level: u32,
    /// Rewards granted on defeat.
    #[serde(default)]
    pub rewards: RewardValues,
    /// Equipment that may drop on defeat, rolled in order.
    #[serde(default)]
    pub drops: Vec<EquipmentDrop>,
}

/// One entry of an enemy's drop table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentDrop {
    /// Equipment id.
    pub equipment: String,
    /// Drop chance in `[0, 1]`.
    pub chance: f64,
}

const fn default_enemy_level() -> u32 {
    1
}

/// A battle composition.
///
/// # Example RON
///
/// ```ron
/// EncounterData(
///     id: "c1_boss",
///     enemies: ["goblin-chief", "slime"],
///     is_boss: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterData {
    /// Encounter id, also the story flag source.
    pub id: String,
    /// Enemy ids, spawned in order.
    pub enemies: Vec<String>,
    /// Boss battles cannot be fled.
    #[serde(default)]
    pub is_boss: bool,
}
