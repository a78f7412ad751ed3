//! Equipment definitions and per-unit loadouts.

use serde::{Deserialize, Serialize};

use crate::stats::Stats;

/// Equipment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EquipmentSlot {
    /// Weapon.
    Weapon,
    /// Body armor.
    Armor,
    /// Helm.
    Helm,
    /// Boots.
    Boots,
    /// Accessory.
    Accessory,
}

/// A piece of equipment.
///
/// # Example RON
///
/// ```ron
/// Equipment(
///     id: "hermes-sandals",
///     name: "Hermes' Sandals",
///     slot: Boots,
///     stat_bonus: Stats(spd: 4),
///     evasion: 5,
///     always_first_turn: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Slot the item occupies.
    pub slot: EquipmentSlot,
    /// Flat stat bonuses.
    #[serde(default)]
    pub stat_bonus: Stats,
    /// Evasion in percentage points.
    #[serde(default)]
    pub evasion: u32,
    /// Fraction of elemental damage blocked, `[0, 1]`.
    #[serde(default)]
    pub elemental_resist: f64,
    /// Wearer acts before everyone without this flag.
    #[serde(default)]
    pub always_first_turn: bool,
}

impl Equipment {
    /// Check value ranges.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.id.is_empty() {
            errors.push("Equipment with empty id".to_string());
        }
        if self.evasion > 100 {
            errors.push(format!(
                "Equipment '{}' evasion {} exceeds 100",
                self.id, self.evasion
            ));
        }
        if !(0.0..=1.0).contains(&self.elemental_resist) {
            errors.push(format!(
                "Equipment '{}' elemental_resist {} outside [0, 1]",
                self.id, self.elemental_resist
            ));
        }
        if self.always_first_turn && self.slot != EquipmentSlot::Boots {
            errors.push(format!(
                "Equipment '{}' grants first turn but is not boots",
                self.id
            ));
        }
        errors
    }
}

/// Items a unit currently wears, one per slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EquipmentLoadout {
    /// Weapon slot.
    pub weapon: Option<Equipment>,
    /// Armor slot.
    pub armor: Option<Equipment>,
    /// Helm slot.
    pub helm: Option<Equipment>,
    /// Boots slot.
    pub boots: Option<Equipment>,
    /// Accessory slot.
    pub accessory: Option<Equipment>,
}

impl EquipmentLoadout {
    /// Put `item` into its slot, replacing whatever was there.
    #[must_use]
    pub fn with_item(mut self, item: Equipment) -> Self {
        let slot = match item.slot {
            EquipmentSlot::Weapon => &mut self.weapon,
            EquipmentSlot::Armor => &mut self.armor,
            EquipmentSlot::Helm => &mut self.helm,
            EquipmentSlot::Boots => &mut self.boots,
            EquipmentSlot::Accessory => &mut self.accessory,
        };
        *slot = Some(item);
        self
    }

    /// Iterate over equipped items.
    pub fn items(&self) -> impl Iterator<Item = &Equipment> {
        [
            &self.weapon,
            &self.armor,
            &self.helm,
            &self.boots,
            &self.accessory,
        ]
        .into_iter()
        .flatten()
    }

    /// Summed stat bonuses.
    #[must_use]
    pub fn stat_bonus(&self) -> Stats {
        self.items()
            .fold(Stats::default(), |acc, item| acc.plus(item.stat_bonus))
    }

    /// Evasion percentage points from boots.
    #[must_use]
    pub fn evasion(&self) -> u32 {
        self.boots.as_ref().map_or(0, |b| b.evasion)
    }

    /// Elemental resist from body armor.
    #[must_use]
    pub fn elemental_resist(&self) -> f64 {
        self.armor.as_ref().map_or(0.0, |a| a.elemental_resist)
    }

    /// Whether the boots grant the first turn.
    #[must_use]
    pub fn always_first_turn(&self) -> bool {
        self.boots.as_ref().is_some_and(|b| b.always_first_turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boots() -> Equipment {
        Equipment {
            id: "hermes-sandals".into(),
            name: "Hermes' Sandals".into(),
            slot: EquipmentSlot::Boots,
            stat_bonus: Stats {
                spd: 4,
                ..Stats::default()
            },
            evasion: 5,
            elemental_resist: 0.0,
            always_first_turn: true,
        }
    }

    #[test]
    fn test_loadout_bonuses() {
        let sword = Equipment {
            id: "long-sword".into(),
            name: "Long Sword".into(),
            slot: EquipmentSlot::Weapon,
            stat_bonus: Stats {
                atk: 6,
                ..Stats::default()
            },
            evasion: 0,
            elemental_resist: 0.0,
            always_first_turn: false,
        };
        let loadout = EquipmentLoadout::default().with_item(sword).with_item(boots());
        assert_eq!(loadout.stat_bonus().atk, 6);
        assert_eq!(loadout.stat_bonus().spd, 4);
        assert_eq!(loadout.evasion(), 5);
        assert!(loadout.always_first_turn());
    }

    #[test]
    fn test_first_turn_only_on_boots() {
        let mut item = boots();
        item.slot = EquipmentSlot::Helm;
        assert_eq!(item.validate().len(), 1);
    }
}
