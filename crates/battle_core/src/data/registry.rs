//! Content registry: every definition loaded for a session.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use super::{
    Ability, DjinnData, EncounterData, EnemyData, Equipment, EquipmentDrop, RewardValues, UnitData,
};
use crate::error::{BattleError, Result};
use crate::unit::{create_unit, Unit, UnitDefinition};

/// Parse a RON document, tagging failures with `source`.
pub fn parse_ron<T: DeserializeOwned>(source: &str, text: &str) -> Result<T> {
    ron::from_str(text).map_err(|e| BattleError::DataParse {
        path: source.to_string(),
        message: e.to_string(),
    })
}

/// Read-only lookup of all loaded content, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
    abilities: BTreeMap<String, Ability>,
    units: BTreeMap<String, UnitData>,
    enemies: BTreeMap<String, EnemyData>,
    equipment: BTreeMap<String, Equipment>,
    djinn: BTreeMap<String, DjinnData>,
    encounters: BTreeMap<String, EncounterData>,
}

fn insert_unique<T>(map: &mut BTreeMap<String, T>, kind: &str, id: &str, value: T) -> Result<()> {
    if map.contains_key(id) {
        return Err(BattleError::Validation(vec![format!(
            "Duplicate {kind} id '{id}'"
        )]));
    }
    map.insert(id.to_string(), value);
    Ok(())
}

impl ContentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ability.
    pub fn add_ability(&mut self, ability: Ability) -> Result<()> {
        let id = ability.id.clone();
        insert_unique(&mut self.abilities, "ability", &id, ability)
    }

    /// Register a playable unit.
    pub fn add_unit(&mut self, unit: UnitData) -> Result<()> {
        let id = unit.id.clone();
        insert_unique(&mut self.units, "unit", &id, unit)
    }

    /// Register an enemy.
    pub fn add_enemy(&mut self, enemy: EnemyData) -> Result<()> {
        let id = enemy.unit.id.clone();
        insert_unique(&mut self.enemies, "enemy", &id, enemy)
    }

    /// Register a piece of equipment.
    pub fn add_equipment(&mut self, item: Equipment) -> Result<()> {
        let id = item.id.clone();
        insert_unique(&mut self.equipment, "equipment", &id, item)
    }

    /// Register a Djinn.
    pub fn add_djinn(&mut self, djinn: DjinnData) -> Result<()> {
        let id = djinn.id.clone();
        insert_unique(&mut self.djinn, "djinn", &id, djinn)
    }

    /// Register an encounter.
    pub fn add_encounter(&mut self, encounter: EncounterData) -> Result<()> {
        let id = encounter.id.clone();
        insert_unique(&mut self.encounters, "encounter", &id, encounter)
    }

    /// Look up an ability.
    #[must_use]
    pub fn ability(&self, id: &str) -> Option<&Ability> {
        self.abilities.get(id)
    }

    /// Look up a playable unit.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<&UnitData> {
        self.units.get(id)
    }

    /// Look up an enemy.
    #[must_use]
    pub fn enemy(&self, id: &str) -> Option<&EnemyData> {
        self.enemies.get(id)
    }

    /// Look up a piece of equipment.
    #[must_use]
    pub fn equipment(&self, id: &str) -> Option<&Equipment> {
        self.equipment.get(id)
    }

    /// Look up a Djinn.
    #[must_use]
    pub fn djinn(&self, id: &str) -> Option<&DjinnData> {
        self.djinn.get(id)
    }

    /// Look up an encounter.
    #[must_use]
    pub fn encounter(&self, id: &str) -> Option<&EncounterData> {
        self.encounters.get(id)
    }

    /// Playable units in id order.
    pub fn units(&self) -> impl Iterator<Item = &UnitData> {
        self.units.values()
    }

    /// Djinn in id order.
    pub fn all_djinn(&self) -> impl Iterator<Item = &DjinnData> {
        self.djinn.values()
    }

    /// Number of registered definitions of every kind.
    #[must_use]
    pub fn len(&self) -> usize {
        self.abilities.len()
            + self.units.len()
            + self.enemies.len()
            + self.equipment.len()
            + self.djinn.len()
            + self.encounters.len()
    }

    /// Whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewards for an enemy definition, falling back to defaults.
    #[must_use]
    pub fn rewards_for(&self, definition_id: &str) -> RewardValues {
        self.enemies
            .get(definition_id)
            .map(|e| e.rewards)
            .unwrap_or_default()
    }

    /// Drop table for an enemy definition, empty when unknown.
    #[must_use]
    pub fn drops_for(&self, definition_id: &str) -> &[EquipmentDrop] {
        self.enemies
            .get(definition_id)
            .map(|e| e.drops.as_slice())
            .unwrap_or_default()
    }

    /// Validate every definition and every cross-reference.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for ability in self.abilities.values() {
            errors.extend(ability.validate());
        }
        for item in self.equipment.values() {
            errors.extend(item.validate());
        }
        for djinn in self.djinn.values() {
            errors.extend(djinn.validate());
            for ability_id in &djinn.granted_abilities {
                if !self.abilities.contains_key(ability_id) {
                    errors.push(format!(
                        "Djinn '{}' grants unknown ability '{ability_id}'",
                        djinn.id
                    ));
                }
            }
        }

        let all_units = self
            .units
            .values()
            .map(|u| ("Unit", u))
            .chain(self.enemies.values().map(|e| ("Enemy", &e.unit)));
        for (kind, unit) in all_units {
            errors.extend(unit.validate());
            for ability_id in &unit.abilities {
                if !self.abilities.contains_key(ability_id) {
                    errors.push(format!(
                        "{kind} '{}' references unknown ability '{ability_id}'",
                        unit.id
                    ));
                }
            }
            for item_id in &unit.equipment {
                if !self.equipment.contains_key(item_id) {
                    errors.push(format!(
                        "{kind} '{}' references unknown equipment '{item_id}'",
                        unit.id
                    ));
                }
            }
        }

        for enemy in self.enemies.values() {
            for drop in &enemy.drops {
                if !self.equipment.contains_key(&drop.equipment) {
                    errors.push(format!(
                        "Enemy '{}' drops unknown equipment '{}'",
                        enemy.unit.id, drop.equipment
                    ));
                }
                if !(0.0..=1.0).contains(&drop.chance) {
                    errors.push(format!(
                        "Enemy '{}' drop chance {} outside [0, 1]",
                        enemy.unit.id, drop.chance
                    ));
                }
            }
        }

        for encounter in self.encounters.values() {
            if encounter.enemies.is_empty() {
                errors.push(format!("Encounter '{}' has no enemies", encounter.id));
            }
            for enemy_id in &encounter.enemies {
                if !self.enemies.contains_key(enemy_id) {
                    errors.push(format!(
                        "Encounter '{}' references unknown enemy '{enemy_id}'",
                        encounter.id
                    ));
                }
            }
        }

        errors
    }

    fn resolve(&self, data: &UnitData) -> Result<(UnitDefinition, Vec<Equipment>)> {
        let abilities = data
            .abilities
            .iter()
            .map(|id| {
                self.abilities.get(id).cloned().ok_or_else(|| {
                    BattleError::Validation(vec![format!(
                        "Unit '{}' references unknown ability '{id}'",
                        data.id
                    )])
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let equipment = data
            .equipment
            .iter()
            .map(|id| {
                self.equipment.get(id).cloned().ok_or_else(|| {
                    BattleError::Validation(vec![format!(
                        "Unit '{}' references unknown equipment '{id}'",
                        data.id
                    )])
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let definition = UnitDefinition {
            id: data.id.clone(),
            name: data.name.clone(),
            element: data.element,
            role: data.role.clone(),
            base_stats: data.base_stats,
            growth_rates: data.growth_rates,
            abilities,
            mana_contribution: data.mana_contribution,
        };
        Ok((definition, equipment))
    }

    /// Instantiate a playable unit with its starting equipment.
    pub fn create_unit(&self, id: &str, level: u32, xp: u32) -> Result<Unit> {
        let data = self
            .units
            .get(id)
            .ok_or_else(|| BattleError::UnknownUnit(id.to_string()))?;
        let (definition, equipment) = self.resolve(data)?;
        Ok(equipment
            .into_iter()
            .fold(create_unit(&definition, level, xp), |unit, item| {
                unit.with_equipment(item)
            }))
    }

    /// Instantiate the `index`-th copy of an enemy. Ids get a `#index` suffix.
    pub fn create_enemy(&self, id: &str, index: usize) -> Result<Unit> {
        let enemy = self
            .enemies
            .get(id)
            .ok_or_else(|| BattleError::UnknownUnit(id.to_string()))?;
        let (definition, equipment) = self.resolve(&enemy.unit)?;
        let mut unit = equipment.into_iter().fold(
            create_unit(&definition, enemy.level, 0),
            |unit, item| unit.with_equipment(item),
        );
        unit.id = format!("{id}#{index}");
        Ok(unit)
    }

    /// Instantiate every enemy of an encounter, in listed order.
    pub fn encounter_enemies(&self, encounter_id: &str) -> Result<Vec<Unit>> {
        let encounter = self.encounters.get(encounter_id).ok_or_else(|| {
            BattleError::InvalidState(format!("Unknown encounter '{encounter_id}'"))
        })?;
        encounter
            .enemies
            .iter()
            .enumerate()
            .map(|(index, id)| self.create_enemy(id, index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AbilityType, TargetKind};
    use crate::element::Element;
    use crate::stats::Stats;

    fn slash() -> Ability {
        Ability {
            id: "slash".into(),
            name: "Slash".into(),
            ability_type: AbilityType::Physical,
            base_power: 10,
            targets: TargetKind::SingleEnemy,
            ..Ability::basic_attack()
        }
    }

    fn isaac() -> UnitData {
        UnitData {
            id: "isaac".into(),
            name: "Isaac".into(),
            element: Element::Venus,
            role: "Warrior".into(),
            base_stats: Stats::new(100, 20, 14, 10, 8, 12),
            growth_rates: Stats::new(10, 2, 3, 2, 1, 1),
            abilities: vec!["slash".into()],
            equipment: Vec::new(),
            mana_contribution: 2,
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut registry = ContentRegistry::new();
        registry.add_ability(slash()).unwrap();
        assert!(registry.add_ability(slash()).is_err());
    }

    #[test]
    fn test_unknown_reference_reported() {
        let mut registry = ContentRegistry::new();
        registry.add_unit(isaac()).unwrap();
        let errors = registry.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("unknown ability 'slash'"));
        assert!(registry.create_unit("isaac", 1, 0).is_err());
    }

    #[test]
    fn test_create_unit_and_enemy() {
        let mut registry = ContentRegistry::new();
        registry.add_ability(slash()).unwrap();
        registry.add_unit(isaac()).unwrap();
        registry
            .add_enemy(EnemyData {
                unit: UnitData {
                    id: "slime".into(),
                    ..isaac()
                },
                level: 3,
                rewards: RewardValues::default(),
                drops: Vec::new(),
            })
            .unwrap();
        assert!(registry.validate().is_empty());

        let unit = registry.create_unit("isaac", 2, 100).unwrap();
        assert_eq!(unit.level, 2);
        assert_eq!(unit.mana_contribution, 2);
        assert!(unit.unlocked_ability_ids.contains("slash"));

        let enemy = registry.create_enemy("slime", 1).unwrap();
        assert_eq!(enemy.id, "slime#1");
        assert_eq!(enemy.definition_id, "slime");
        assert_eq!(enemy.level, 3);
        assert_eq!(registry.rewards_for("slime").base_xp, 10);

        registry
            .add_encounter(EncounterData {
                id: "c1_normal_1".into(),
                enemies: vec!["slime".into(), "slime".into()],
                is_boss: false,
            })
            .unwrap();
        let spawned = registry.encounter_enemies("c1_normal_1").unwrap();
        let ids: Vec<&str> = spawned.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["slime#0", "slime#1"]);
        assert!(registry.encounter_enemies("c9_boss").is_err());
    }

    #[test]
    fn test_drop_table_checked() {
        let mut registry = ContentRegistry::new();
        registry.add_ability(slash()).unwrap();
        registry
            .add_enemy(EnemyData {
                unit: UnitData {
                    id: "slime".into(),
                    ..isaac()
                },
                level: 1,
                rewards: RewardValues::default(),
                drops: vec![EquipmentDrop {
                    equipment: "crown".into(),
                    chance: 1.5,
                }],
            })
            .unwrap();
        let errors = registry.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("unknown equipment 'crown'"));
        assert!(errors[1].contains("drop chance 1.5"));
        assert_eq!(registry.drops_for("slime").len(), 1);
        assert!(registry.drops_for("ghost").is_empty());
    }

    #[test]
    fn test_parse_ron_error_names_source() {
        let err = parse_ron::<Vec<Ability>>("abilities.ron", "[ not ron").unwrap_err();
        match err {
            BattleError::DataParse { path, .. } => assert_eq!(path, "abilities.ron"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
