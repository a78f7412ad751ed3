//! Per-battle settings.

use serde::{Deserialize, Serialize};

use crate::data::EncounterData;

/// Settings fixed for the lifetime of one battle.
///
/// # Example RON
///
/// ```ron
/// BattleConfig(
///     encounter_id: Some("c1_boss"),
///     is_boss: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BattleConfig {
    /// Encounter reported to the story layer when the battle ends.
    pub encounter_id: Option<String>,
    /// Boss battles cannot be fled.
    pub is_boss: bool,
}

impl BattleConfig {
    /// Settings for a content-defined encounter.
    #[must_use]
    pub fn for_encounter(encounter: &EncounterData) -> Self {
        Self {
            encounter_id: Some(encounter.id.clone()),
            is_boss: encounter.is_boss,
        }
    }

    /// Set the encounter id.
    #[must_use]
    pub fn with_encounter(mut self, encounter_id: impl Into<String>) -> Self {
        self.encounter_id = Some(encounter_id.into());
        self
    }

    /// Mark as a boss battle.
    #[must_use]
    pub const fn with_boss(mut self, is_boss: bool) -> Self {
        self.is_boss = is_boss;
        self
    }
}
