//! Data structures for battle content.
//!
//! This module contains pure data structures for abilities, units, enemies,
//! equipment, Djinn and encounters. All structs deserialize from RON files
//! and carry a `validate()` that reports schema problems.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `battle_tools`.

mod ability;
mod djinn_data;
mod equipment;
mod registry;
mod unit_data;

pub use ability::{
    Ability, AbilityType, AiHints, AiTargetHint, BuffEffect, CleanseKind, InflictedStatus,
    StatusInfliction, TargetKind, BASIC_ATTACK_ID, DEFAULT_ABILITY_ACCURACY,
    DEFAULT_BUFF_DURATION, MAX_MANA_COST,
};
pub use djinn_data::DjinnData;
pub use equipment::{Equipment, EquipmentLoadout, EquipmentSlot};
pub use registry::{parse_ron, ContentRegistry};
pub use unit_data::{EncounterData, EnemyData, EquipmentDrop, RewardValues, UnitData};
