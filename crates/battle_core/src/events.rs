//! Battle event stream consumed by the presentation layer.
//!
//! The core only appends. Events are produced in the exact order effects
//! occur and carry no timing information.

use serde::{Deserialize, Serialize};

use crate::status::{StatusEffect, StatusKind};
use crate::turn_order::BattleOutcome;

/// Why a unit's action did not land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissReason {
    /// The target evaded.
    Dodged,
    /// Paralysis stopped the action.
    Paralyzed,
    /// Frozen solid this turn.
    Frozen,
    /// Stunned this turn.
    Stunned,
}

/// One narratable sub-effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEvent {
    /// A unit's turn begins.
    TurnStart {
        /// Round counter.
        round: u32,
        /// Acting unit.
        unit_id: String,
    },
    /// An ability or summon was used.
    Ability {
        /// Caster id.
        caster_id: String,
        /// Ability id.
        ability_id: String,
        /// Resolved targets.
        target_ids: Vec<String>,
        /// Composed narration.
        message: String,
    },
    /// Damage landed.
    Hit {
        /// Attacker, `None` for damage over time.
        source_id: Option<String>,
        /// Damaged unit.
        target_id: String,
        /// Actual damage after mitigation.
        amount: u32,
        /// Critical hit.
        critical: bool,
        /// Auto-revive saved the target.
        auto_revived: bool,
    },
    /// An action failed or was evaded.
    Miss {
        /// Acting unit.
        unit_id: String,
        /// Evading unit, when the miss was a dodge.
        target_id: Option<String>,
        /// Cause.
        reason: MissReason,
    },
    /// HP restored.
    Heal {
        /// Healed unit.
        target_id: String,
        /// HP restored.
        amount: u32,
        /// The unit was brought back from 0 HP.
        revived: bool,
    },
    /// A status was added.
    StatusApplied {
        /// Affected unit.
        target_id: String,
        /// The status.
        status: StatusEffect,
    },
    /// A status ran out or was removed.
    StatusExpired {
        /// Affected unit.
        target_id: String,
        /// Kind removed.
        kind: StatusKind,
    },
    /// A unit was knocked out.
    Ko {
        /// Knocked out unit.
        unit_id: String,
    },
    /// XP awarded after battle.
    Xp {
        /// Receiving unit.
        unit_id: String,
        /// XP gained.
        amount: u32,
        /// Level after the gain.
        new_level: u32,
        /// Abilities unlocked by the gain.
        unlocked_abilities: Vec<String>,
    },
    /// The battle is over.
    BattleEnd {
        /// Result.
        outcome: BattleOutcome,
    },
    /// Notice for the story layer.
    EncounterFinished {
        /// Encounter id.
        encounter_id: String,
        /// Result.
        outcome: BattleOutcome,
    },
}
