//! # Battle Core
//!
//! Deterministic combat and progression core for a party-based,
//! turn-based RPG.
//!
//! This crate contains **only** game rules:
//! - No rendering
//! - No IO beyond replay files
//! - No ambient randomness (every draw comes from an injected [`rng::Prng`])
//! - No in-place mutation of battle records
//!
//! This separation enables:
//! - Reproducible battles from a seed
//! - Replay verification
//! - Headless simulation and balance tooling
//! - Property and determinism testing
//!
//! ## Crate Structure
//!
//! - [`data`] - Content schemas (abilities, units, equipment, Djinn) and the registry
//! - [`unit`] / [`team`] - Combatant and party records
//! - [`stats`] / [`element`] - Effective stats and elemental modifiers
//! - [`combat`] - Hit, crit, damage, healing and revival formulas
//! - [`status`] - Status effects and the start-of-turn tick
//! - [`djinn`] - Djinn bonuses, activation, recovery and summons
//! - [`action`] - Executes one ability against resolved targets
//! - [`battle`] - Planning/execution round state machine
//! - [`rewards`] / [`progression`] - XP, levels and gold
//! - [`story`] - Encounter flags and chapter gating
//! - [`replay`] - Recording and verifying battles

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod action;
pub mod ai;
pub mod battle;
pub mod combat;
pub mod config;
pub mod data;
pub mod djinn;
pub mod element;
pub mod error;
pub mod events;
pub mod progression;
pub mod replay;
pub mod rewards;
pub mod rng;
pub mod stats;
pub mod status;
pub mod story;
pub mod targeting;
pub mod team;
pub mod turn_order;
pub mod unit;

#[cfg(test)]
mod test_support;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::action::{execute_ability, ActionResult, TargetEffect};
    pub use crate::battle::{
        clear_queued_action, execute_round, flee, queue_action, queue_djinn, unqueue_djinn,
        BattlePhase, BattleState, QueuedAction, RoundResult,
    };
    pub use crate::config::BattleConfig;
    pub use crate::data::{Ability, AbilityType, ContentRegistry, TargetKind};
    pub use crate::element::Element;
    pub use crate::error::{BattleError, Result};
    pub use crate::events::{BattleEvent, MissReason};
    pub use crate::replay::{state_hash, BattleReplay, RoundPlan};
    pub use crate::rewards::{calculate_battle_rewards, distribute_rewards, BattleRewards};
    pub use crate::rng::{Prng, SeededRng};
    pub use crate::stats::{effective_stats, Stats};
    pub use crate::status::{StatusEffect, StatusKind};
    pub use crate::story::{apply_battle_outcome, StoryState};
    pub use crate::team::Team;
    pub use crate::turn_order::{BattleOutcome, FleeResult};
    pub use crate::unit::{create_unit, Unit, UnitDefinition};
}
