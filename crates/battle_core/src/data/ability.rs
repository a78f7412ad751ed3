//! Ability definitions.

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::progression::MAX_LEVEL;
use crate::stats::StatKind;

/// Highest mana cost an ability may declare.
pub const MAX_MANA_COST: u32 = 5;

/// Hit chance used when an ability does not declare its own accuracy.
pub const DEFAULT_ABILITY_ACCURACY: f64 = 0.95;

/// Duration of buffs and debuffs that do not declare one.
pub const DEFAULT_BUFF_DURATION: u32 = 3;

/// Id of the built-in basic attack.
pub const BASIC_ATTACK_ID: &str = "attack";

/// How an ability resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityType {
    /// ATK-based damage.
    Physical,
    /// MAG-based, element-aware damage.
    Psynergy,
    /// Restores HP, optionally reviving.
    Healing,
    /// Positive stat modifiers.
    Buff,
    /// Negative stat modifiers.
    Debuff,
    /// Summons resolve through Djinn, not through unit actions.
    Summon,
}

/// Which units an ability can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    /// First living enemy.
    SingleEnemy,
    /// Every living enemy.
    AllEnemies,
    /// First living ally.
    SingleAlly,
    /// Every living ally.
    AllAllies,
    /// The caster only.
    Caster,
}

impl TargetKind {
    /// Whether the ability aims at the caster's opponents.
    #[must_use]
    pub const fn is_hostile(self) -> bool {
        matches!(self, TargetKind::SingleEnemy | TargetKind::AllEnemies)
    }
}

/// Per-stat deltas granted by buff/debuff abilities.
///
/// Only declared stats produce a status entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BuffEffect {
    /// Attack delta.
    pub atk: Option<i32>,
    /// Defense delta.
    pub def: Option<i32>,
    /// Magic delta.
    pub mag: Option<i32>,
    /// Speed delta.
    pub spd: Option<i32>,
}

impl BuffEffect {
    /// Declared deltas in fixed stat order.
    #[must_use]
    pub fn entries(&self) -> Vec<(StatKind, i32)> {
        [
            (StatKind::Atk, self.atk),
            (StatKind::Def, self.def),
            (StatKind::Mag, self.mag),
            (StatKind::Spd, self.spd),
        ]
        .into_iter()
        .filter_map(|(kind, delta)| delta.map(|d| (kind, d)))
        .collect()
    }
}

/// Negative statuses an attack can inflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InflictedStatus {
    /// Damage over time, 8% max HP.
    Poison,
    /// Damage over time, 10% max HP.
    Burn,
    /// Skips turns until broken.
    Freeze,
    /// Actions may fail.
    Paralyze,
    /// Skips turns.
    Stun,
}

/// Status infliction carried by a damaging ability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusInfliction {
    /// Status to inflict.
    pub kind: InflictedStatus,
    /// Duration in turns.
    pub duration: u32,
    /// Chance to land per hit target.
    #[serde(default = "default_chance")]
    pub chance: f64,
}

const fn default_chance() -> f64 {
    1.0
}

/// Which statuses a healing ability removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleanseKind {
    /// Poison, burn, freeze, debuff, paralyze and stun.
    Negative,
    /// Every status.
    All,
}

/// Targeting preference used by the enemy AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiTargetHint {
    /// Lowest current HP.
    Weakest,
    /// Any living target.
    Random,
    /// Lowest resistance.
    LowestRes,
    /// Prefer healers.
    HealerFirst,
    /// Highest defense.
    HighestDef,
}

/// Hints for the enemy AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AiHints {
    /// Selection priority, 0-3.
    pub priority: u8,
    /// Preferred target.
    pub target: Option<AiTargetHint>,
    /// Avoid wasting big hits on nearly dead targets.
    pub avoid_overkill: bool,
    /// Prefer on the first round.
    pub opener: bool,
}

/// Immutable ability definition.
///
/// # Example RON
///
/// ```ron
/// Ability(
///     id: "ragnarok",
///     name: "Ragnarok",
///     ability_type: Psynergy,
///     element: Some(Venus),
///     mana_cost: 2,
///     base_power: 40,
///     targets: SingleEnemy,
///     unlock_level: 3,
///     ignore_defense_percent: Some(0.25),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    /// Unique kebab-case identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Resolution branch.
    pub ability_type: AbilityType,
    /// Element for psynergy modifiers and resistances.
    #[serde(default)]
    pub element: Option<Element>,
    /// Shared team mana spent when queued.
    #[serde(default)]
    pub mana_cost: u32,
    /// Base power; physical abilities with 0 use the attacker's ATK.
    #[serde(default)]
    pub base_power: u32,
    /// Targeting rule.
    pub targets: TargetKind,
    /// Level at which a unit learns it.
    #[serde(default = "default_unlock_level")]
    pub unlock_level: u32,
    /// Stat deltas for buff/debuff abilities.
    #[serde(default)]
    pub buff_effect: Option<BuffEffect>,
    /// Duration of applied statuses.
    #[serde(default)]
    pub duration: Option<u32>,
    /// Fraction of target defense ignored.
    #[serde(default)]
    pub ignore_defense_percent: Option<f64>,
    /// Healing may revive knocked out allies.
    #[serde(default)]
    pub revives_fallen: bool,
    /// Hit chance before evasion.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Status inflicted on hit.
    #[serde(default)]
    pub status_effect: Option<StatusInfliction>,
    /// Statuses removed by healing.
    #[serde(default)]
    pub cleanse: Option<CleanseKind>,
    /// Enemy AI hints.
    #[serde(default)]
    pub ai_hints: Option<AiHints>,
}

const fn default_unlock_level() -> u32 {
    1
}

impl Ability {
    /// The free single-target physical attack every unit can fall back on.
    #[must_use]
    pub fn basic_attack() -> Self {
        Self {
            id: BASIC_ATTACK_ID.to_string(),
            name: "Attack".to_string(),
            ability_type: AbilityType::Physical,
            element: None,
            mana_cost: 0,
            base_power: 0,
            targets: TargetKind::SingleEnemy,
            unlock_level: 1,
            buff_effect: None,
            duration: None,
            ignore_defense_percent: None,
            revives_fallen: false,
            accuracy: None,
            status_effect: None,
            cleanse: None,
            ai_hints: None,
        }
    }

    /// Accuracy before evasion.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy.unwrap_or(DEFAULT_ABILITY_ACCURACY)
    }

    /// Defense ignore fraction, clamped to `[0, 1]`.
    #[must_use]
    pub fn ignore_defense(&self) -> f64 {
        self.ignore_defense_percent.unwrap_or(0.0).clamp(0.0, 1.0)
    }

    /// Whether the ability deals damage.
    #[must_use]
    pub const fn is_damaging(&self) -> bool {
        matches!(
            self.ability_type,
            AbilityType::Physical | AbilityType::Psynergy
        )
    }

    /// AI priority, 0 when no hints are set.
    #[must_use]
    pub fn ai_priority(&self) -> u8 {
        self.ai_hints.map_or(0, |h| h.priority)
    }

    /// Check schema constraints. Returns one message per violation.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !is_kebab_case(&self.id) {
            errors.push(format!("Ability '{}' id must be kebab-case", self.id));
        }
        if self.name.trim().is_empty() {
            errors.push(format!("Ability '{}' has an empty name", self.id));
        }
        if self.mana_cost > MAX_MANA_COST {
            errors.push(format!(
                "Ability '{}' mana cost {} exceeds {MAX_MANA_COST}",
                self.id, self.mana_cost
            ));
        }
        if self.unlock_level < 1 || self.unlock_level > MAX_LEVEL {
            errors.push(format!(
                "Ability '{}' unlock level {} outside 1..={MAX_LEVEL}",
                self.id, self.unlock_level
            ));
        }
        if let Some(pct) = self.ignore_defense_percent {
            if !(0.0..=1.0).contains(&pct) {
                errors.push(format!(
                    "Ability '{}' ignore_defense_percent {pct} outside [0, 1]",
                    self.id
                ));
            }
        }
        if let Some(acc) = self.accuracy {
            if !(0.0..=1.0).contains(&acc) {
                errors.push(format!("Ability '{}' accuracy {acc} outside [0, 1]", self.id));
            }
        }
        if self.duration == Some(0) {
            errors.push(format!("Ability '{}' duration must be at least 1", self.id));
        }
        if let Some(status) = &self.status_effect {
            if !(0.0..=1.0).contains(&status.chance) {
                errors.push(format!(
                    "Ability '{}' status chance {} outside [0, 1]",
                    self.id, status.chance
                ));
            }
            if status.duration == 0 {
                errors.push(format!(
                    "Ability '{}' status duration must be at least 1",
                    self.id
                ));
            }
        }
        if let Some(hints) = &self.ai_hints {
            if hints.priority > 3 {
                errors.push(format!(
                    "Ability '{}' AI priority {} exceeds 3",
                    self.id, hints.priority
                ));
            }
        }
        if matches!(self.ability_type, AbilityType::Buff | AbilityType::Debuff)
            && self.buff_effect.map_or(true, |b| b.entries().is_empty())
        {
            errors.push(format!(
                "Ability '{}' is a buff/debuff without stat deltas",
                self.id
            ));
        }

        errors
    }
}

fn is_kebab_case(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('-')
        && !id.ends_with('-')
        && !id.contains("--")
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
