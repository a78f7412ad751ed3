//! Party aggregate: roster, shared mana pool and Djinn trackers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::DjinnData;
use crate::element::Element;
use crate::error::{BattleError, Result};
use crate::unit::Unit;

/// Units in a player party.
pub const PARTY_SIZE: usize = 4;

/// Djinn a team may have equipped at once.
pub const MAX_EQUIPPED_DJINN: usize = 3;

/// Djinn lifecycle. Transitions other than activation happen at round ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DjinnState {
    /// Ready: grants stats and abilities, can be summoned.
    Set,
    /// Spent this round. Moves to recovery at the round end.
    Standby {
        /// Recovery length once the round ends.
        recovery_rounds: u32,
    },
    /// Counting down to Set.
    Recovery {
        /// Round ends left before the Djinn is Set again.
        rounds_remaining: u32,
    },
}

/// Per-Djinn state within a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DjinnTracker {
    /// Djinn id.
    pub djinn_id: String,
    /// Element driving stat compatibility.
    pub element: Element,
    /// Abilities locked while not Set.
    pub granted_abilities: Vec<String>,
    /// Current state.
    pub state: DjinnState,
}

impl DjinnTracker {
    /// Player-facing description of why granted abilities are locked.
    #[must_use]
    pub fn lock_reason(&self) -> Option<String> {
        match self.state {
            DjinnState::Set => None,
            DjinnState::Standby { .. } => Some(format!("Djinn {} is on standby", self.djinn_id)),
            DjinnState::Recovery { rounds_remaining } => Some(format!(
                "Djinn {} is recovering ({rounds_remaining} rounds)",
                self.djinn_id
            )),
        }
    }
}

/// An ability that is unlocked but temporarily unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedAbility {
    /// Ability id.
    pub ability_id: String,
    /// Player-facing reason.
    pub reason: String,
}

/// A player party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Team {
    /// Roster in slot order.
    pub units: Vec<Unit>,
    /// Shared mana available each round.
    pub max_mana: u32,
    /// Mana left this round.
    pub remaining_mana: u32,
    /// Djinn owned by the party, in collection order.
    pub collected_djinn: Vec<String>,
    /// Djinn currently equipped.
    pub equipped_djinn: Vec<String>,
    /// State of every collected Djinn.
    pub djinn_trackers: BTreeMap<String, DjinnTracker>,
}

impl Team {
    /// Build a party. Exactly [`PARTY_SIZE`] units are required.
    pub fn new(units: Vec<Unit>) -> Result<Self> {
        if units.len() != PARTY_SIZE {
            return Err(BattleError::InvalidTeamSize {
                expected: PARTY_SIZE,
                actual: units.len(),
            });
        }
        let max_mana = units.iter().map(|u| u.mana_contribution).sum();
        Ok(Self {
            units,
            max_mana,
            remaining_mana: max_mana,
            ..Self::default()
        })
    }

    /// Whether a unit with this id is on the roster.
    #[must_use]
    pub fn contains(&self, unit_id: &str) -> bool {
        self.units.iter().any(|u| u.id == unit_id)
    }

    /// Look up a roster unit.
    #[must_use]
    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    /// Roster slot of a unit.
    #[must_use]
    pub fn slot_of(&self, unit_id: &str) -> Option<usize> {
        self.units.iter().position(|u| u.id == unit_id)
    }

    /// Snapshot with `unit` replacing the roster entry with the same id.
    #[must_use]
    pub fn with_unit(&self, unit: Unit) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.units.iter_mut().find(|u| u.id == unit.id) {
            *slot = unit;
        }
        next
    }

    /// Snapshot with mana restored to the maximum.
    #[must_use]
    pub fn with_refreshed_mana(&self) -> Self {
        let mut next = self.clone();
        next.remaining_mana = next.max_mana;
        next
    }

    /// Whether every unit is knocked out.
    #[must_use]
    pub fn is_wiped(&self) -> bool {
        self.units.iter().all(Unit::is_ko)
    }

    /// Snapshot owning `djinn`. Collecting twice is a no-op.
    #[must_use]
    pub fn collect_djinn(&self, djinn: &DjinnData) -> Self {
        let mut next = self.clone();
        if next.djinn_trackers.contains_key(&djinn.id) {
            return next;
        }
        next.collected_djinn.push(djinn.id.clone());
        next.djinn_trackers.insert(
            djinn.id.clone(),
            DjinnTracker {
                djinn_id: djinn.id.clone(),
                element: djinn.element,
                granted_abilities: djinn.granted_abilities.clone(),
                state: DjinnState::Set,
            },
        );
        next
    }

    /// Snapshot with a collected Djinn equipped.
    pub fn equip_djinn(&self, djinn_id: &str) -> Result<Self> {
        let unavailable = |reason: &str| BattleError::DjinnUnavailable {
            djinn_id: djinn_id.to_string(),
            reason: reason.to_string(),
        };
        if !self.djinn_trackers.contains_key(djinn_id) {
            return Err(unavailable("not collected"));
        }
        if self.equipped_djinn.iter().any(|d| d == djinn_id) {
            return Err(unavailable("already equipped"));
        }
        if self.equipped_djinn.len() >= MAX_EQUIPPED_DJINN {
            return Err(unavailable("all Djinn slots are full"));
        }
        let mut next = self.clone();
        next.equipped_djinn.push(djinn_id.to_string());
        Ok(next)
    }

    /// Trackers of equipped Djinn, in equip order.
    pub fn equipped_trackers(&self) -> impl Iterator<Item = &DjinnTracker> {
        self.equipped_djinn
            .iter()
            .filter_map(|id| self.djinn_trackers.get(id))
    }

    /// Why an ability is locked, if an equipped Djinn granting it is not Set.
    #[must_use]
    pub fn lock_reason(&self, ability_id: &str) -> Option<String> {
        self.equipped_trackers()
            .filter(|t| t.granted_abilities.iter().any(|a| a == ability_id))
            .find_map(DjinnTracker::lock_reason)
    }

    /// Abilities `unit` has unlocked but cannot use right now.
    #[must_use]
    pub fn locked_abilities(&self, unit: &Unit) -> Vec<LockedAbility> {
        unit.unlocked_abilities()
            .filter_map(|a| {
                self.lock_reason(&a.id).map(|reason| LockedAbility {
                    ability_id: a.id.clone(),
                    reason,
                })
            })
            .collect()
    }

    /// Recovery countdowns of Djinn in recovery, keyed by id.
    #[must_use]
    pub fn djinn_recovery_timers(&self) -> BTreeMap<String, u32> {
        self.djinn_trackers
            .values()
            .filter_map(|t| match t.state {
                DjinnState::Recovery { rounds_remaining } => {
                    Some((t.djinn_id.clone(), rounds_remaining))
                }
                _ => None,
            })
            .collect()
    }
}
