//! Ability execution: the pipeline that ties every formula together.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::combat::{
    apply_damage_with_shields, apply_healing, calculate_damage, calculate_healing,
    check_critical, check_dodge, critical_damage, revive_unit,
};
use crate::data::{
    Ability, AbilityType, CleanseKind, InflictedStatus, StatusInfliction, DEFAULT_BUFF_DURATION,
};
use crate::events::{BattleEvent, MissReason};
use crate::rng::Prng;
use crate::status::{apply_status_to_unit, is_immune, remove_statuses, StatusEffect, StatusKind};
use crate::team::Team;
use crate::unit::Unit;

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetEffect {
    /// Damage pipeline ran and the result was applied.
    Hit {
        /// Target id.
        target_id: String,
        /// Damage that got through.
        damage: u32,
        /// Auto-revive saved the target.
        auto_revived: bool,
        /// This hit took the target from alive to 0 HP.
        knocked_out: bool,
    },
    /// The target evaded; it is passed through unchanged.
    Dodged {
        /// Target id.
        target_id: String,
    },
    /// HP restored.
    Healed {
        /// Target id.
        target_id: String,
        /// HP restored.
        amount: u32,
    },
    /// Brought back from 0 HP.
    Revived {
        /// Target id.
        target_id: String,
        /// HP after revival.
        hp: u32,
    },
    /// A status was appended.
    StatusApplied {
        /// Target id.
        target_id: String,
        /// The status.
        status: StatusEffect,
    },
    /// An immunity rejected the status.
    StatusBlocked {
        /// Target id.
        target_id: String,
        /// Rejected kind.
        kind: StatusKind,
    },
    /// Statuses removed by a cleanse.
    Cleansed {
        /// Target id.
        target_id: String,
        /// Removed kinds in list order.
        removed: Vec<StatusKind>,
    },
    /// Nothing happened to this target.
    Unaffected {
        /// Target id.
        target_id: String,
    },
    /// The ability type has no resolution here.
    NotImplemented {
        /// Offending type.
        ability_type: AbilityType,
    },
}

/// Full outcome of one ability use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Caster id.
    pub caster_id: String,
    /// Ability id.
    pub ability_id: String,
    /// Targets in resolution order.
    pub target_ids: Vec<String>,
    /// Per-target effects in the order they happened.
    pub effects: Vec<TargetEffect>,
    /// Sum of actual damage.
    pub total_damage: u32,
    /// Sum of HP restored, revivals included.
    pub total_healing: u32,
    /// The shared crit roll succeeded.
    pub critical: bool,
    /// Composed narration.
    pub message: String,
    /// Every unit from the input roster, updated.
    pub updated_units: Vec<Unit>,
}

impl ActionResult {
    /// Updated snapshot of one unit.
    #[must_use]
    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.updated_units.iter().find(|u| u.id == unit_id)
    }

    /// Translate into events: the ability, then one per sub-effect.
    #[must_use]
    pub fn events(&self) -> Vec<BattleEvent> {
        let mut events = vec![BattleEvent::Ability {
            caster_id: self.caster_id.clone(),
            ability_id: self.ability_id.clone(),
            target_ids: self.target_ids.clone(),
            message: self.message.clone(),
        }];

        for effect in &self.effects {
            match effect {
                TargetEffect::Hit {
                    target_id,
                    damage,
                    auto_revived,
                    knocked_out,
                } => {
                    events.push(BattleEvent::Hit {
                        source_id: Some(self.caster_id.clone()),
                        target_id: target_id.clone(),
                        amount: *damage,
                        critical: self.critical,
                        auto_revived: *auto_revived,
                    });
                    if *knocked_out {
                        events.push(BattleEvent::Ko {
                            unit_id: target_id.clone(),
                        });
                    }
                }
                TargetEffect::Dodged { target_id } => events.push(BattleEvent::Miss {
                    unit_id: self.caster_id.clone(),
                    target_id: Some(target_id.clone()),
                    reason: MissReason::Dodged,
                }),
                TargetEffect::Healed { target_id, amount } => events.push(BattleEvent::Heal {
                    target_id: target_id.clone(),
                    amount: *amount,
                    revived: false,
                }),
                TargetEffect::Revived { target_id, hp } => events.push(BattleEvent::Heal {
                    target_id: target_id.clone(),
                    amount: *hp,
                    revived: true,
                }),
                TargetEffect::StatusApplied { target_id, status } => {
                    events.push(BattleEvent::StatusApplied {
                        target_id: target_id.clone(),
                        status: status.clone(),
                    });
                }
                TargetEffect::Cleansed { target_id, removed } => {
                    events.extend(removed.iter().map(|kind| BattleEvent::StatusExpired {
                        target_id: target_id.clone(),
                        kind: *kind,
                    }));
                }
                TargetEffect::StatusBlocked { .. }
                | TargetEffect::Unaffected { .. }
                | TargetEffect::NotImplemented { .. } => {}
            }
        }

        events
    }
}

struct Roster {
    units: Vec<Unit>,
}

impl Roster {
    fn get(&self, id: &str) -> Option<Unit> {
        self.units.iter().find(|u| u.id == id).cloned()
    }

    fn put(&mut self, unit: Unit) {
        if let Some(slot) = self.units.iter_mut().find(|u| u.id == unit.id) {
            *slot = unit;
        }
    }

    fn update<F: FnOnce(&mut Unit)>(&mut self, id: &str, f: F) {
        if let Some(slot) = self.units.iter_mut().find(|u| u.id == id) {
            f(slot);
        }
    }
}

/// Execute `ability` from `caster` against `targets`.
///
/// `all_units` is every combatant; the result carries updated copies of all
/// of them. Randomness is consumed in a fixed order: one crit roll for the
/// whole ability, then per target a dodge roll, a variance roll, and a
/// status chance roll when the ability inflicts one below 100%.
pub fn execute_ability(
    caster: &Unit,
    ability: &Ability,
    targets: &[&Unit],
    all_units: &[Unit],
    team: &Team,
    rng: &mut dyn Prng,
) -> ActionResult {
    let mut roster = Roster {
        units: all_units.to_vec(),
    };
    let target_ids: Vec<String> = targets.iter().map(|t| t.id.clone()).collect();
    let mut effects = Vec::new();
    let mut total_damage = 0u32;
    let mut total_healing = 0u32;
    let mut critical = false;
    let mut message = format!("{} uses {}!", caster.name, ability.name);

    match ability.ability_type {
        AbilityType::Physical | AbilityType::Psynergy => {
            critical = check_critical(caster, team, rng);
            let mut landed = 0usize;

            for target_id in &target_ids {
                let Some(current) = roster.get(target_id) else {
                    continue;
                };
                if check_dodge(caster, &current, team, ability.accuracy(), rng) {
                    effects.push(TargetEffect::Dodged {
                        target_id: target_id.clone(),
                    });
                    continue;
                }

                let mut nominal = calculate_damage(caster, &current, team, ability, rng);
                if critical {
                    nominal = critical_damage(nominal);
                }
                let applied = apply_damage_with_shields(&current, nominal);
                landed += 1;
                total_damage += applied.actual_damage;
                let knocked_out = !current.is_ko() && applied.unit.is_ko();
                debug!(
                    caster = %caster.id,
                    ability = %ability.id,
                    target = %target_id,
                    nominal,
                    damage = applied.actual_damage,
                    "Hit"
                );
                let mut hit_unit = applied.unit;
                effects.push(TargetEffect::Hit {
                    target_id: target_id.clone(),
                    damage: applied.actual_damage,
                    auto_revived: applied.auto_revived,
                    knocked_out,
                });

                if let Some(infliction) = &ability.status_effect {
                    if !hit_unit.is_ko() && roll_infliction(infliction, rng) {
                        let status = inflicted_status(infliction);
                        hit_unit = apply_or_block(&hit_unit, status, &mut effects);
                    }
                }
                roster.put(hit_unit);
            }

            if landed == 0 && !target_ids.is_empty() {
                message.push_str(" Miss!");
            } else {
                if critical {
                    message.push_str(" Critical hit!");
                }
                let _ = write!(message, " Deals {total_damage} damage!");
                if landed < target_ids.len() {
                    message.push_str(" (Some attacks missed)");
                }
            }

            roster.update(&caster.id, |u| {
                u.battle_stats.damage_dealt += total_damage;
                if critical && landed > 0 {
                    u.battle_stats.critical_hits += 1;
                }
            });
        }

        AbilityType::Healing => {
            for target_id in &target_ids {
                let Some(current) = roster.get(target_id) else {
                    continue;
                };

                let mut healed = if current.is_ko() {
                    if !ability.revives_fallen {
                        effects.push(TargetEffect::Unaffected {
                            target_id: target_id.clone(),
                        });
                        continue;
                    }
                    let revived = revive_unit(&current);
                    total_healing += revived.current_hp;
                    let _ = write!(message, " {} is revived!", current.name);
                    effects.push(TargetEffect::Revived {
                        target_id: target_id.clone(),
                        hp: revived.current_hp,
                    });
                    revived
                } else {
                    let amount = calculate_healing(caster, team, ability, rng);
                    match apply_healing(&current, i64::from(amount)) {
                        Ok(healed) => {
                            let restored = healed.current_hp - current.current_hp;
                            total_healing += restored;
                            effects.push(TargetEffect::Healed {
                                target_id: target_id.clone(),
                                amount: restored,
                            });
                            healed
                        }
                        Err(err) => {
                            warn!(target = %target_id, %err, "Healing rejected");
                            effects.push(TargetEffect::Unaffected {
                                target_id: target_id.clone(),
                            });
                            continue;
                        }
                    }
                };

                if let Some(kind) = ability.cleanse {
                    let removed: Vec<StatusKind> = healed
                        .status_effects
                        .iter()
                        .filter(|s| cleanse_matches(kind, s))
                        .map(StatusEffect::kind)
                        .collect();
                    if !removed.is_empty() {
                        healed = remove_statuses(&healed, |s| cleanse_matches(kind, s));
                        effects.push(TargetEffect::Cleansed {
                            target_id: target_id.clone(),
                            removed,
                        });
                    }
                }
                roster.put(healed);
            }

            if total_healing > 0 {
                let _ = write!(message, " Restores {total_healing} HP!");
            }
            roster.update(&caster.id, |u| u.battle_stats.healing_done += total_healing);
        }

        AbilityType::Buff | AbilityType::Debuff => {
            let duration = ability.duration.unwrap_or(DEFAULT_BUFF_DURATION);
            let deltas = ability.buff_effect.map(|b| b.entries()).unwrap_or_default();

            for target_id in &target_ids {
                let Some(mut current) = roster.get(target_id) else {
                    continue;
                };
                for &(stat, modifier) in &deltas {
                    let status = if ability.ability_type == AbilityType::Buff {
                        StatusEffect::Buff {
                            stat,
                            modifier,
                            duration,
                        }
                    } else {
                        StatusEffect::Debuff {
                            stat,
                            modifier,
                            duration,
                        }
                    };
                    current = apply_or_block(&current, status, &mut effects);
                }
                roster.put(current);
            }

            let label = if ability.ability_type == AbilityType::Buff {
                "buff"
            } else {
                "debuff"
            };
            let _ = write!(message, " Applied {label}!");
        }

        AbilityType::Summon => {
            warn!(
                caster = %caster.id,
                ability = %ability.id,
                "Summon abilities resolve through Djinn; passing through"
            );
            message.push_str(" (Effect not implemented)");
            effects.push(TargetEffect::NotImplemented {
                ability_type: ability.ability_type,
            });
        }
    }

    ActionResult {
        caster_id: caster.id.clone(),
        ability_id: ability.id.clone(),
        target_ids,
        effects,
        total_damage,
        total_healing,
        critical,
        message,
        updated_units: roster.units,
    }
}

fn roll_infliction(infliction: &StatusInfliction, rng: &mut dyn Prng) -> bool {
    if infliction.chance >= 1.0 {
        return true;
    }
    rng.next_f64() < infliction.chance
}

fn inflicted_status(infliction: &StatusInfliction) -> StatusEffect {
    let duration = infliction.duration;
    match infliction.kind {
        InflictedStatus::Poison => StatusEffect::Poison { duration },
        InflictedStatus::Burn => StatusEffect::Burn { duration },
        InflictedStatus::Freeze => StatusEffect::Freeze { duration },
        InflictedStatus::Paralyze => StatusEffect::Paralyze { duration },
        InflictedStatus::Stun => StatusEffect::Stun { duration },
    }
}

fn apply_or_block(unit: &Unit, status: StatusEffect, effects: &mut Vec<TargetEffect>) -> Unit {
    if is_immune(unit, status.kind()) {
        effects.push(TargetEffect::StatusBlocked {
            target_id: unit.id.clone(),
            kind: status.kind(),
        });
        return unit.clone();
    }
    effects.push(TargetEffect::StatusApplied {
        target_id: unit.id.clone(),
        status: status.clone(),
    });
    apply_status_to_unit(unit, status)
}

fn cleanse_matches(kind: CleanseKind, status: &StatusEffect) -> bool {
    match kind {
        CleanseKind::Negative => status.is_negative(),
        CleanseKind::All => true,
    }
}
