//! Round-based battle orchestration.
//!
//! A battle alternates between a planning phase, where each living player
//! unit queues one action against the shared mana pool, and an execution
//! phase that resolves every action in turn order.
//!
//! ```text
//! Planning --execute_round--> Executing --+--> Planning (next round)
//!                                         +--> Victory
//!                                         +--> Defeat
//! ```
//!
//! Every operation takes the current state by reference and returns a new
//! one. A failed call leaves the caller's state exactly as it was.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::execute_ability;
use crate::ai::choose_enemy_action;
use crate::config::BattleConfig;
use crate::data::{Ability, BASIC_ATTACK_ID};
use crate::djinn::{advance_djinn_recovery, execute_summon};
use crate::error::{BattleError, Result};
use crate::events::{BattleEvent, MissReason};
use crate::rng::Prng;
use crate::status::{check_paralysis, tick_statuses, StatusKind};
use crate::targeting::{filter_valid_targets, resolve_targets};
use crate::team::{DjinnTracker, LockedAbility, Team, MAX_EQUIPPED_DJINN};
use crate::turn_order::{
    attempt_flee, calculate_turn_order, check_battle_end, BattleOutcome, FleeResult,
};
use crate::unit::Unit;

/// Battle state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattlePhase {
    /// Collecting actions.
    Planning,
    /// Resolving a round.
    Executing,
    /// Every enemy is down.
    Victory,
    /// Every player unit is down.
    Defeat,
}

impl BattlePhase {
    fn name(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Victory => "victory",
            Self::Defeat => "defeat",
        }
    }
}

/// A pending player action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueuedAction {
    /// Acting unit.
    pub unit_id: String,
    /// Ability id, [`BASIC_ATTACK_ID`] for a plain attack.
    pub ability_id: String,
    /// Chosen targets.
    pub target_ids: Vec<String>,
    /// Mana reserved at queue time.
    pub mana_cost: u32,
}

/// Live battle session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    /// Player party, owner of the mana pool and Djinn trackers.
    pub player_team: Team,
    /// Enemy roster.
    pub enemies: Vec<Unit>,
    /// Acting order of the current or last round.
    pub turn_order: Vec<String>,
    /// Index into `turn_order` of the last actor.
    pub current_actor_index: usize,
    /// Round counter, starting at 1.
    pub current_turn: u32,
    /// State machine phase.
    pub phase: BattlePhase,
    /// One slot per player unit, in roster order.
    pub queued_actions: Vec<Option<QueuedAction>>,
    /// Djinn to summon at the start of the next execution.
    pub queued_djinn: Vec<String>,
    /// Per-battle settings.
    pub config: BattleConfig,
}

impl BattleState {
    /// Start a battle in the planning phase of round 1.
    #[must_use]
    pub fn new(player_team: Team, enemies: Vec<Unit>, config: BattleConfig) -> Self {
        let slots = player_team.units.len();
        let player_team = player_team.with_refreshed_mana();
        Self {
            player_team,
            enemies,
            turn_order: Vec::new(),
            current_actor_index: 0,
            current_turn: 1,
            phase: BattlePhase::Planning,
            queued_actions: vec![None; slots],
            queued_djinn: Vec::new(),
            config,
        }
    }

    /// Shared mana left this round.
    #[must_use]
    pub const fn remaining_mana(&self) -> u32 {
        self.player_team.remaining_mana
    }

    /// Shared mana available per round.
    #[must_use]
    pub const fn max_mana(&self) -> u32 {
        self.player_team.max_mana
    }

    /// Recovery countdowns keyed by Djinn id.
    #[must_use]
    pub fn djinn_recovery_timers(&self) -> std::collections::BTreeMap<String, u32> {
        self.player_team.djinn_recovery_timers()
    }

    /// Whether the battle reached victory or defeat.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        matches!(self.phase, BattlePhase::Victory | BattlePhase::Defeat)
    }

    /// Final outcome, once over.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        match self.phase {
            BattlePhase::Victory => Some(BattleOutcome::PlayerVictory),
            BattlePhase::Defeat => Some(BattleOutcome::PlayerDefeat),
            _ => None,
        }
    }

    /// Look up any combatant.
    #[must_use]
    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.player_team
            .unit(unit_id)
            .or_else(|| self.enemies.iter().find(|u| u.id == unit_id))
    }

    /// Every combatant, players first.
    #[must_use]
    pub fn all_units(&self) -> Vec<Unit> {
        self.player_team
            .units
            .iter()
            .chain(self.enemies.iter())
            .cloned()
            .collect()
    }

    /// Unlocked abilities a player unit cannot use right now.
    #[must_use]
    pub fn locked_abilities(&self, unit_id: &str) -> Vec<LockedAbility> {
        self.player_team
            .unit(unit_id)
            .map(|u| self.player_team.locked_abilities(u))
            .unwrap_or_default()
    }

    /// Whether every living player unit has a queued action.
    #[must_use]
    pub fn is_queue_complete(&self) -> bool {
        self.first_unqueued().is_none()
    }

    fn first_unqueued(&self) -> Option<&Unit> {
        self.player_team
            .units
            .iter()
            .zip(&self.queued_actions)
            .find(|(u, slot)| !u.is_ko() && slot.is_none())
            .map(|(u, _)| u)
    }

    fn require_planning(&self) -> Result<()> {
        if self.phase != BattlePhase::Planning {
            return Err(BattleError::WrongPhase {
                expected: BattlePhase::Planning.name().to_string(),
                actual: self.phase.name().to_string(),
            });
        }
        Ok(())
    }

    fn replace_unit(&mut self, unit: Unit) {
        if self.player_team.contains(&unit.id) {
            self.player_team = self.player_team.with_unit(unit);
        } else if let Some(slot) = self.enemies.iter_mut().find(|u| u.id == unit.id) {
            *slot = unit;
        }
    }

    fn check_end(&self) -> Option<BattleOutcome> {
        check_battle_end(&self.player_team.units, &self.enemies)
    }
}

/// The ability `unit` would use for `ability_id`.
fn ability_for(unit: &Unit, ability_id: &str) -> Option<Ability> {
    if let Some(ability) = unit.unlocked_ability(ability_id) {
        return Some(ability.clone());
    }
    (ability_id == BASIC_ATTACK_ID).then(Ability::basic_attack)
}

/// Queue an action for a player unit, reserving its mana.
///
/// Re-queuing a slot refunds the previous action first.
pub fn queue_action(
    state: &BattleState,
    unit_id: &str,
    ability_id: &str,
    target_ids: &[String],
) -> Result<BattleState> {
    state.require_planning()?;
    let slot = state
        .player_team
        .slot_of(unit_id)
        .ok_or_else(|| BattleError::UnknownUnit(unit_id.to_string()))?;
    let unit = &state.player_team.units[slot];
    if unit.is_ko() {
        return Err(BattleError::UnitKnockedOut(unit_id.to_string()));
    }

    let ability = ability_for(unit, ability_id).ok_or_else(|| BattleError::AbilityUnavailable {
        unit_id: unit_id.to_string(),
        ability_id: ability_id.to_string(),
    })?;
    if let Some(reason) = state.player_team.lock_reason(ability_id) {
        return Err(BattleError::AbilityLocked {
            ability_id: ability_id.to_string(),
            reason,
        });
    }

    if target_ids.is_empty() {
        return Err(BattleError::NoTargets);
    }
    if let Some(missing) = target_ids.iter().find(|id| state.unit(id).is_none()) {
        return Err(BattleError::UnknownTarget(missing.clone()));
    }

    let refund = state.queued_actions[slot]
        .as_ref()
        .map_or(0, |q| q.mana_cost);
    let available = state.remaining_mana() + refund;
    if ability.mana_cost > available {
        return Err(BattleError::InsufficientMana {
            required: ability.mana_cost,
            available,
        });
    }

    let mut next = state.clone();
    next.player_team.remaining_mana = available - ability.mana_cost;
    next.queued_actions[slot] = Some(QueuedAction {
        unit_id: unit_id.to_string(),
        ability_id: ability_id.to_string(),
        target_ids: target_ids.to_vec(),
        mana_cost: ability.mana_cost,
    });
    debug!(
        unit = %unit_id,
        ability = %ability_id,
        cost = ability.mana_cost,
        remaining = next.remaining_mana(),
        "Queued action"
    );
    Ok(next)
}

/// Clear a unit's queued action and refund its mana.
pub fn clear_queued_action(state: &BattleState, unit_id: &str) -> Result<BattleState> {
    state.require_planning()?;
    let slot = state
        .player_team
        .slot_of(unit_id)
        .ok_or_else(|| BattleError::UnknownUnit(unit_id.to_string()))?;
    let mut next = state.clone();
    if let Some(action) = next.queued_actions[slot].take() {
        next.player_team.remaining_mana += action.mana_cost;
    }
    Ok(next)
}

/// Queue a Set Djinn for summoning.
pub fn queue_djinn(state: &BattleState, djinn_id: &str) -> Result<BattleState> {
    state.require_planning()?;
    let unavailable = |reason: &str| BattleError::DjinnUnavailable {
        djinn_id: djinn_id.to_string(),
        reason: reason.to_string(),
    };
    let team = &state.player_team;
    if !team.equipped_djinn.iter().any(|d| d == djinn_id) {
        return Err(unavailable("not equipped"));
    }
    if team
        .djinn_trackers
        .get(djinn_id)
        .and_then(DjinnTracker::lock_reason)
        .is_some()
    {
        return Err(unavailable("not set"));
    }
    if state.queued_djinn.iter().any(|d| d == djinn_id) {
        return Err(unavailable("already queued"));
    }
    if state.queued_djinn.len() >= MAX_EQUIPPED_DJINN {
        return Err(unavailable("summon is full"));
    }
    let mut next = state.clone();
    next.queued_djinn.push(djinn_id.to_string());
    Ok(next)
}

/// Remove a Djinn from the summon queue.
pub fn unqueue_djinn(state: &BattleState, djinn_id: &str) -> Result<BattleState> {
    state.require_planning()?;
    let mut next = state.clone();
    next.queued_djinn.retain(|d| d != djinn_id);
    Ok(next)
}

/// Try to flee. Only allowed while planning.
pub fn flee(state: &BattleState, rng: &mut dyn Prng) -> Result<FleeResult> {
    state.require_planning()?;
    Ok(attempt_flee(
        &state.player_team,
        &state.enemies,
        state.config.is_boss,
        rng,
    ))
}

/// Outcome of one executed round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    /// State after the round.
    pub state: BattleState,
    /// Events in the order they happened.
    pub events: Vec<BattleEvent>,
}

/// Resolve every queued action and enemy turn for one round.
///
/// Requires the planning phase, an action for every living player unit,
/// and queued costs within the team's maximum mana.
pub fn execute_round(state: &BattleState, rng: &mut dyn Prng) -> Result<RoundResult> {
    state.require_planning()?;
    if let Some(unit) = state.first_unqueued() {
        return Err(BattleError::QueueIncomplete(unit.id.clone()));
    }
    let total: u32 = state
        .queued_actions
        .iter()
        .flatten()
        .map(|q| q.mana_cost)
        .sum();
    if total > state.max_mana() {
        return Err(BattleError::ManaBudgetExceeded {
            total,
            budget: state.max_mana(),
        });
    }

    let mut next = state.clone();
    let mut events = Vec::new();
    next.phase = BattlePhase::Executing;
    let round = next.current_turn;
    debug!(round, queued = total, "Executing round");

    let all = next.all_units();
    next.turn_order = calculate_turn_order(&all, &next.player_team, rng);

    if !next.queued_djinn.is_empty() {
        run_summon(&mut next, &mut events, rng)?;
    }

    let order = next.turn_order.clone();
    for (index, actor_id) in order.iter().enumerate() {
        if next.check_end().is_some() {
            break;
        }
        next.current_actor_index = index;
        run_turn(&mut next, &mut events, actor_id, round, rng);
    }

    match next.check_end() {
        Some(outcome) => {
            next.phase = match outcome {
                BattleOutcome::PlayerVictory => BattlePhase::Victory,
                BattleOutcome::PlayerDefeat => BattlePhase::Defeat,
            };
            next.queued_actions = vec![None; next.player_team.units.len()];
            next.queued_djinn.clear();
            events.push(BattleEvent::BattleEnd { outcome });
            if let Some(encounter_id) = &next.config.encounter_id {
                events.push(BattleEvent::EncounterFinished {
                    encounter_id: encounter_id.clone(),
                    outcome,
                });
            }
            debug!(round, ?outcome, "Battle ended");
        }
        None => {
            next.player_team = advance_djinn_recovery(&next.player_team).with_refreshed_mana();
            next.current_turn += 1;
            next.current_actor_index = 0;
            next.queued_actions = vec![None; next.player_team.units.len()];
            next.queued_djinn.clear();
            next.phase = BattlePhase::Planning;
        }
    }

    Ok(RoundResult {
        state: next,
        events,
    })
}

fn run_summon(
    state: &mut BattleState,
    events: &mut Vec<BattleEvent>,
    rng: &mut dyn Prng,
) -> Result<()> {
    let ids = state.queued_djinn.clone();
    let summon = execute_summon(&state.player_team, &state.enemies, &ids, rng)?;
    events.push(BattleEvent::Ability {
        caster_id: ids.join("+"),
        ability_id: "djinn-summon".to_string(),
        target_ids: summon.hits.iter().map(|(id, _)| id.clone()).collect(),
        message: format!("{} summoned!", ids.join(", ")),
    });
    for (target_id, applied) in &summon.hits {
        events.push(BattleEvent::Hit {
            source_id: None,
            target_id: target_id.clone(),
            amount: applied.actual_damage,
            critical: false,
            auto_revived: applied.auto_revived,
        });
        if applied.unit.is_ko() {
            events.push(BattleEvent::Ko {
                unit_id: target_id.clone(),
            });
        }
    }
    state.player_team = summon.team;
    state.enemies = summon.enemies;
    Ok(())
}

fn run_turn(
    state: &mut BattleState,
    events: &mut Vec<BattleEvent>,
    actor_id: &str,
    round: u32,
    rng: &mut dyn Prng,
) {
    let Some(actor) = state.unit(actor_id).cloned() else {
        return;
    };
    if actor.is_ko() {
        return;
    }
    events.push(BattleEvent::TurnStart {
        round,
        unit_id: actor_id.to_string(),
    });

    // Start-of-turn status tick
    let tick = tick_statuses(&actor, rng);
    if tick.damage > 0 {
        events.push(BattleEvent::Hit {
            source_id: None,
            target_id: actor_id.to_string(),
            amount: tick.damage,
            critical: false,
            auto_revived: false,
        });
    }
    if tick.healed > 0 {
        events.push(BattleEvent::Heal {
            target_id: actor_id.to_string(),
            amount: tick.healed,
            revived: false,
        });
    }
    events.extend(tick.expired.iter().map(|kind| BattleEvent::StatusExpired {
        target_id: actor_id.to_string(),
        kind: *kind,
    }));
    let actor = tick.unit;
    state.replace_unit(actor.clone());
    if actor.is_ko() {
        events.push(BattleEvent::Ko {
            unit_id: actor_id.to_string(),
        });
        return;
    }
    if let Some(kind) = tick.skipped_by {
        let reason = if kind == StatusKind::Freeze {
            MissReason::Frozen
        } else {
            MissReason::Stunned
        };
        events.push(BattleEvent::Miss {
            unit_id: actor_id.to_string(),
            target_id: None,
            reason,
        });
        return;
    }

    if check_paralysis(&actor, rng) {
        events.push(BattleEvent::Miss {
            unit_id: actor_id.to_string(),
            target_id: None,
            reason: MissReason::Paralyzed,
        });
        return;
    }

    let Some((ability, target_ids)) = planned_action(state, &actor, rng) else {
        debug!(unit = %actor_id, "No action this turn");
        return;
    };

    let all = state.all_units();
    let chosen: Vec<&Unit> = target_ids
        .iter()
        .filter_map(|id| all.iter().find(|u| &u.id == id))
        .filter(|u| ability.revives_fallen || !u.is_ko())
        .collect();
    let targets = if chosen.is_empty() {
        // Every chosen target fell earlier this round
        let (players, enemies) = all.split_at(state.player_team.units.len());
        debug!(unit = %actor_id, ability = %ability.id, "Retargeting");
        resolve_targets(&ability, &actor, players, enemies)
    } else {
        chosen
    };
    let targets = filter_valid_targets(&ability, targets);
    if targets.is_empty() {
        debug!(unit = %actor_id, ability = %ability.id, "No valid targets");
        return;
    }

    let result = execute_ability(&actor, &ability, &targets, &all, &state.player_team, rng);
    events.extend(result.events());
    for unit in result.updated_units {
        state.replace_unit(unit);
    }
}

fn planned_action(
    state: &BattleState,
    actor: &Unit,
    rng: &mut dyn Prng,
) -> Option<(Ability, Vec<String>)> {
    if let Some(slot) = state.player_team.slot_of(&actor.id) {
        let queued = state.queued_actions.get(slot)?.as_ref()?;
        let ability = ability_for(actor, &queued.ability_id)?;
        return Some((ability, queued.target_ids.clone()));
    }
    choose_enemy_action(actor, &state.player_team, &state.enemies, rng)
        .map(|action| (action.ability, action.target_ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AbilityType, DjinnData, TargetKind};
    use crate::element::Element;
    use crate::stats::Stats;
    use crate::team::DjinnState;
    use crate::test_support::{ability, unit_with_stats, FixedRng};

    fn bolt() -> Ability {
        Ability {
            mana_cost: 2,
            ..ability("bolt", AbilityType::Psynergy, 20, TargetKind::SingleEnemy)
        }
    }

    fn hero(id: &str, spd: i32) -> Unit {
        let mut unit = unit_with_stats(id, Stats::new(200, 20, 20, 10, 15, spd));
        unit.abilities.push(bolt());
        unit.unlocked_ability_ids.insert("bolt".into());
        unit
    }

    fn foe(id: &str, hp: i32) -> Unit {
        unit_with_stats(id, Stats::new(hp, 0, 8, 5, 5, 1))
    }

    fn team() -> Team {
        Team::new(vec![hero("isaac", 13), hero("garet", 12), hero("ivan", 11), hero("mia", 10)])
            .unwrap()
    }

    fn state_with(enemies: Vec<Unit>) -> BattleState {
        BattleState::new(team(), enemies, BattleConfig::default())
    }

    fn targets(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    fn queue_all(state: &BattleState, ability_id: &str, target: &str) -> BattleState {
        let mut next = state.clone();
        for id in ["isaac", "garet", "ivan", "mia"] {
            next = queue_action(&next, id, ability_id, &targets(&[target])).unwrap();
        }
        next
    }

    #[test]
    fn test_new_battle_starts_planning() {
        let state = state_with(vec![foe("slime", 50)]);
        assert_eq!(state.phase, BattlePhase::Planning);
        assert_eq!(state.current_turn, 1);
        assert_eq!(state.max_mana(), 4);
        assert_eq!(state.remaining_mana(), 4);
        assert_eq!(state.queued_actions.len(), 4);
        assert!(!state.is_queue_complete());
    }

    #[test]
    fn test_queue_deducts_and_requeue_refunds() {
        let state = state_with(vec![foe("slime", 50)]);
        let t = targets(&["slime"]);

        let state = queue_action(&state, "isaac", "bolt", &t).unwrap();
        assert_eq!(state.remaining_mana(), 2);

        let state = queue_action(&state, "isaac", BASIC_ATTACK_ID, &t).unwrap();
        assert_eq!(state.remaining_mana(), 4);

        let state = queue_action(&state, "isaac", "bolt", &t).unwrap();
        let state = queue_action(&state, "garet", "bolt", &t).unwrap();
        assert_eq!(state.remaining_mana(), 0);

        let err = queue_action(&state, "ivan", "bolt", &t).unwrap_err();
        assert_eq!(
            err,
            BattleError::InsufficientMana {
                required: 2,
                available: 0
            }
        );
        assert_eq!(
            err.to_string(),
            "Cannot afford action: need 2 mana, have 0"
        );

        let state = clear_queued_action(&state, "garet").unwrap();
        assert_eq!(state.remaining_mana(), 2);
        assert!(state.queued_actions[1].is_none());
    }

    #[test]
    fn test_queue_validation_errors() {
        let mut state = state_with(vec![foe("slime", 50)]);
        let t = targets(&["slime"]);

        assert_eq!(
            queue_action(&state, "felix", "bolt", &t).unwrap_err(),
            BattleError::UnknownUnit("felix".into())
        );
        assert!(matches!(
            queue_action(&state, "isaac", "ragnarok", &t).unwrap_err(),
            BattleError::AbilityUnavailable { .. }
        ));
        assert_eq!(
            queue_action(&state, "isaac", "bolt", &[]).unwrap_err(),
            BattleError::NoTargets
        );
        assert_eq!(
            queue_action(&state, "isaac", "bolt", &targets(&["ghost"])).unwrap_err(),
            BattleError::UnknownTarget("ghost".into())
        );

        let downed = state.player_team.units[0].with_hp(0);
        state.player_team = state.player_team.with_unit(downed);
        assert_eq!(
            queue_action(&state, "isaac", "bolt", &t).unwrap_err(),
            BattleError::UnitKnockedOut("isaac".into())
        );
    }

    #[test]
    fn test_failed_queue_leaves_state_untouched() {
        let state = state_with(vec![foe("slime", 50)]);
        let before = state.clone();
        let _ = queue_action(&state, "isaac", "bolt", &[]);
        assert_eq!(state, before);
    }

    #[test]
    fn test_djinn_locked_ability_rejected() {
        let flint = DjinnData {
            id: "flint".into(),
            name: "Flint".into(),
            element: Element::Venus,
            granted_abilities: vec!["bolt".into()],
        };
        let mut team = team().collect_djinn(&flint).equip_djinn("flint").unwrap();
        if let Some(tracker) = team.djinn_trackers.get_mut("flint") {
            tracker.state = DjinnState::Recovery {
                rounds_remaining: 2,
            };
        }
        let state = BattleState::new(team, vec![foe("slime", 50)], BattleConfig::default());

        let err = queue_action(&state, "isaac", "bolt", &targets(&["slime"])).unwrap_err();
        assert_eq!(
            err,
            BattleError::AbilityLocked {
                ability_id: "bolt".into(),
                reason: "Djinn flint is recovering (2 rounds)".into(),
            }
        );
        assert_eq!(state.locked_abilities("isaac").len(), 1);
        assert_eq!(state.djinn_recovery_timers().get("flint"), Some(&2));
    }

    #[test]
    fn test_execute_requires_full_queue() {
        let state = state_with(vec![foe("slime", 50)]);
        let state = queue_action(&state, "isaac", "bolt", &targets(&["slime"])).unwrap();
        let err = execute_round(&state, &mut FixedRng::always(0.5)).unwrap_err();
        assert_eq!(err, BattleError::QueueIncomplete("garet".into()));
    }

    #[test]
    fn test_knocked_out_units_need_no_action() {
        let mut state = state_with(vec![foe("slime", 500)]);
        let downed = state.player_team.units[3].with_hp(0);
        state.player_team = state.player_team.with_unit(downed);
        let t = targets(&["slime"]);
        for id in ["isaac", "garet", "ivan"] {
            state = queue_action(&state, id, BASIC_ATTACK_ID, &t).unwrap();
        }
        assert!(state.is_queue_complete());
        assert!(execute_round(&state, &mut FixedRng::always(0.5)).is_ok());
    }

    #[test]
    fn test_round_victory_emits_end_events() {
        let state = BattleState::new(
            team(),
            vec![foe("slime", 5)],
            BattleConfig::default().with_encounter("c1_normal_1"),
        );
        let state = queue_all(&state, BASIC_ATTACK_ID, "slime");
        let round = execute_round(&state, &mut FixedRng::always(0.5)).unwrap();

        assert_eq!(round.state.phase, BattlePhase::Victory);
        assert_eq!(round.state.outcome(), Some(BattleOutcome::PlayerVictory));
        let n = round.events.len();
        assert_eq!(
            round.events[n - 2],
            BattleEvent::BattleEnd {
                outcome: BattleOutcome::PlayerVictory
            }
        );
        assert_eq!(
            round.events[n - 1],
            BattleEvent::EncounterFinished {
                encounter_id: "c1_normal_1".into(),
                outcome: BattleOutcome::PlayerVictory
            }
        );
        assert!(round
            .events
            .contains(&BattleEvent::Ko { unit_id: "slime".into() }));
        // The killing blow reports its full damage, not the 5 HP left
        assert!(round.events.iter().any(|e| matches!(
            e,
            BattleEvent::Hit { target_id, amount, .. } if target_id == "slime" && *amount > 5
        )));
        // Only the fastest hero acted before the battle ended
        let turns = round
            .events
            .iter()
            .filter(|e| matches!(e, BattleEvent::TurnStart { .. }))
            .count();
        assert_eq!(turns, 1);
    }

    #[test]
    fn test_round_returns_to_planning() {
        let state = state_with(vec![foe("golem", 900)]);
        let state = queue_all(&state, BASIC_ATTACK_ID, "golem");
        let state = queue_action(&state, "isaac", "bolt", &targets(&["golem"])).unwrap();
        assert_eq!(state.remaining_mana(), 2);

        let round = execute_round(&state, &mut FixedRng::always(0.5)).unwrap();
        let next = round.state;
        assert_eq!(next.phase, BattlePhase::Planning);
        assert_eq!(next.current_turn, 2);
        assert_eq!(next.remaining_mana(), 4);
        assert!(next.queued_actions.iter().all(Option::is_none));
        assert!(next.unit("golem").unwrap().current_hp < 900);
        assert_eq!(
            next.turn_order,
            targets(&["isaac", "garet", "ivan", "mia", "golem"])
        );
    }

    #[test]
    fn test_single_target_retargets_after_ko() {
        let state = state_with(vec![foe("rat", 1), foe("bat", 500)]);
        let state = queue_all(&state, BASIC_ATTACK_ID, "rat");
        let round = execute_round(&state, &mut FixedRng::always(0.5)).unwrap();

        assert!(round.state.unit("rat").unwrap().is_ko());
        assert!(round.state.unit("bat").unwrap().current_hp < 500);
        let bat_hits = round
            .events
            .iter()
            .filter(|e| {
                matches!(e, BattleEvent::Hit { source_id: Some(_), target_id, .. } if target_id == "bat")
            })
            .count();
        assert_eq!(bat_hits, 3);
    }

    #[test]
    fn test_djinn_summon_runs_before_actions() {
        let flint = DjinnData {
            id: "flint".into(),
            name: "Flint".into(),
            element: Element::Venus,
            granted_abilities: Vec::new(),
        };
        let team = team().collect_djinn(&flint).equip_djinn("flint").unwrap();
        let state = BattleState::new(team, vec![foe("golem", 900)], BattleConfig::default());
        let state = queue_djinn(&state, "flint").unwrap();
        assert!(matches!(
            queue_djinn(&state, "flint").unwrap_err(),
            BattleError::DjinnUnavailable { .. }
        ));
        let state = queue_all(&state, BASIC_ATTACK_ID, "golem");

        let round = execute_round(&state, &mut FixedRng::always(0.5)).unwrap();
        assert_eq!(
            round.events[1],
            BattleEvent::Hit {
                source_id: None,
                target_id: "golem".into(),
                amount: 30,
                critical: false,
                auto_revived: false,
            }
        );
        assert!(round.state.queued_djinn.is_empty());
        assert_eq!(round.state.djinn_recovery_timers().get("flint"), Some(&1));

        let err = queue_djinn(&round.state, "flint").unwrap_err();
        assert!(matches!(err, BattleError::DjinnUnavailable { .. }));
    }

    #[test]
    fn test_unqueue_djinn() {
        let flint = DjinnData {
            id: "flint".into(),
            name: "Flint".into(),
            element: Element::Venus,
            granted_abilities: Vec::new(),
        };
        let team = team().collect_djinn(&flint).equip_djinn("flint").unwrap();
        let state = BattleState::new(team, vec![foe("golem", 900)], BattleConfig::default());
        let state = queue_djinn(&state, "flint").unwrap();
        let state = unqueue_djinn(&state, "flint").unwrap();
        assert!(state.queued_djinn.is_empty());
    }

    #[test]
    fn test_operations_rejected_after_battle() {
        let mut state = state_with(vec![foe("slime", 50)]);
        state.phase = BattlePhase::Victory;
        assert!(matches!(
            queue_action(&state, "isaac", "bolt", &targets(&["slime"])).unwrap_err(),
            BattleError::WrongPhase { .. }
        ));
        assert!(execute_round(&state, &mut FixedRng::always(0.5)).is_err());
        assert!(flee(&state, &mut FixedRng::always(0.0)).is_err());
    }

    #[test]
    fn test_flee_from_boss_fails() {
        let state = BattleState::new(
            team(),
            vec![foe("slime", 50)],
            BattleConfig::default().with_boss(true),
        );
        let result = flee(&state, &mut FixedRng::always(0.0)).unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "Cannot flee from boss battle!");
    }
}
