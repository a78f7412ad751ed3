//! Seeded auto-battles for balance checks and replay generation.

use battle_core::battle::{execute_round, queue_action, BattleState};
use battle_core::config::BattleConfig;
use battle_core::data::{Ability, AbilityType, ContentRegistry, TargetKind, BASIC_ATTACK_ID};
use battle_core::error::{BattleError, Result};
use battle_core::events::BattleEvent;
use battle_core::progression::get_xp_for_level;
use battle_core::replay::{BattleReplay, RoundPlan};
use battle_core::rng::SeededRng;
use battle_core::targeting::resolve_targets;
use battle_core::team::{Team, MAX_EQUIPPED_DJINN};
use battle_core::turn_order::BattleOutcome;
use battle_core::unit::Unit;
use tracing::debug;

/// Allies below this share of max HP get healed first.
const HEAL_THRESHOLD: f64 = 0.4;

/// Options for [`simulate_encounter`].
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Encounter to fight.
    pub encounter_id: String,
    /// Four playable unit ids.
    pub party: Vec<String>,
    /// Party level.
    pub level: u32,
    /// Generator seed.
    pub seed: u64,
    /// Stop after this many rounds.
    pub max_rounds: u32,
}

/// Result of an auto-battle.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Outcome, `None` if the round limit was hit.
    pub outcome: Option<BattleOutcome>,
    /// Rounds executed.
    pub rounds: u32,
    /// Every event, in order.
    pub events: Vec<BattleEvent>,
    /// State at the end.
    pub final_state: BattleState,
    /// Recording that reproduces the battle.
    pub replay: BattleReplay,
}

/// Build the party: units at `level`, every Djinn collected and the first
/// few equipped.
pub fn build_party(registry: &ContentRegistry, party: &[String], level: u32) -> Result<Team> {
    let xp = get_xp_for_level(level);
    let units = party
        .iter()
        .map(|id| registry.create_unit(id, level, xp))
        .collect::<Result<Vec<Unit>>>()?;
    let mut team = Team::new(units)?;
    for djinn in registry.all_djinn() {
        team = team.collect_djinn(djinn);
    }
    let to_equip: Vec<String> = team
        .collected_djinn
        .iter()
        .take(MAX_EQUIPPED_DJINN)
        .cloned()
        .collect();
    for djinn_id in &to_equip {
        team = team.equip_djinn(djinn_id)?;
    }
    Ok(team)
}

fn hp_ratio(unit: &Unit) -> f64 {
    f64::from(unit.current_hp) / f64::from(unit.max_hp())
}

/// Pick an ability and targets for one player unit.
fn choose(state: &BattleState, unit: &Unit) -> (Ability, Vec<String>) {
    let locked: Vec<String> = state
        .locked_abilities(&unit.id)
        .into_iter()
        .map(|l| l.ability_id)
        .collect();
    let usable = |a: &&Ability| !locked.contains(&a.id) && a.mana_cost <= state.remaining_mana();

    let wounded = state
        .player_team
        .units
        .iter()
        .filter(|u| !u.is_ko() && hp_ratio(u) < HEAL_THRESHOLD)
        .min_by_key(|u| u.current_hp);
    if let Some(wounded) = wounded {
        let heal = unit
            .unlocked_abilities()
            .filter(usable)
            .find(|a| a.ability_type == AbilityType::Healing && a.targets == TargetKind::SingleAlly);
        if let Some(heal) = heal {
            return (heal.clone(), vec![wounded.id.clone()]);
        }
    }

    let ability = unit
        .unlocked_abilities()
        .filter(usable)
        .filter(|a| a.is_damaging())
        .max_by_key(|a| a.base_power)
        .cloned()
        .unwrap_or_else(Ability::basic_attack);
    let targets = resolve_targets(&ability, unit, &state.player_team.units, &state.enemies)
        .into_iter()
        .map(|u| u.id.clone())
        .collect();
    (ability, targets)
}

/// Queue an action for every living player unit, falling back to a basic
/// attack when the preferred choice is rejected.
#[must_use]
pub fn plan_round(state: &BattleState) -> BattleState {
    let mut next = state.clone();
    for unit in state.player_team.units.iter().filter(|u| !u.is_ko()) {
        let (ability, targets) = choose(&next, unit);
        match queue_action(&next, &unit.id, &ability.id, &targets) {
            Ok(queued) => next = queued,
            Err(e) => {
                debug!(unit = %unit.id, ability = %ability.id, error = %e, "Falling back to attack");
                let basic = Ability::basic_attack();
                let targets: Vec<String> =
                    resolve_targets(&basic, unit, &next.player_team.units, &next.enemies)
                        .into_iter()
                        .map(|u| u.id.clone())
                        .collect();
                if let Ok(queued) = queue_action(&next, &unit.id, BASIC_ATTACK_ID, &targets) {
                    next = queued;
                }
            }
        }
    }
    next
}

/// Fight an encounter with the auto planner and record a replay.
pub fn simulate_encounter(
    registry: &ContentRegistry,
    options: &SimulationOptions,
) -> Result<SimulationReport> {
    let encounter = registry.encounter(&options.encounter_id).ok_or_else(|| {
        BattleError::InvalidState(format!(
            "Unknown encounter '{}'",
            options.encounter_id
        ))
    })?;
    let team = build_party(registry, &options.party, options.level)?;
    let enemies = registry.encounter_enemies(&encounter.id)?;
    let mut state = BattleState::new(team, enemies, BattleConfig::for_encounter(encounter));

    let mut replay = BattleReplay::new(options.seed, &state)?;
    let mut rng = SeededRng::new(options.seed);
    let mut events = Vec::new();
    let mut rounds = 0;

    while !state.is_over() && rounds < options.max_rounds {
        let queued = plan_round(&state);
        replay.record_round(RoundPlan::from_state(&queued));
        let result = execute_round(&queued, &mut rng)?;
        events.extend(result.events);
        state = result.state;
        rounds += 1;
    }
    replay.finalize(&state);

    tracing::info!(
        encounter = %options.encounter_id,
        seed = options.seed,
        rounds,
        outcome = ?state.outcome(),
        "Simulation finished"
    );

    Ok(SimulationReport {
        outcome: state.outcome(),
        rounds,
        events,
        final_state: state,
        replay,
    })
}

/// One line of narration for an event.
#[must_use]
pub fn describe(event: &BattleEvent) -> String {
    match event {
        BattleEvent::TurnStart { round, unit_id } => format!("[round {round}] {unit_id}'s turn"),
        BattleEvent::Ability { message, .. } => format!("  {message}"),
        BattleEvent::Hit {
            target_id,
            amount,
            critical,
            auto_revived,
            ..
        } => {
            let crit = if *critical { " (critical)" } else { "" };
            let revive = if *auto_revived { ", auto-revived" } else { "" };
            format!("  {target_id} takes {amount} damage{crit}{revive}")
        }
        BattleEvent::Miss {
            unit_id,
            target_id,
            reason,
        } => match target_id {
            Some(target) => format!("  {target} evades {unit_id}"),
            None => format!("  {unit_id} cannot act ({reason:?})"),
        },
        BattleEvent::Heal {
            target_id,
            amount,
            revived,
        } => {
            if *revived {
                format!("  {target_id} is revived with {amount} HP")
            } else {
                format!("  {target_id} recovers {amount} HP")
            }
        }
        BattleEvent::StatusApplied { target_id, status } => {
            format!("  {target_id} gains {:?}", status.kind())
        }
        BattleEvent::StatusExpired { target_id, kind } => format!("  {target_id}'s {kind:?} wears off"),
        BattleEvent::Ko { unit_id } => format!("  {unit_id} is knocked out"),
        BattleEvent::Xp {
            unit_id,
            amount,
            new_level,
            ..
        } => format!("{unit_id} gains {amount} XP (level {new_level})"),
        BattleEvent::BattleEnd { outcome } => format!("Battle over: {outcome:?}"),
        BattleEvent::EncounterFinished {
            encounter_id,
            outcome,
        } => format!("Encounter {encounter_id} finished: {outcome:?}"),
    }
}
