//! Enemy decision making.

use crate::data::{Ability, AbilityType, AiTargetHint};
use crate::rng::{pick_index, Prng};
use crate::stats::effective_stats;
use crate::targeting::{filter_valid_targets, resolve_targets};
use crate::team::Team;
use crate::unit::Unit;

/// A chosen enemy action.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyAction {
    /// Ability to use.
    pub ability: Ability,
    /// Target ids.
    pub target_ids: Vec<String>,
}

fn is_usable(ability: &Ability, allies: &[Unit]) -> bool {
    match ability.ability_type {
        AbilityType::Summon => false,
        AbilityType::Healing => allies
            .iter()
            .any(|u| !u.is_ko() && u.current_hp * 2 < u.max_hp()),
        _ => true,
    }
}

/// Pick an action for `enemy`.
///
/// The highest AI priority wins, damaging abilities break ties, then
/// definition order. With nothing usable the enemy falls back to a basic
/// attack. Draws only for the `Random` target hint.
pub fn choose_enemy_action(
    enemy: &Unit,
    team: &Team,
    enemies: &[Unit],
    rng: &mut dyn Prng,
) -> Option<EnemyAction> {
    let mut best: Option<&Ability> = None;
    for ability in enemy.unlocked_abilities() {
        if !is_usable(ability, enemies) {
            continue;
        }
        let key = (ability.ai_priority(), ability.is_damaging());
        if best.map_or(true, |b| key > (b.ai_priority(), b.is_damaging())) {
            best = Some(ability);
        }
    }
    let ability = best.cloned().unwrap_or_else(Ability::basic_attack);

    let resolved = resolve_targets(&ability, enemy, &team.units, enemies);
    let mut targets = filter_valid_targets(&ability, resolved);

    if ability.targets.is_hostile() && targets.len() == 1 {
        let living: Vec<&Unit> = team.units.iter().filter(|u| !u.is_ko()).collect();
        let hint = ability.ai_hints.and_then(|h| h.target);
        let preferred = match hint {
            Some(AiTargetHint::Weakest) => living.iter().min_by_key(|u| u.current_hp).copied(),
            Some(AiTargetHint::HighestDef) => living
                .iter()
                .max_by_key(|u| effective_stats(u, team).def)
                .copied(),
            Some(AiTargetHint::Random) => pick_index(rng, living.len()).map(|i| living[i]),
            _ => None,
        };
        if let Some(unit) = preferred {
            targets = vec![unit];
        }
    }

    if targets.is_empty() {
        return None;
    }
    Some(EnemyAction {
        target_ids: targets.iter().map(|u| u.id.clone()).collect(),
        ability,
    })
}
