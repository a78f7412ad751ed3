//! Turn order, battle end detection and fleeing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rng::Prng;
use crate::stats::effective_stats;
use crate::team::Team;
use crate::unit::Unit;

/// Flee chance at equal average speed.
pub const BASE_FLEE_CHANCE: f64 = 0.5;
/// Flee chance floor.
pub const MIN_FLEE_CHANCE: f64 = 0.10;
/// Flee chance ceiling.
pub const MAX_FLEE_CHANCE: f64 = 0.90;

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// Every enemy is knocked out.
    PlayerVictory,
    /// Every player unit is knocked out.
    PlayerDefeat,
}

/// Order living units for a round.
///
/// Units wearing first-turn boots lead, in list order. The rest sort by
/// effective SPD, descending. Exact ties are decided by a fresh draw per
/// compared pair (`draw - 0.5`), so repeated sorts of the same tie set
/// may disagree.
///
/// Sorted with an insertion sort; the tie comparator is not a total order.
pub fn calculate_turn_order(units: &[Unit], team: &Team, rng: &mut dyn Prng) -> Vec<String> {
    let mut first: Vec<&Unit> = Vec::new();
    let mut rest: Vec<(&Unit, i32)> = Vec::new();
    for unit in units.iter().filter(|u| !u.is_ko()) {
        if unit.equipment.always_first_turn() {
            first.push(unit);
        } else {
            rest.push((unit, effective_stats(unit, team).spd));
        }
    }

    for i in 1..rest.len() {
        let mut j = i;
        while j > 0 && compare(rest[j - 1].1, rest[j].1, rng) > 0.0 {
            rest.swap(j - 1, j);
            j -= 1;
        }
    }

    let order: Vec<String> = first
        .into_iter()
        .map(|u| u.id.clone())
        .chain(rest.into_iter().map(|(u, _)| u.id.clone()))
        .collect();
    debug!(order = ?order, "Turn order");
    order
}

/// Positive means `b` goes before `a`.
fn compare(a_spd: i32, b_spd: i32, rng: &mut dyn Prng) -> f64 {
    if a_spd == b_spd {
        rng.next_f64() - 0.5
    } else {
        f64::from(b_spd - a_spd)
    }
}

/// Victory if every enemy is down, else defeat if every player unit is
/// down. A simultaneous wipe is a victory.
#[must_use]
pub fn check_battle_end(player_units: &[Unit], enemy_units: &[Unit]) -> Option<BattleOutcome> {
    if enemy_units.iter().all(Unit::is_ko) {
        Some(BattleOutcome::PlayerVictory)
    } else if player_units.iter().all(Unit::is_ko) {
        Some(BattleOutcome::PlayerDefeat)
    } else {
        None
    }
}

/// Result of a flee attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleeResult {
    /// Whether the party escaped.
    pub success: bool,
    /// Narration.
    pub message: String,
}

impl FleeResult {
    fn new(success: bool, message: &str) -> Self {
        Self {
            success,
            message: message.to_string(),
        }
    }
}

fn average_spd<'a>(units: impl Iterator<Item = &'a Unit>, team: &Team) -> Option<f64> {
    let speeds: Vec<f64> = units
        .filter(|u| !u.is_ko())
        .map(|u| f64::from(effective_stats(u, team).spd))
        .collect();
    if speeds.is_empty() {
        None
    } else {
        Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
    }
}

/// Try to run away. Boss battles always fail without drawing.
pub fn attempt_flee(
    team: &Team,
    enemy_units: &[Unit],
    is_boss_battle: bool,
    rng: &mut dyn Prng,
) -> FleeResult {
    if is_boss_battle {
        return FleeResult::new(false, "Cannot flee from boss battle!");
    }
    let Some(player_spd) = average_spd(team.units.iter(), team) else {
        return FleeResult::new(false, "No units alive to flee!");
    };
    let chance = match average_spd(enemy_units.iter(), team) {
        Some(enemy_spd) => BASE_FLEE_CHANCE * player_spd / enemy_spd,
        None => MAX_FLEE_CHANCE,
    }
    .clamp(MIN_FLEE_CHANCE, MAX_FLEE_CHANCE);

    if rng.next_f64() < chance {
        FleeResult::new(true, "Successfully fled!")
    } else {
        FleeResult::new(false, "Failed to flee!")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Equipment, EquipmentSlot};
    use crate::stats::Stats;
    use crate::test_support::{unit_with_stats, FixedRng};

    fn with_spd(id: &str, spd: i32) -> Unit {
        unit_with_stats(id, Stats::new(50, 0, 10, 10, 10, spd))
    }

    #[test]
    fn test_orders_by_speed() {
        let units = vec![with_spd("a", 5), with_spd("b", 20), with_spd("c", 12)];
        let mut rng = FixedRng::always(0.5);
        let order = calculate_turn_order(&units, &Team::default(), &mut rng);
        assert_eq!(order, vec!["b", "c", "a"]);
        // No ties, no draws
        assert_eq!(rng.1, 0);
    }

    #[test]
    fn test_ko_filtered_and_boots_first() {
        let boots = Equipment {
            id: "hermes-sandals".into(),
            name: "Hermes' Sandals".into(),
            slot: EquipmentSlot::Boots,
            stat_bonus: Stats::default(),
            evasion: 0,
            elemental_resist: 0.0,
            always_first_turn: true,
        };
        let units = vec![
            with_spd("fast", 30),
            with_spd("slow", 1).with_equipment(boots),
            with_spd("down", 99).with_hp(0),
        ];
        let order = calculate_turn_order(&units, &Team::default(), &mut FixedRng::always(0.5));
        assert_eq!(order, vec!["slow", "fast"]);
    }

    #[test]
    fn test_ties_use_draws() {
        let units = vec![with_spd("a", 10), with_spd("b", 10)];
        let swapped = calculate_turn_order(&units, &Team::default(), &mut FixedRng::always(0.9));
        assert_eq!(swapped, vec!["b", "a"]);
        let kept = calculate_turn_order(&units, &Team::default(), &mut FixedRng::always(0.1));
        assert_eq!(kept, vec!["a", "b"]);
    }

    #[test]
    fn test_battle_end_precedence() {
        let alive = vec![with_spd("a", 1)];
        let down = vec![with_spd("b", 1).with_hp(0)];
        assert_eq!(check_battle_end(&alive, &alive), None);
        assert_eq!(check_battle_end(&alive, &down), Some(BattleOutcome::PlayerVictory));
        assert_eq!(check_battle_end(&down, &alive), Some(BattleOutcome::PlayerDefeat));
        assert_eq!(check_battle_end(&down, &down), Some(BattleOutcome::PlayerVictory));
    }

    #[test]
    fn test_flee() {
        let team = Team {
            units: vec![with_spd("p", 20)],
            ..Team::default()
        };
        let enemies = vec![with_spd("e", 10)];
        let mut rng = FixedRng::always(0.0);
        let boss = attempt_flee(&team, &enemies, true, &mut rng);
        assert!(!boss.success);
        assert_eq!(boss.message, "Cannot flee from boss battle!");
        assert_eq!(rng.1, 0);

        // 0.5 * 20 / 10 = 1.0, clamped to 0.9
        assert!(attempt_flee(&team, &enemies, false, &mut FixedRng::always(0.89)).success);
        assert!(!attempt_flee(&team, &enemies, false, &mut FixedRng::always(0.9)).success);

        let wiped = Team {
            units: vec![with_spd("p", 20).with_hp(0)],
            ..Team::default()
        };
        assert_eq!(
            attempt_flee(&wiped, &enemies, false, &mut FixedRng::always(0.0)).message,
            "No units alive to flee!"
        );
    }
}
