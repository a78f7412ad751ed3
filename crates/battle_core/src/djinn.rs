//! Djinn stat grants, summons and the recovery countdown.

use tracing::debug;

use crate::combat::{apply_damage_with_shields, DamageApplication};
use crate::element::Element;
use crate::error::{BattleError, Result};
use crate::rng::{pick_index, Prng};
use crate::stats::Stats;
use crate::team::{DjinnState, Team};
use crate::unit::Unit;

/// ATK/DEF granted per Set Djinn sharing the unit's element.
pub const SAME_ELEMENT_BONUS: (i32, i32) = (4, 3);
/// ATK/DEF granted per Set Djinn of the unit's counter element.
pub const COUNTER_ELEMENT_BONUS: (i32, i32) = (-3, -2);
/// ATK/DEF granted per Set Djinn of any other element.
pub const NEUTRAL_ELEMENT_BONUS: (i32, i32) = (2, 2);

/// Summon damage by number of Djinn summoned together.
#[must_use]
pub const fn summon_damage(count: usize) -> u32 {
    match count {
        1 => 30,
        2 => 80,
        3 => 150,
        _ => 0,
    }
}

/// ATK/DEF a single Djinn grants a unit of `unit_element`.
#[must_use]
pub fn compatibility_bonus(unit_element: Element, djinn_element: Element) -> (i32, i32) {
    if unit_element == djinn_element {
        SAME_ELEMENT_BONUS
    } else if unit_element.counter() == Some(djinn_element) {
        COUNTER_ELEMENT_BONUS
    } else {
        NEUTRAL_ELEMENT_BONUS
    }
}

/// Summed grants from every equipped Set Djinn.
#[must_use]
pub fn djinn_stat_bonus(unit_element: Element, team: &Team) -> Stats {
    team.equipped_trackers()
        .filter(|t| t.state == DjinnState::Set)
        .fold(Stats::default(), |acc, t| {
            let (atk, def) = compatibility_bonus(unit_element, t.element);
            acc.plus(Stats {
                atk,
                def,
                ..Stats::default()
            })
        })
}

/// Move the given Djinn from Set to Standby. All must be equipped and Set.
///
/// The recovery length equals the number activated together.
pub fn activate_djinn(team: &Team, djinn_ids: &[String]) -> Result<Team> {
    let mut next = team.clone();
    let recovery_rounds = djinn_ids.len() as u32;
    for id in djinn_ids {
        if !team.equipped_djinn.contains(id) {
            return Err(BattleError::DjinnUnavailable {
                djinn_id: id.clone(),
                reason: "not equipped".into(),
            });
        }
        match next.djinn_trackers.get_mut(id) {
            Some(tracker) if tracker.state == DjinnState::Set => {
                tracker.state = DjinnState::Standby { recovery_rounds };
            }
            _ => {
                return Err(BattleError::DjinnUnavailable {
                    djinn_id: id.clone(),
                    reason: "not set".into(),
                })
            }
        }
    }
    Ok(next)
}

/// Round-end transition for every tracker.
///
/// Standby starts its countdown; Recovery counts down and returns to Set
/// at zero.
#[must_use]
pub fn advance_djinn_recovery(team: &Team) -> Team {
    let mut next = team.clone();
    for tracker in next.djinn_trackers.values_mut() {
        tracker.state = match tracker.state {
            DjinnState::Set => DjinnState::Set,
            DjinnState::Standby { recovery_rounds } if recovery_rounds == 0 => DjinnState::Set,
            DjinnState::Standby { recovery_rounds } => DjinnState::Recovery {
                rounds_remaining: recovery_rounds,
            },
            DjinnState::Recovery { rounds_remaining } if rounds_remaining <= 1 => {
                debug!(djinn = %tracker.djinn_id, "Djinn recovered");
                DjinnState::Set
            }
            DjinnState::Recovery { rounds_remaining } => DjinnState::Recovery {
                rounds_remaining: rounds_remaining - 1,
            },
        };
    }
    next
}

/// Outcome of a Djinn summon.
#[derive(Debug, Clone, PartialEq)]
pub struct SummonResult {
    /// Team with the summoned Djinn on standby.
    pub team: Team,
    /// Enemy roster after the summon.
    pub enemies: Vec<Unit>,
    /// Per-target damage applications, in hit order.
    pub hits: Vec<(String, DamageApplication)>,
}

/// Summon the given Djinn against `enemies`.
///
/// Three Djinn strike every living enemy. One or two strike a single
/// living enemy picked with one draw.
pub fn execute_summon(
    team: &Team,
    enemies: &[Unit],
    djinn_ids: &[String],
    rng: &mut dyn Prng,
) -> Result<SummonResult> {
    let team = activate_djinn(team, djinn_ids)?;
    let damage = summon_damage(djinn_ids.len());
    let alive: Vec<usize> = enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_ko())
        .map(|(i, _)| i)
        .collect();

    let targets: Vec<usize> = if djinn_ids.len() >= 3 {
        alive
    } else {
        pick_index(rng, alive.len())
            .map(|i| vec![alive[i]])
            .unwrap_or_default()
    };

    let mut enemies = enemies.to_vec();
    let mut hits = Vec::with_capacity(targets.len());
    for idx in targets {
        let applied = apply_damage_with_shields(&enemies[idx], damage);
        debug!(target = %enemies[idx].id, damage = applied.actual_damage, "Summon hit");
        enemies[idx] = applied.unit.clone();
        hits.push((enemies[idx].id.clone(), applied));
    }

    Ok(SummonResult { team, enemies, hits })
}
