//! Post-battle XP and gold.
//!
//! ```text
//! xp_total   = floor(sum(base_xp * level) * (all_survived ? 1.5 : 1.0))
//! gold_total = sum(floor(base_gold * level * (1.0 + 0.2 * r)))
//! xp_each    = floor(xp_total / survivors)
//! drops      = per enemy, per drop table entry: r < chance
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::{ContentRegistry, Equipment};
use crate::events::BattleEvent;
use crate::progression::{add_xp, MAX_LEVEL};
use crate::rng::Prng;
use crate::stats::Stats;
use crate::team::Team;
use crate::unit::Unit;

/// XP multiplier when no party member was knocked out.
pub const SURVIVAL_BONUS: f64 = 1.5;
/// Upper bound of the random gold bonus.
pub const GOLD_VARIANCE: f64 = 0.2;

/// Totals earned from one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BattleRewards {
    /// XP before splitting.
    pub total_xp: u32,
    /// Gold earned.
    pub total_gold: u32,
    /// XP each survivor receives.
    pub xp_per_unit: u32,
    /// Party members standing at the end.
    pub survivor_count: u32,
    /// Nobody was knocked out.
    pub all_survived: bool,
    /// Enemies counted.
    pub enemies_defeated: u32,
    /// Equipment dropped, in enemy then table order.
    pub equipment_drops: Vec<Equipment>,
}

/// Compute rewards for `defeated` enemies.
///
/// Base values come from the enemy definitions in `registry`, keyed by
/// [`Unit::definition_id`]. Draws once per enemy for the gold bonus, then
/// once per drop table entry. A wiped party earns nothing and draws
/// nothing.
pub fn calculate_battle_rewards(
    defeated: &[Unit],
    team: &Team,
    registry: &ContentRegistry,
    rng: &mut dyn Prng,
) -> BattleRewards {
    let survivor_count = team.units.iter().filter(|u| !u.is_ko()).count() as u32;
    let all_survived = survivor_count as usize == team.units.len();
    let enemies_defeated = defeated.len() as u32;

    if defeated.is_empty() || survivor_count == 0 {
        return BattleRewards {
            survivor_count,
            all_survived: all_survived && survivor_count > 0,
            enemies_defeated,
            ..BattleRewards::default()
        };
    }

    let base_xp: u32 = defeated
        .iter()
        .map(|e| registry.rewards_for(&e.definition_id).base_xp * e.level)
        .sum();
    let bonus = if all_survived { SURVIVAL_BONUS } else { 1.0 };
    let total_xp = (f64::from(base_xp) * bonus).floor() as u32;

    let total_gold = defeated
        .iter()
        .map(|e| {
            let base = f64::from(registry.rewards_for(&e.definition_id).base_gold * e.level);
            (base * (1.0 + rng.next_f64() * GOLD_VARIANCE)).floor() as u32
        })
        .sum();

    let equipment_drops = roll_drops(defeated, registry, rng);

    let rewards = BattleRewards {
        total_xp,
        total_gold,
        xp_per_unit: total_xp / survivor_count,
        survivor_count,
        all_survived,
        enemies_defeated,
        equipment_drops,
    };
    debug!(
        xp = rewards.total_xp,
        gold = rewards.total_gold,
        each = rewards.xp_per_unit,
        drops = rewards.equipment_drops.len(),
        "Battle rewards"
    );
    rewards
}

fn roll_drops(defeated: &[Unit], registry: &ContentRegistry, rng: &mut dyn Prng) -> Vec<Equipment> {
    let mut drops = Vec::new();
    for enemy in defeated {
        for drop in registry.drops_for(&enemy.definition_id) {
            if rng.next_f64() >= drop.chance {
                continue;
            }
            match registry.equipment(&drop.equipment) {
                Some(item) => drops.push(item.clone()),
                None => warn!(enemy = %enemy.id, item = %drop.equipment, "Unknown drop"),
            }
        }
    }
    drops
}

/// A level gained while distributing rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpReport {
    /// Unit id.
    pub unit_id: String,
    /// Level before.
    pub old_level: u32,
    /// Level after.
    pub new_level: u32,
    /// Growth gained across the levels.
    pub stat_gains: Stats,
    /// Abilities learned.
    pub unlocked_abilities: Vec<String>,
}

/// Team after rewards, with what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardDistribution {
    /// Updated party.
    pub team: Team,
    /// Gold earned.
    pub gold: u32,
    /// Units that gained levels.
    pub level_ups: Vec<LevelUpReport>,
    /// One `Xp` event per unit that received XP.
    pub events: Vec<BattleEvent>,
}

/// Give `rewards.xp_per_unit` to every surviving unit below max level.
#[must_use]
pub fn distribute_rewards(team: &Team, rewards: &BattleRewards) -> RewardDistribution {
    let mut next = team.clone();
    let mut level_ups = Vec::new();
    let mut events = Vec::new();

    for unit in &mut next.units {
        if unit.is_ko() || unit.level >= MAX_LEVEL {
            continue;
        }
        let result = add_xp(unit, rewards.xp_per_unit);
        events.push(BattleEvent::Xp {
            unit_id: unit.id.clone(),
            amount: rewards.xp_per_unit,
            new_level: result.new_level,
            unlocked_abilities: result.unlocked_abilities.clone(),
        });
        if result.leveled_up() {
            let gained = (result.new_level - result.old_level) as i32;
            level_ups.push(LevelUpReport {
                unit_id: unit.id.clone(),
                old_level: result.old_level,
                new_level: result.new_level,
                stat_gains: unit.growth_rates.scaled(gained),
                unlocked_abilities: result.unlocked_abilities.clone(),
            });
        }
        *unit = result.unit;
    }

    RewardDistribution {
        team: next,
        gold: rewards.total_gold,
        level_ups,
        events,
    }
}
