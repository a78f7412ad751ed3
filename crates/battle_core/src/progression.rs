//! Experience curve, leveling and ability unlocks.

use tracing::debug;

use crate::unit::Unit;

/// Highest reachable level.
pub const MAX_LEVEL: u32 = 20;

/// Cumulative XP needed for each level, index 0 is level 1.
pub const XP_CURVE: [u32; MAX_LEVEL as usize] = [
    0, 100, 350, 850, 1850, 3100, 4700, 6700, 9200, 12300, 16000, 20400, 25600, 31700, 38800,
    47000, 56400, 67100, 79200, 92800,
];

/// Cumulative XP threshold of `level`, clamped to `1..=MAX_LEVEL`.
#[must_use]
pub fn get_xp_for_level(level: u32) -> u32 {
    let idx = level.clamp(1, MAX_LEVEL) as usize - 1;
    XP_CURVE[idx]
}

/// Highest level whose threshold is at or below `xp`.
#[must_use]
pub fn level_from_xp(xp: u32) -> u32 {
    XP_CURVE
        .iter()
        .rposition(|&threshold| threshold <= xp)
        .map_or(1, |idx| idx as u32 + 1)
}

/// Outcome of an XP gain.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelUpResult {
    /// Unit after the gain.
    pub unit: Unit,
    /// Level before.
    pub old_level: u32,
    /// Level after.
    pub new_level: u32,
    /// Ability ids newly unlocked, in level order.
    pub unlocked_abilities: Vec<String>,
}

impl LevelUpResult {
    /// Whether at least one level was gained.
    #[must_use]
    pub const fn leveled_up(&self) -> bool {
        self.new_level > self.old_level
    }
}

/// Add XP and unlock abilities for every level crossed.
///
/// Abilities already unlocked are not added again.
#[must_use]
pub fn add_xp(unit: &Unit, gain: u32) -> LevelUpResult {
    let old_level = unit.level;
    let xp = unit.xp.saturating_add(gain);
    let new_level = level_from_xp(xp).max(old_level);

    let mut next = unit.clone();
    next.xp = xp;
    next.level = new_level;

    let mut unlocked_abilities = Vec::new();
    for level in (old_level + 1)..=new_level {
        for ability in unit.abilities.iter().filter(|a| a.unlock_level == level) {
            if next.unlocked_ability_ids.insert(ability.id.clone()) {
                unlocked_abilities.push(ability.id.clone());
            }
        }
    }

    if new_level > old_level {
        debug!(
            unit = %unit.id,
            old_level,
            new_level,
            unlocked = unlocked_abilities.len(),
            "Level up"
        );
    }

    LevelUpResult {
        unit: next,
        old_level,
        new_level,
        unlocked_abilities,
    }
}
