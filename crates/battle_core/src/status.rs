//! Status effect engine.
//!
//! Statuses are a closed sum type. A unit's list keeps application order,
//! which matters for the damage pipeline. Durations count down at the
//! unit's start-of-turn tick; shields and auto-revive are consumed by
//! charges instead.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combat::apply_damage;
use crate::element::Element;
use crate::rng::Prng;
use crate::stats::StatKind;
use crate::unit::Unit;

/// Poison deals this fraction of max HP per tick.
pub const POISON_DAMAGE_PERCENT: f64 = 0.08;

/// Burn deals this fraction of max HP per tick.
pub const BURN_DAMAGE_PERCENT: f64 = 0.10;

/// Chance to break out of freeze at each tick.
pub const FREEZE_BREAK_CHANCE: f64 = 0.30;

/// Chance that a paralyzed unit fails to act.
pub const PARALYZE_FAILURE_CHANCE: f64 = 0.50;

/// A status on a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatusEffect {
    /// Damage over time.
    Poison {
        /// Turns remaining.
        duration: u32,
    },
    /// Stronger damage over time.
    Burn {
        /// Turns remaining.
        duration: u32,
    },
    /// Turn skip with a break chance each tick.
    Freeze {
        /// Turns remaining.
        duration: u32,
    },
    /// Actions may fail.
    Paralyze {
        /// Turns remaining.
        duration: u32,
    },
    /// Turn skip.
    Stun {
        /// Turns remaining.
        duration: u32,
    },
    /// Positive stat modifier.
    Buff {
        /// Modified stat.
        stat: StatKind,
        /// Signed delta.
        modifier: i32,
        /// Turns remaining.
        duration: u32,
    },
    /// Negative stat modifier.
    Debuff {
        /// Modified stat.
        stat: StatKind,
        /// Signed delta.
        modifier: i32,
        /// Turns remaining.
        duration: u32,
    },
    /// Blocks one hit per charge.
    Shield {
        /// Hits left to block.
        remaining_charges: u32,
    },
    /// Multiplies incoming damage by `1 - percent`.
    DamageReduction {
        /// Fraction blocked.
        percent: f64,
        /// Turns remaining.
        duration: u32,
    },
    /// Reduces damage of one element. Negative values are weaknesses.
    ElementalResistance {
        /// Resisted element.
        element: Element,
        /// Fraction resisted.
        modifier: f64,
        /// Turns remaining.
        duration: u32,
    },
    /// Blocks incoming statuses.
    Immunity {
        /// Block every status.
        all: bool,
        /// Blocked kinds when `all` is false.
        types: Vec<StatusKind>,
        /// Turns remaining.
        duration: u32,
    },
    /// Survive a lethal hit.
    AutoRevive {
        /// Fraction of max HP restored.
        hp_percent: f64,
        /// Lethal hits left to survive.
        uses_remaining: u32,
    },
    /// Ignores all damage.
    Invulnerable {
        /// Turns remaining.
        duration: u32,
    },
    /// Heals at each tick.
    HealOverTime {
        /// HP restored per tick.
        heal_per_turn: u32,
        /// Turns remaining.
        duration: u32,
    },
}

/// Discriminant of [`StatusEffect`], used for immunity lists and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusKind {
    /// See [`StatusEffect::Poison`].
    Poison,
    /// See [`StatusEffect::Burn`].
    Burn,
    /// See [`StatusEffect::Freeze`].
    Freeze,
    /// See [`StatusEffect::Paralyze`].
    Paralyze,
    /// See [`StatusEffect::Stun`].
    Stun,
    /// See [`StatusEffect::Buff`].
    Buff,
    /// See [`StatusEffect::Debuff`].
    Debuff,
    /// See [`StatusEffect::Shield`].
    Shield,
    /// See [`StatusEffect::DamageReduction`].
    DamageReduction,
    /// See [`StatusEffect::ElementalResistance`].
    ElementalResistance,
    /// See [`StatusEffect::Immunity`].
    Immunity,
    /// See [`StatusEffect::AutoRevive`].
    AutoRevive,
    /// See [`StatusEffect::Invulnerable`].
    Invulnerable,
    /// See [`StatusEffect::HealOverTime`].
    HealOverTime,
}

impl StatusEffect {
    /// Discriminant.
    #[must_use]
    pub const fn kind(&self) -> StatusKind {
        match self {
            Self::Poison { .. } => StatusKind::Poison,
            Self::Burn { .. } => StatusKind::Burn,
            Self::Freeze { .. } => StatusKind::Freeze,
            Self::Paralyze { .. } => StatusKind::Paralyze,
            Self::Stun { .. } => StatusKind::Stun,
            Self::Buff { .. } => StatusKind::Buff,
            Self::Debuff { .. } => StatusKind::Debuff,
            Self::Shield { .. } => StatusKind::Shield,
            Self::DamageReduction { .. } => StatusKind::DamageReduction,
            Self::ElementalResistance { .. } => StatusKind::ElementalResistance,
            Self::Immunity { .. } => StatusKind::Immunity,
            Self::AutoRevive { .. } => StatusKind::AutoRevive,
            Self::Invulnerable { .. } => StatusKind::Invulnerable,
            Self::HealOverTime { .. } => StatusKind::HealOverTime,
        }
    }

    /// Whether a cleanse of negative statuses removes this one.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.kind().is_negative()
    }

    /// Remaining turns, or `None` for charge-based statuses.
    #[must_use]
    pub const fn duration(&self) -> Option<u32> {
        match self {
            Self::Poison { duration }
            | Self::Burn { duration }
            | Self::Freeze { duration }
            | Self::Paralyze { duration }
            | Self::Stun { duration }
            | Self::Buff { duration, .. }
            | Self::Debuff { duration, .. }
            | Self::DamageReduction { duration, .. }
            | Self::ElementalResistance { duration, .. }
            | Self::Immunity { duration, .. }
            | Self::Invulnerable { duration }
            | Self::HealOverTime { duration, .. } => Some(*duration),
            Self::Shield { .. } | Self::AutoRevive { .. } => None,
        }
    }

    /// Whether the status is spent and must be pruned.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        match self {
            Self::Shield { remaining_charges } => *remaining_charges == 0,
            Self::AutoRevive { uses_remaining, .. } => *uses_remaining == 0,
            _ => matches!(self.duration(), Some(0)),
        }
    }

    fn with_duration(&self, value: u32) -> Self {
        let mut next = self.clone();
        match &mut next {
            Self::Poison { duration }
            | Self::Burn { duration }
            | Self::Freeze { duration }
            | Self::Paralyze { duration }
            | Self::Stun { duration }
            | Self::Buff { duration, .. }
            | Self::Debuff { duration, .. }
            | Self::DamageReduction { duration, .. }
            | Self::ElementalResistance { duration, .. }
            | Self::Immunity { duration, .. }
            | Self::Invulnerable { duration }
            | Self::HealOverTime { duration, .. } => *duration = value,
            Self::Shield { .. } | Self::AutoRevive { .. } => {}
        }
        next
    }

    fn decremented(&self) -> Self {
        match self.duration() {
            Some(d) => self.with_duration(d.saturating_sub(1)),
            None => self.clone(),
        }
    }
}

impl StatusKind {
    /// Poison, burn, freeze, debuff, paralyze and stun are negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(
            self,
            Self::Poison | Self::Burn | Self::Freeze | Self::Debuff | Self::Paralyze | Self::Stun
        )
    }
}

/// Outcome of a start-of-turn tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusTick {
    /// Unit after damage, healing and pruning.
    pub unit: Unit,
    /// Combined poison and burn damage. HP clamps at 0, this does not.
    pub damage: u32,
    /// HP restored by heal-over-time.
    pub healed: u32,
    /// Frozen or stunned: the unit loses this turn.
    pub skip_turn: bool,
    /// Which skip applied, if any.
    pub skipped_by: Option<StatusKind>,
    /// Statuses pruned this tick, in list order.
    pub expired: Vec<StatusKind>,
}

/// Run the start-of-turn tick for one unit.
///
/// Statuses are processed in list order. Freeze draws once per freeze
/// status; nothing else touches `rng`. Poison and burn damage is summed
/// and applied as a single HP loss after the walk.
pub fn tick_statuses(unit: &Unit, rng: &mut dyn Prng) -> StatusTick {
    let max_hp = unit.max_hp();
    let mut dot = 0u32;
    let mut heal = 0u32;
    let mut skipped_by = None;
    let mut ticked = Vec::with_capacity(unit.status_effects.len());

    for status in &unit.status_effects {
        let next = match status {
            StatusEffect::Poison { .. } => {
                dot += (f64::from(max_hp) * POISON_DAMAGE_PERCENT).floor() as u32;
                status.decremented()
            }
            StatusEffect::Burn { .. } => {
                dot += (f64::from(max_hp) * BURN_DAMAGE_PERCENT).floor() as u32;
                status.decremented()
            }
            StatusEffect::Freeze { .. } => {
                if rng.next_f64() < FREEZE_BREAK_CHANCE {
                    debug!(unit = %unit.id, "Broke free of freeze");
                    status.with_duration(0)
                } else {
                    skipped_by.get_or_insert(StatusKind::Freeze);
                    status.decremented()
                }
            }
            StatusEffect::Stun { .. } => {
                skipped_by.get_or_insert(StatusKind::Stun);
                status.decremented()
            }
            StatusEffect::HealOverTime { heal_per_turn, .. } => {
                heal += heal_per_turn;
                status.decremented()
            }
            _ => status.decremented(),
        };
        ticked.push(next);
    }

    let (kept, expired): (Vec<_>, Vec<_>) = ticked.into_iter().partition(|s| !s.is_expired());
    let expired: Vec<StatusKind> = expired.iter().map(StatusEffect::kind).collect();

    let mut next = unit.with_statuses(kept);
    let mut damage = 0;
    if dot > 0 && !next.is_ko() {
        next = apply_damage(&next, dot);
        damage = dot;
    }
    let mut healed = 0;
    if heal > 0 && !next.is_ko() {
        let before = next.current_hp;
        next = next.with_hp(before.saturating_add(heal));
        healed = next.current_hp - before;
    }

    if damage > 0 || healed > 0 || !expired.is_empty() {
        debug!(
            unit = %unit.id,
            damage,
            healed,
            expired = expired.len(),
            "Status tick"
        );
    }

    StatusTick {
        unit: next,
        damage,
        healed,
        skip_turn: skipped_by.is_some(),
        skipped_by,
        expired,
    }
}

/// Roll paralysis right before an action. Returns `true` if the action fails.
///
/// Draws only when the unit is paralyzed; every attempt re-rolls.
pub fn check_paralysis(unit: &Unit, rng: &mut dyn Prng) -> bool {
    if !unit.has_status(StatusKind::Paralyze) {
        return false;
    }
    rng.next_f64() < PARALYZE_FAILURE_CHANCE
}

/// Whether an immunity on `unit` blocks statuses of `kind`.
#[must_use]
pub fn is_immune(unit: &Unit, kind: StatusKind) -> bool {
    unit.status_effects.iter().any(|s| match s {
        StatusEffect::Immunity { all, types, .. } => *all || types.contains(&kind),
        _ => false,
    })
}

/// Append `status` unless an immunity blocks it. Blocked statuses are
/// dropped silently and the unit is returned unchanged.
#[must_use]
pub fn apply_status_to_unit(unit: &Unit, status: StatusEffect) -> Unit {
    if is_immune(unit, status.kind()) {
        debug!(unit = %unit.id, status = ?status.kind(), "Status blocked by immunity");
        return unit.clone();
    }
    let mut statuses = unit.status_effects.clone();
    statuses.push(status);
    unit.with_statuses(statuses)
}

/// Remove every status matching `predicate`.
#[must_use]
pub fn remove_statuses<F>(unit: &Unit, predicate: F) -> Unit
where
    F: Fn(&StatusEffect) -> bool,
{
    let kept = unit
        .status_effects
        .iter()
        .filter(|s| !predicate(s))
        .cloned()
        .collect();
    unit.with_statuses(kept)
}

/// Remove poison, burn, freeze, debuff, paralyze and stun.
#[must_use]
pub fn cleanse_negative(unit: &Unit) -> Unit {
    remove_statuses(unit, StatusEffect::is_negative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{unit_with_hp, FixedRng};

    #[test]
    fn test_poison_and_burn_combine() {
        let unit = unit_with_hp(100).with_statuses(vec![
            StatusEffect::Poison { duration: 2 },
            StatusEffect::Burn { duration: 1 },
        ]);
        let tick = tick_statuses(&unit, &mut FixedRng(vec![0.5], 0));
        assert_eq!(tick.damage, 18);
        assert_eq!(tick.unit.current_hp, 82);
        assert_eq!(tick.expired, vec![StatusKind::Burn]);
        assert_eq!(
            tick.unit.status_effects,
            vec![StatusEffect::Poison { duration: 1 }]
        );
        assert!(!tick.skip_turn);
    }

    #[test]
    fn test_lethal_tick_reports_full_damage() {
        let unit = unit_with_hp(100)
            .with_hp(5)
            .with_statuses(vec![
                StatusEffect::Poison { duration: 2 },
                StatusEffect::Burn { duration: 2 },
            ]);
        let tick = tick_statuses(&unit, &mut FixedRng(vec![0.5], 0));
        assert_eq!(tick.damage, 18);
        assert_eq!(tick.unit.current_hp, 0);
        assert_eq!(tick.unit.battle_stats.damage_taken, 18);
    }

    #[test]
    fn test_freeze_skip_and_break() {
        let unit = unit_with_hp(100).with_statuses(vec![StatusEffect::Freeze { duration: 3 }]);

        let held = tick_statuses(&unit, &mut FixedRng(vec![0.9], 0));
        assert!(held.skip_turn);
        assert_eq!(held.skipped_by, Some(StatusKind::Freeze));
        assert_eq!(
            held.unit.status_effects,
            vec![StatusEffect::Freeze { duration: 2 }]
        );

        let broke = tick_statuses(&unit, &mut FixedRng(vec![0.1], 0));
        assert!(!broke.skip_turn);
        assert!(broke.unit.status_effects.is_empty());
        assert_eq!(broke.expired, vec![StatusKind::Freeze]);
    }

    #[test]
    fn test_shield_survives_tick() {
        let unit = unit_with_hp(100).with_statuses(vec![StatusEffect::Shield {
            remaining_charges: 2,
        }]);
        let tick = tick_statuses(&unit, &mut FixedRng(vec![0.5], 0));
        assert_eq!(tick.unit.status_effects.len(), 1);
    }

    #[test]
    fn test_heal_over_time_clamped() {
        let unit = unit_with_hp(100)
            .with_hp(95)
            .with_statuses(vec![StatusEffect::HealOverTime {
                heal_per_turn: 20,
                duration: 2,
            }]);
        let tick = tick_statuses(&unit, &mut FixedRng(vec![0.5], 0));
        assert_eq!(tick.unit.current_hp, 100);
        assert_eq!(tick.healed, 5);
    }

    #[test]
    fn test_paralysis_only_rolls_when_paralyzed() {
        let clean = unit_with_hp(100);
        let mut rng = FixedRng(vec![0.1], 0);
        assert!(!check_paralysis(&clean, &mut rng));
        assert_eq!(rng.1, 0);

        let para = clean.with_statuses(vec![StatusEffect::Paralyze { duration: 2 }]);
        assert!(check_paralysis(&para, &mut FixedRng(vec![0.1], 0)));
        assert!(!check_paralysis(&para, &mut FixedRng(vec![0.6], 0)));
    }

    #[test]
    fn test_immunity_blocks() {
        let all = unit_with_hp(100).with_statuses(vec![StatusEffect::Immunity {
            all: true,
            types: Vec::new(),
            duration: 3,
        }]);
        let after = apply_status_to_unit(&all, StatusEffect::Poison { duration: 3 });
        assert_eq!(after.status_effects.len(), 1);

        let listed = unit_with_hp(100).with_statuses(vec![
            StatusEffect::Immunity {
                all: false,
                types: vec![StatusKind::Poison],
                duration: 3,
            },
            StatusEffect::Immunity {
                all: false,
                types: vec![StatusKind::Burn],
                duration: 3,
            },
        ]);
        let after = apply_status_to_unit(&listed, StatusEffect::Burn { duration: 3 });
        assert_eq!(after.status_effects.len(), 2);
        let after = apply_status_to_unit(&listed, StatusEffect::Stun { duration: 1 });
        assert_eq!(after.status_effects.len(), 3);
    }

    #[test]
    fn test_cleanse_keeps_positive() {
        let unit = unit_with_hp(100).with_statuses(vec![
            StatusEffect::Poison { duration: 2 },
            StatusEffect::Buff {
                stat: StatKind::Atk,
                modifier: 4,
                duration: 2,
            },
            StatusEffect::Debuff {
                stat: StatKind::Def,
                modifier: -3,
                duration: 2,
            },
            StatusEffect::Shield {
                remaining_charges: 1,
            },
        ]);
        let cleansed = cleanse_negative(&unit);
        let kinds: Vec<_> = cleansed.status_effects.iter().map(StatusEffect::kind).collect();
        assert_eq!(kinds, vec![StatusKind::Buff, StatusKind::Shield]);
    }
}
