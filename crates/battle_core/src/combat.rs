//! Damage, healing, critical hits and evasion.
//!
//! Formula functions return a *nominal* damage value. Shields,
//! invulnerability and auto-revive are resolved later, when that value is
//! applied to a unit.
//!
//! ```text
//! physical  = basePower|ATK + ATK - effectiveDEF * 0.5
//! psynergy  = (basePower + MAG - effectiveDEF * 0.3) * element
//! effectiveDEF = DEF * (1 - ignoreDefense)
//! nominal   = max(1, floor(raw * variance * (1 - resist) * (1 - reduction) * (1 - armor)))
//! ```

use tracing::debug;

use crate::data::Ability;
use crate::data::AbilityType;
use crate::element::element_modifier;
use crate::error::{BattleError, Result};
use crate::rng::Prng;
use crate::stats::effective_stats;
use crate::status::StatusEffect;
use crate::team::Team;
use crate::unit::Unit;

/// Crit chance before speed scaling.
pub const BASE_CRIT_CHANCE: f64 = 0.05;
/// `sqrt(SPD)` is divided by this.
pub const CRIT_SPEED_SCALING: f64 = 200.0;
/// Crit chance never exceeds this.
pub const MAX_CRIT_CHANCE: f64 = 0.35;
/// Nominal damage multiplier on a critical hit.
pub const CRIT_MULTIPLIER: f64 = 2.0;

/// Evasion every defender has.
pub const BASE_EVASION: f64 = 0.05;
/// Evasion cap.
pub const MAX_EVASION: f64 = 0.40;
/// Evasion per point of SPD advantage.
pub const EVASION_PER_SPEED: f64 = 0.01;
/// Hit chance floor.
pub const MIN_HIT_CHANCE: f64 = 0.05;
/// Hit chance ceiling.
pub const MAX_HIT_CHANCE: f64 = 0.95;

/// Lowest variance factor.
pub const VARIANCE_MIN: f64 = 0.9;
/// Width of the variance range.
pub const VARIANCE_SPAN: f64 = 0.2;

/// Share of effective defense subtracted from physical damage.
pub const PHYSICAL_DEFENSE_FACTOR: f64 = 0.5;
/// Share of effective defense subtracted from psynergy damage.
pub const PSYNERGY_DEFENSE_FACTOR: f64 = 0.3;
/// Damage floor for a landed hit.
pub const MIN_DAMAGE: u32 = 1;

/// Fraction of max HP restored by a revive.
pub const REVIVE_HP_PERCENT: f64 = 0.5;

/// Crit chance for an effective SPD value.
#[must_use]
pub fn crit_chance(spd: i32) -> f64 {
    let spd = f64::from(spd.max(0));
    (BASE_CRIT_CHANCE + spd.sqrt() / CRIT_SPEED_SCALING).min(MAX_CRIT_CHANCE)
}

/// Roll a critical hit for `attacker`. One draw.
pub fn check_critical(attacker: &Unit, team: &Team, rng: &mut dyn Prng) -> bool {
    let chance = crit_chance(effective_stats(attacker, team).spd);
    let crit = rng.next_f64() < chance;
    if crit {
        debug!(attacker = %attacker.id, chance, "Critical hit");
    }
    crit
}

/// Defender evasion, clamped to `[0, MAX_EVASION]`.
#[must_use]
pub fn evasion_chance(attacker_spd: i32, defender_spd: i32, equipment_evasion: u32) -> f64 {
    let speed_diff = f64::from(defender_spd - attacker_spd);
    (BASE_EVASION + f64::from(equipment_evasion) / 100.0 + speed_diff * EVASION_PER_SPEED)
        .clamp(0.0, MAX_EVASION)
}

/// Final hit chance, clamped to `[MIN_HIT_CHANCE, MAX_HIT_CHANCE]`.
#[must_use]
pub fn hit_chance(accuracy: f64, evasion: f64) -> f64 {
    (accuracy * (1.0 - evasion)).clamp(MIN_HIT_CHANCE, MAX_HIT_CHANCE)
}

/// Roll a dodge. Returns `true` when the attack misses. One draw.
pub fn check_dodge(
    attacker: &Unit,
    defender: &Unit,
    team: &Team,
    accuracy: f64,
    rng: &mut dyn Prng,
) -> bool {
    let evasion = evasion_chance(
        effective_stats(attacker, team).spd,
        effective_stats(defender, team).spd,
        defender.equipment.evasion(),
    );
    let chance = hit_chance(accuracy, evasion);
    let missed = rng.next_f64() >= chance;
    if missed {
        debug!(attacker = %attacker.id, defender = %defender.id, chance, "Attack dodged");
    }
    missed
}

/// Uniform variance factor in `[0.9, 1.1)`. One draw.
pub fn variance_factor(rng: &mut dyn Prng) -> f64 {
    VARIANCE_MIN + rng.next_f64() * VARIANCE_SPAN
}

/// Nominal physical damage for a given variance factor.
#[must_use]
pub fn physical_damage(
    attacker: &Unit,
    defender: &Unit,
    team: &Team,
    ability: &Ability,
    variance: f64,
) -> u32 {
    // Step 1: Effective stats
    let atk = effective_stats(attacker, team);
    let def = effective_stats(defender, team);

    // Step 2: Armor pierce
    let effective_def = f64::from(def.def) * (1.0 - ability.ignore_defense());

    // Step 3: Raw base
    let power = if ability.base_power == 0 {
        f64::from(atk.atk)
    } else {
        f64::from(ability.base_power)
    };
    let raw = power + f64::from(atk.atk) - effective_def * PHYSICAL_DEFENSE_FACTOR;

    // Step 5: Variance
    mitigate(raw * variance, defender, ability)
}

/// Nominal psynergy damage for a given variance factor.
#[must_use]
pub fn psynergy_damage(
    attacker: &Unit,
    defender: &Unit,
    team: &Team,
    ability: &Ability,
    variance: f64,
) -> u32 {
    // Step 1: Effective stats
    let atk = effective_stats(attacker, team);
    let def = effective_stats(defender, team);

    // Step 2: Armor pierce
    let effective_def = f64::from(def.def) * (1.0 - ability.ignore_defense());

    // Step 3: Raw base
    let mut raw = f64::from(ability.base_power) + f64::from(atk.mag)
        - effective_def * PSYNERGY_DEFENSE_FACTOR;

    // Step 4: Element triangle
    if let Some(element) = ability.element {
        raw *= element_modifier(element, defender.element);
    }

    // Step 5: Variance
    mitigate(raw * variance, defender, ability)
}

/// Steps 6 to 8: resistances, reductions, armor, floor.
fn mitigate(mut damage: f64, defender: &Unit, ability: &Ability) -> u32 {
    // Step 6: Summed elemental resistance, may exceed 1 or be negative
    if let Some(element) = ability.element {
        let resist: f64 = defender
            .status_effects
            .iter()
            .filter_map(|s| match s {
                StatusEffect::ElementalResistance {
                    element: e,
                    modifier,
                    ..
                } if *e == element => Some(*modifier),
                _ => None,
            })
            .sum();
        damage *= 1.0 - resist;
    }

    // Step 7: Damage reduction statuses, then armor resist
    let reduction: f64 = defender
        .status_effects
        .iter()
        .filter_map(|s| match s {
            StatusEffect::DamageReduction { percent, .. } => Some(*percent),
            _ => None,
        })
        .sum();
    damage *= 1.0 - reduction.clamp(0.0, 1.0);

    if ability.element.is_some() {
        damage *= 1.0 - defender.equipment.elemental_resist().clamp(0.0, 1.0);
    }

    // Step 8: Floor with minimum
    let floored = damage.floor();
    if floored < f64::from(MIN_DAMAGE) {
        MIN_DAMAGE
    } else {
        floored as u32
    }
}

/// Nominal damage for any ability with an explicit variance factor.
/// Non-damaging abilities return 0.
#[must_use]
pub fn compute_damage(
    attacker: &Unit,
    defender: &Unit,
    team: &Team,
    ability: &Ability,
    variance: f64,
) -> u32 {
    match ability.ability_type {
        AbilityType::Physical => physical_damage(attacker, defender, team, ability, variance),
        AbilityType::Psynergy => psynergy_damage(attacker, defender, team, ability, variance),
        _ => 0,
    }
}

/// Nominal damage with variance drawn from `rng`. One draw.
pub fn calculate_damage(
    attacker: &Unit,
    defender: &Unit,
    team: &Team,
    ability: &Ability,
    rng: &mut dyn Prng,
) -> u32 {
    let variance = variance_factor(rng);
    compute_damage(attacker, defender, team, ability, variance)
}

/// Nominal damage after a critical hit.
#[must_use]
pub fn critical_damage(nominal: u32) -> u32 {
    (f64::from(nominal) * CRIT_MULTIPLIER).floor() as u32
}

/// Subtract HP directly, ignoring shields.
///
/// HP clamps at 0; `damage_taken` records the full amount, overkill
/// included.
#[must_use]
pub fn apply_damage(unit: &Unit, amount: u32) -> Unit {
    let mut next = unit.with_hp(unit.current_hp.saturating_sub(amount));
    next.battle_stats.damage_taken = next.battle_stats.damage_taken.saturating_add(amount);
    next
}

/// Result of landing nominal damage on a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageApplication {
    /// Unit after the hit.
    pub unit: Unit,
    /// Damage that got through mitigation.
    pub actual_damage: u32,
    /// An auto-revive status saved the unit.
    pub auto_revived: bool,
}

/// Land `nominal` damage, honoring invulnerability, shields and auto-revive.
///
/// Checks, first match wins:
/// 1. Invulnerable: nothing lands, shields untouched.
/// 2. Shield with charges: nothing lands, one charge spent. Zero damage
///    spends no charge.
/// 3. Otherwise the full amount lands and is reported as actual damage,
///    overkill included; only HP is clamped. A lethal hit consumes one
///    auto-revive use if available.
#[must_use]
pub fn apply_damage_with_shields(unit: &Unit, nominal: u32) -> DamageApplication {
    if unit.has_status(crate::status::StatusKind::Invulnerable) {
        return DamageApplication {
            unit: unit.clone(),
            actual_damage: 0,
            auto_revived: false,
        };
    }

    if nominal > 0 {
        if let Some(idx) = unit.status_effects.iter().position(|s| {
            matches!(s, StatusEffect::Shield { remaining_charges } if *remaining_charges > 0)
        }) {
            let mut statuses = unit.status_effects.clone();
            if let StatusEffect::Shield { remaining_charges } = &mut statuses[idx] {
                *remaining_charges -= 1;
            }
            statuses.retain(|s| !s.is_expired() || !matches!(s, StatusEffect::Shield { .. }));
            debug!(unit = %unit.id, nominal, "Shield absorbed hit");
            return DamageApplication {
                unit: unit.with_statuses(statuses),
                actual_damage: 0,
                auto_revived: false,
            };
        }
    }

    // Spent shields let damage through and are pruned here
    let statuses: Vec<StatusEffect> = unit
        .status_effects
        .iter()
        .filter(|s| !matches!(s, StatusEffect::Shield { remaining_charges: 0 }))
        .cloned()
        .collect();
    let unit = unit.with_statuses(statuses);

    let hit = apply_damage(&unit, nominal);
    if hit.is_ko() {
        if let Some(revived) = check_auto_revive(&hit) {
            debug!(unit = %unit.id, hp = revived.current_hp, "Auto-revive triggered");
            return DamageApplication {
                unit: revived,
                actual_damage: nominal,
                auto_revived: true,
            };
        }
    }

    #[cfg(feature = "debug-validation")]
    debug_assert!(hit.current_hp <= hit.max_hp());

    DamageApplication {
        actual_damage: nominal,
        unit: hit,
        auto_revived: false,
    }
}

/// If `unit` is at 0 HP with an auto-revive use left, revive it.
///
/// HP becomes `floor(max_hp * hp_percent)`, which may itself be 0.
#[must_use]
pub fn check_auto_revive(unit: &Unit) -> Option<Unit> {
    if !unit.is_ko() {
        return None;
    }
    let idx = unit.status_effects.iter().position(
        |s| matches!(s, StatusEffect::AutoRevive { uses_remaining, .. } if *uses_remaining > 0),
    )?;

    let mut statuses = unit.status_effects.clone();
    let mut hp_percent = 0.0;
    if let StatusEffect::AutoRevive {
        hp_percent: pct,
        uses_remaining,
    } = &mut statuses[idx]
    {
        hp_percent = *pct;
        *uses_remaining -= 1;
    }
    if statuses[idx].is_expired() {
        statuses.remove(idx);
    }

    let hp = (f64::from(unit.max_hp()) * hp_percent.max(0.0)).floor() as u32;
    Some(unit.with_statuses(statuses).with_hp(hp))
}

/// Healing amount for a given variance factor.
///
/// `floor((basePower + MAG) * variance)`, at least 1 when `basePower > 0`,
/// otherwise 0.
#[must_use]
pub fn heal_amount(caster: &Unit, team: &Team, ability: &Ability, variance: f64) -> u32 {
    if ability.base_power == 0 {
        return 0;
    }
    let mag = effective_stats(caster, team).mag;
    let heal = ((f64::from(ability.base_power) + f64::from(mag)) * variance).floor();
    if heal < 1.0 {
        1
    } else {
        heal as u32
    }
}

/// Healing amount with variance drawn from `rng`. One draw.
pub fn calculate_healing(caster: &Unit, team: &Team, ability: &Ability, rng: &mut dyn Prng) -> u32 {
    let variance = variance_factor(rng);
    heal_amount(caster, team, ability, variance)
}

/// Restore HP, clamped to max HP.
///
/// Negative amounts and knocked out targets are caller bugs and fail.
pub fn apply_healing(unit: &Unit, amount: i64) -> Result<Unit> {
    if amount < 0 {
        return Err(BattleError::NegativeHealing(amount));
    }
    if unit.is_ko() {
        return Err(BattleError::HealKnockedOut(unit.id.clone()));
    }
    let amount = u32::try_from(amount).unwrap_or(u32::MAX);
    Ok(unit.with_hp(unit.current_hp.saturating_add(amount)))
}

/// Bring a knocked out unit back at half max HP (at least 1).
#[must_use]
pub fn revive_unit(unit: &Unit) -> Unit {
    let hp = (f64::from(unit.max_hp()) * REVIVE_HP_PERCENT).floor() as u32;
    unit.with_hp(hp.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TargetKind;
    use crate::element::Element;
    use crate::stats::Stats;
    use crate::test_support::{ability, unit_with_hp, unit_with_stats, FixedRng};

    fn attacker() -> Unit {
        unit_with_stats("isaac", Stats::new(100, 20, 30, 10, 25, 10))
    }

    fn defender() -> Unit {
        unit_with_stats("slime", Stats::new(100, 0, 10, 20, 5, 10))
    }

    #[test]
    fn test_physical_damage_formula() {
        let team = Team::default();
        let strike = ability("strike", AbilityType::Physical, 20, TargetKind::SingleEnemy);
        assert_eq!(physical_damage(&attacker(), &defender(), &team, &strike, 1.0), 40);

        let mut pierce = strike.clone();
        pierce.ignore_defense_percent = Some(1.0);
        assert_eq!(physical_damage(&attacker(), &defender(), &team, &pierce, 1.0), 50);
    }

    #[test]
    fn test_zero_power_uses_attack() {
        let team = Team::default();
        let basic = Ability::basic_attack();
        // 30 + 30 - 10
        assert_eq!(physical_damage(&attacker(), &defender(), &team, &basic, 1.0), 50);
    }

    #[test]
    fn test_psynergy_damage_formula() {
        let team = Team::default();
        let bolt = ability("bolt", AbilityType::Psynergy, 50, TargetKind::SingleEnemy);
        assert_eq!(psynergy_damage(&attacker(), &defender(), &team, &bolt, 1.0), 69);
    }

    #[test]
    fn test_psynergy_element_advantage() {
        let team = Team::default();
        let mut target = defender();
        target.element = Element::Jupiter;
        let mut quake = ability("quake", AbilityType::Psynergy, 50, TargetKind::SingleEnemy);
        quake.element = Some(Element::Venus);
        // floor(69 * 1.5)
        assert_eq!(psynergy_damage(&attacker(), &target, &team, &quake, 1.0), 103);
    }

    #[test]
    fn test_damage_floor() {
        let team = Team::default();
        let weak = unit_with_stats("weak", Stats::new(10, 0, 1, 0, 1, 1));
        let wall = unit_with_stats("wall", Stats::new(10, 0, 1, 500, 1, 1));
        let poke = ability("poke", AbilityType::Physical, 1, TargetKind::SingleEnemy);
        assert_eq!(physical_damage(&weak, &wall, &team, &poke, 1.0), MIN_DAMAGE);
    }

    #[test]
    fn test_resistances_stack_and_floor() {
        let team = Team::default();
        let mut bolt = ability("bolt", AbilityType::Psynergy, 50, TargetKind::SingleEnemy);
        bolt.element = Some(Element::Mars);

        let resisted = defender().with_statuses(vec![
            StatusEffect::ElementalResistance {
                element: Element::Mars,
                modifier: 0.8,
                duration: 2,
            },
            StatusEffect::ElementalResistance {
                element: Element::Mars,
                modifier: 0.5,
                duration: 2,
            },
        ]);
        assert_eq!(psynergy_damage(&attacker(), &resisted, &team, &bolt, 1.0), 1);

        let weak = defender().with_statuses(vec![StatusEffect::ElementalResistance {
            element: Element::Mars,
            modifier: -0.5,
            duration: 2,
        }]);
        // floor(69 * 1.5)
        assert_eq!(psynergy_damage(&attacker(), &weak, &team, &bolt, 1.0), 103);
    }

    #[test]
    fn test_damage_reduction_clamped() {
        let team = Team::default();
        let strike = ability("strike", AbilityType::Physical, 20, TargetKind::SingleEnemy);
        let halved = defender().with_statuses(vec![
            StatusEffect::DamageReduction {
                percent: 0.25,
                duration: 2,
            },
            StatusEffect::DamageReduction {
                percent: 0.25,
                duration: 2,
            },
        ]);
        assert_eq!(physical_damage(&attacker(), &halved, &team, &strike, 1.0), 20);

        let walled = defender().with_statuses(vec![StatusEffect::DamageReduction {
            percent: 1.5,
            duration: 2,
        }]);
        assert_eq!(physical_damage(&attacker(), &walled, &team, &strike, 1.0), 1);
    }

    #[test]
    fn test_crit_chance_capped() {
        assert!((crit_chance(0) - 0.05).abs() < 1e-9);
        assert!((crit_chance(100) - 0.10).abs() < 1e-9);
        assert_eq!(crit_chance(999_999), MAX_CRIT_CHANCE);
        assert_eq!(critical_damage(21), 42);
    }

    #[test]
    fn test_hit_chance_bounds() {
        assert_eq!(evasion_chance(10, 200, 100), MAX_EVASION);
        assert_eq!(evasion_chance(200, 10, 0), 0.0);
        assert_eq!(hit_chance(1.0, 0.0), MAX_HIT_CHANCE);
        assert_eq!(hit_chance(0.01, 0.4), MIN_HIT_CHANCE);
    }

    #[test]
    fn test_dodge_draw() {
        let team = Team::default();
        // Equal speed: evasion 0.05, hit chance 0.95 * 0.95 = 0.9025
        assert!(!check_dodge(&attacker(), &defender(), &team, 0.95, &mut FixedRng::always(0.9)));
        assert!(check_dodge(&attacker(), &defender(), &team, 0.95, &mut FixedRng::always(0.91)));
    }

    #[test]
    fn test_shield_consumes_charge() {
        let unit = unit_with_hp(100).with_statuses(vec![StatusEffect::Shield {
            remaining_charges: 1,
        }]);
        let first = apply_damage_with_shields(&unit, 999);
        assert_eq!(first.actual_damage, 0);
        assert_eq!(first.unit.current_hp, 100);
        assert!(first.unit.status_effects.is_empty());

        let second = apply_damage_with_shields(&first.unit, 30);
        assert_eq!(second.actual_damage, 30);
        assert_eq!(second.unit.current_hp, 70);
        assert_eq!(second.unit.battle_stats.damage_taken, 30);
    }

    #[test]
    fn test_zero_damage_keeps_shield() {
        let unit = unit_with_hp(100).with_statuses(vec![StatusEffect::Shield {
            remaining_charges: 1,
        }]);
        let result = apply_damage_with_shields(&unit, 0);
        assert_eq!(result.unit.status_effects.len(), 1);
    }

    #[test]
    fn test_empty_shield_lets_damage_through() {
        let unit = unit_with_hp(100).with_statuses(vec![StatusEffect::Shield {
            remaining_charges: 0,
        }]);
        let result = apply_damage_with_shields(&unit, 10);
        assert_eq!(result.actual_damage, 10);
        assert!(result.unit.status_effects.is_empty());
    }

    #[test]
    fn test_only_first_charged_shield_consumed() {
        let unit = unit_with_hp(100).with_statuses(vec![
            StatusEffect::Shield {
                remaining_charges: 2,
            },
            StatusEffect::Shield {
                remaining_charges: 1,
            },
        ]);
        let result = apply_damage_with_shields(&unit, 10);
        assert_eq!(
            result.unit.status_effects,
            vec![
                StatusEffect::Shield {
                    remaining_charges: 1
                },
                StatusEffect::Shield {
                    remaining_charges: 1
                },
            ]
        );
    }

    #[test]
    fn test_invulnerable_keeps_shield() {
        let unit = unit_with_hp(100).with_statuses(vec![
            StatusEffect::Invulnerable { duration: 1 },
            StatusEffect::Shield {
                remaining_charges: 1,
            },
        ]);
        let result = apply_damage_with_shields(&unit, 50);
        assert_eq!(result.actual_damage, 0);
        assert_eq!(result.unit.status_effects.len(), 2);
    }

    #[test]
    fn test_auto_revive() {
        let unit = unit_with_hp(100).with_statuses(vec![StatusEffect::AutoRevive {
            hp_percent: 0.25,
            uses_remaining: 1,
        }]);
        let result = apply_damage_with_shields(&unit, 100);
        assert!(result.auto_revived);
        assert_eq!(result.actual_damage, 100);
        assert_eq!(result.unit.current_hp, 25);
        assert!(result.unit.status_effects.is_empty());

        let spent = unit_with_hp(100).with_statuses(vec![StatusEffect::AutoRevive {
            hp_percent: 0.25,
            uses_remaining: 0,
        }]);
        let result = apply_damage_with_shields(&spent, 150);
        assert!(!result.auto_revived);
        assert!(result.unit.is_ko());
        assert_eq!(result.actual_damage, 150);
        assert_eq!(result.unit.battle_stats.damage_taken, 150);
    }

    #[test]
    fn test_overkill_reports_nominal_damage() {
        let unit = unit_with_hp(100).with_hp(40);
        let result = apply_damage_with_shields(&unit, 150);
        assert_eq!(result.actual_damage, 150);
        assert_eq!(result.unit.battle_stats.damage_taken, 150);
        assert_eq!(result.unit.current_hp, 0);
        assert!(!result.auto_revived);

        let direct = apply_damage(&unit, 150);
        assert_eq!(direct.current_hp, 0);
        assert_eq!(direct.battle_stats.damage_taken, 150);
    }

    #[test]
    fn test_auto_revive_zero_percent() {
        let unit = unit_with_hp(100).with_statuses(vec![StatusEffect::AutoRevive {
            hp_percent: 0.0,
            uses_remaining: 2,
        }]);
        let result = apply_damage_with_shields(&unit, 100);
        assert!(result.auto_revived);
        assert_eq!(result.unit.current_hp, 0);
        assert_eq!(
            result.unit.status_effects,
            vec![StatusEffect::AutoRevive {
                hp_percent: 0.0,
                uses_remaining: 1
            }]
        );
    }

    #[test]
    fn test_heal_amount() {
        let team = Team::default();
        let caster = attacker();
        let cure = ability("cure", AbilityType::Healing, 20, TargetKind::SingleAlly);
        assert_eq!(heal_amount(&caster, &team, &cure, 1.0), 45);
        let none = ability("none", AbilityType::Healing, 0, TargetKind::SingleAlly);
        assert_eq!(heal_amount(&caster, &team, &none, 1.0), 0);
    }

    #[test]
    fn test_apply_healing_errors() {
        let unit = unit_with_hp(100).with_hp(40);
        assert_eq!(apply_healing(&unit, 500).unwrap().current_hp, 100);
        assert_eq!(apply_healing(&unit, -1), Err(BattleError::NegativeHealing(-1)));
        let ko = unit.with_hp(0);
        assert!(matches!(
            apply_healing(&ko, 10),
            Err(BattleError::HealKnockedOut(_))
        ));
        assert_eq!(revive_unit(&ko).current_hp, 50);
    }
}
