//! Maps an ability's target rule to concrete units.

use crate::data::{Ability, AbilityType, TargetKind};
use crate::unit::Unit;

/// Resolve targets for `ability` cast by `caster`.
///
/// The caster's side is decided by membership in `player_units`. Single
/// rules take the first living candidate in list order; group rules take
/// every living candidate; `Caster` always yields the caster.
#[must_use]
pub fn resolve_targets<'a>(
    ability: &Ability,
    caster: &'a Unit,
    player_units: &'a [Unit],
    enemy_units: &'a [Unit],
) -> Vec<&'a Unit> {
    let caster_is_player = player_units.iter().any(|u| u.id == caster.id);
    let (allies, foes) = if caster_is_player {
        (player_units, enemy_units)
    } else {
        (enemy_units, player_units)
    };

    let living = |units: &'a [Unit]| units.iter().filter(|u| !u.is_ko());

    match ability.targets {
        TargetKind::SingleEnemy => living(foes).take(1).collect(),
        TargetKind::AllEnemies => living(foes).collect(),
        TargetKind::SingleAlly => living(allies).take(1).collect(),
        TargetKind::AllAllies => living(allies).collect(),
        TargetKind::Caster => vec![caster],
    }
}

/// Drop knocked out targets from healing abilities that cannot revive.
///
/// Other ability types keep knocked out targets.
#[must_use]
pub fn filter_valid_targets<'a>(ability: &Ability, targets: Vec<&'a Unit>) -> Vec<&'a Unit> {
    if ability.ability_type == AbilityType::Healing && !ability.revives_fallen {
        targets.into_iter().filter(|u| !u.is_ko()).collect()
    } else {
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stats;
    use crate::test_support::{ability, unit_with_stats};

    fn side(prefix: &str) -> Vec<Unit> {
        (0..3)
            .map(|i| unit_with_stats(&format!("{prefix}{i}"), Stats::new(50, 0, 10, 10, 10, 10)))
            .collect()
    }

    fn ids(units: &[&Unit]) -> Vec<String> {
        units.iter().map(|u| u.id.clone()).collect()
    }

    #[test]
    fn test_single_enemy_first_living() {
        let players = side("p");
        let mut enemies = side("e");
        enemies[0] = enemies[0].with_hp(0);
        let strike = ability("strike", AbilityType::Physical, 10, TargetKind::SingleEnemy);
        let targets = resolve_targets(&strike, &players[0], &players, &enemies);
        assert_eq!(ids(&targets), vec!["e1"]);
    }

    #[test]
    fn test_enemy_caster_sides_flip() {
        let players = side("p");
        let enemies = side("e");
        let blast = ability("blast", AbilityType::Psynergy, 10, TargetKind::AllEnemies);
        let targets = resolve_targets(&blast, &enemies[1], &players, &enemies);
        assert_eq!(ids(&targets), vec!["p0", "p1", "p2"]);
    }

    #[test]
    fn test_self_even_when_ko() {
        let players = side("p");
        let enemies = side("e");
        let ko = players[2].with_hp(0);
        let guard = ability("guard", AbilityType::Buff, 0, TargetKind::Caster);
        let targets = resolve_targets(&guard, &ko, &players, &enemies);
        assert_eq!(ids(&targets), vec!["p2"]);
    }

    #[test]
    fn test_healing_filter() {
        let players = side("p");
        let ko = players[0].with_hp(0);
        let cure = ability("cure", AbilityType::Healing, 10, TargetKind::SingleAlly);
        assert!(filter_valid_targets(&cure, vec![&ko]).is_empty());

        let mut revive = cure.clone();
        revive.revives_fallen = true;
        assert_eq!(filter_valid_targets(&revive, vec![&ko]).len(), 1);

        let strike = ability("strike", AbilityType::Physical, 10, TargetKind::SingleEnemy);
        assert_eq!(filter_valid_targets(&strike, vec![&ko]).len(), 1);
    }
}
