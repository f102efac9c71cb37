//! Targeting and movement decisions
//!
//! Pure functions over the full unit list; no persistent AI state. Ties in
//! closest-enemy selection resolve by list order (first found wins) - an
//! inherited behavior that downstream replays depend on, so it stays.

use crate::combat::unit::{Side, Unit};
use crate::hex::{FracHex, HexCoord};

/// Living enemy with minimum hex distance to `unit`
pub fn find_closest_enemy<'a>(unit: &Unit, all_units: &'a [Unit]) -> Option<&'a Unit> {
    let mut best: Option<(&Unit, u32)> = None;
    for candidate in all_units {
        if candidate.side == unit.side || !candidate.is_alive() {
            continue;
        }
        let d = unit.hex().distance(&candidate.hex());
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((candidate, d)),
        }
    }
    best.map(|(u, _)| u)
}

pub fn in_attack_range(unit: &Unit, target: &Unit) -> bool {
    unit.hex().distance(&target.hex()) <= unit.stats.attack_range
}

pub fn in_ability_range(unit: &Unit, target: &Unit, range: u32) -> bool {
    unit.hex().distance(&target.hex()) <= range
}

/// Living units within `radius` of `center`, optionally restricted to one side
pub fn units_in_radius<'a>(
    center: HexCoord,
    radius: u32,
    all_units: &'a [Unit],
    side: Option<Side>,
) -> Vec<&'a Unit> {
    all_units
        .iter()
        .filter(|u| u.is_alive())
        .filter(|u| side.map_or(true, |s| u.side == s))
        .filter(|u| center.distance(&u.hex()) <= radius)
        .collect()
}

/// Living same-side units (excluding `unit` itself) at or below `threshold`
/// fraction of max health
pub fn low_hp_allies<'a>(unit: &Unit, all_units: &'a [Unit], threshold: f32) -> Vec<&'a Unit> {
    all_units
        .iter()
        .filter(|u| u.side == unit.side && u.id != unit.id && u.is_alive())
        .filter(|u| u.health_fraction() <= threshold)
        .collect()
}

/// Single next hex toward `to`: the axial delta normalized to unit length
/// and rounded. No multi-hex planning, no obstacle avoidance.
pub fn next_step_toward(from: HexCoord, to: HexCoord) -> HexCoord {
    let dist = from.distance(&to);
    if dist == 0 {
        return from;
    }
    let t = 1.0 / dist as f32;
    HexCoord::round(
        from.q as f32 + (to.q - from.q) as f32 * t,
        from.r as f32 + (to.r - from.r) as f32 * t,
    )
}

/// Facing angle in degrees via atan2 of the axial delta. Cosmetic only;
/// axial axes are not orthogonal so this is not a physical angle.
pub fn facing_degrees(from: FracHex, to: FracHex) -> f32 {
    (to.r - from.r).atan2(to.q - from.q).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::unit::{StatBlock, UnitStatus};

    fn unit_at(id: &str, side: Side, q: i32, r: i32) -> Unit {
        Unit::new(
            id.into(),
            "warrior".into(),
            side,
            HexCoord::new(q, r),
            StatBlock::default(),
            Vec::new(),
        )
    }

    #[test]
    fn test_closest_enemy_ignores_dead_and_allies() {
        let me = unit_at("me", Side::Challenger, 0, 0);
        let ally = unit_at("ally", Side::Challenger, 1, 0);
        let mut dead = unit_at("dead", Side::Defender, 1, 0);
        dead.status = UnitStatus::Dead;
        let far = unit_at("far", Side::Defender, 5, 0);

        let units = vec![me.clone(), ally, dead, far];
        let target = find_closest_enemy(&me, &units).expect("enemy");
        assert_eq!(target.id, "far");
    }

    #[test]
    fn test_closest_enemy_tie_goes_to_list_order() {
        let me = unit_at("me", Side::Challenger, 0, 0);
        let first = unit_at("first", Side::Defender, 1, 0);
        let second = unit_at("second", Side::Defender, 0, 1);

        let units = vec![me.clone(), first, second];
        let target = find_closest_enemy(&me, &units).expect("enemy");
        assert_eq!(target.id, "first");
    }

    #[test]
    fn test_no_living_enemies_yields_none() {
        let me = unit_at("me", Side::Challenger, 0, 0);
        let units = vec![me.clone(), unit_at("ally", Side::Challenger, 1, 0)];
        assert!(find_closest_enemy(&me, &units).is_none());
    }

    #[test]
    fn test_attack_range_uses_stat() {
        let mut me = unit_at("me", Side::Challenger, 0, 0);
        me.stats.attack_range = 2;
        let near = unit_at("near", Side::Defender, 2, 0);
        let far = unit_at("far", Side::Defender, 3, 0);
        assert!(in_attack_range(&me, &near));
        assert!(!in_attack_range(&me, &far));
    }

    #[test]
    fn test_units_in_radius_with_side_filter() {
        let center = HexCoord::new(0, 0);
        let units = vec![
            unit_at("c1", Side::Challenger, 0, 0),
            unit_at("d1", Side::Defender, 1, 0),
            unit_at("d2", Side::Defender, 0, 1),
            unit_at("d3", Side::Defender, 4, 0),
        ];
        let enemies = units_in_radius(center, 1, &units, Some(Side::Defender));
        assert_eq!(enemies.len(), 2);
        let everyone = units_in_radius(center, 1, &units, None);
        assert_eq!(everyone.len(), 3);
    }

    #[test]
    fn test_low_hp_allies_excludes_self() {
        let mut me = unit_at("me", Side::Challenger, 0, 0);
        me.health = 10;
        let mut hurt = unit_at("hurt", Side::Challenger, 1, 0);
        hurt.health = hurt.max_health / 4;
        let healthy = unit_at("fine", Side::Challenger, 2, 0);

        let units = vec![me.clone(), hurt, healthy];
        let low = low_hp_allies(&me, &units, 0.5);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, "hurt");
    }

    #[test]
    fn test_next_step_is_adjacent() {
        let from = HexCoord::new(0, 0);
        let to = HexCoord::new(4, -2);
        let step = next_step_toward(from, to);
        assert_eq!(from.distance(&step), 1);
        assert!(step.distance(&to) < from.distance(&to));
    }

    #[test]
    fn test_next_step_at_destination_stays_put() {
        let here = HexCoord::new(3, 3);
        assert_eq!(next_step_toward(here, here), here);
    }

    #[test]
    fn test_facing_east_is_zero_degrees() {
        let from = FracHex::new(0.0, 0.0);
        let to = FracHex::new(1.0, 0.0);
        assert!(facing_degrees(from, to).abs() < 0.01);
    }
}
