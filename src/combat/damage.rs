//! Damage and healing resolution
//!
//! Pure functions over unit records; no hidden state, safe to call across
//! matches concurrently. Randomness (variance and crit rolls) comes in
//! through the caller's RNG so tests and replays can pin the stream.

use rand::Rng;

use crate::combat::ai;
use crate::combat::unit::{Ability, AbilityKind, DamageType, Unit, UnitStatus};
use crate::core::config::EngineConfig;

/// Full damage computation breakdown, returned for observability and tests
#[derive(Debug, Clone, PartialEq)]
pub struct DamageBreakdown {
    pub base: i32,
    pub effective_armor: i32,
    /// After armor, before multipliers; never below 1
    pub raw: i32,
    pub multiplier: f32,
    pub variance: f32,
    pub crit: bool,
    pub damage_type: DamageType,
    pub final_damage: i32,
}

/// Compute attack or ability damage from attacker to target
///
/// `base_override` substitutes the attacker's attack damage (abilities pass
/// their own amount). `force_crit` pins the crit roll for deterministic
/// tests.
pub fn calculate_damage(
    attacker: &Unit,
    target: &Unit,
    base_override: Option<i32>,
    force_crit: Option<bool>,
    config: &EngineConfig,
    rng: &mut impl Rng,
) -> DamageBreakdown {
    let base = base_override.unwrap_or(attacker.stats.attack_damage);

    // Armor: halved by magic, ignored by true damage, then flat debuff
    // penalties (cumulative floor at 0), then flat buff bonuses.
    let mut armor = match attacker.stats.damage_type {
        DamageType::Physical => target.stats.armor,
        DamageType::Magic => target.stats.armor / 2,
        DamageType::True => 0,
    };
    let penalty: i32 = target.debuffs.iter().map(|e| e.payload.armor_penalty).sum();
    armor = (armor - penalty).max(0);
    let bonus: i32 = target.buffs.iter().map(|e| e.payload.armor_bonus).sum();
    armor += bonus;

    let raw = (base - armor).max(1);

    // Attacker buffs amplify, target debuffs modulate incoming damage.
    let mut multiplier: f32 = attacker
        .buffs
        .iter()
        .map(|e| e.payload.damage_multiplier)
        .product();
    multiplier *= target
        .debuffs
        .iter()
        .map(|e| e.payload.damage_reduction)
        .product::<f32>();

    let variance = rng.gen_range(1.0 - config.damage_variance..=1.0 + config.damage_variance);
    let crit = force_crit.unwrap_or_else(|| rng.gen_bool(config.crit_chance));

    let mut value = raw as f32 * multiplier * variance;
    if crit {
        value *= config.crit_multiplier;
    }

    DamageBreakdown {
        base,
        effective_armor: armor,
        raw,
        multiplier,
        variance,
        crit,
        damage_type: attacker.stats.damage_type,
        final_damage: (value.floor() as i32).max(1),
    }
}

/// Apply damage, clamping health at 0. Returns true when this application
/// killed the unit (exactly once; further damage to a dead unit is a no-op).
pub fn apply_damage(unit: &mut Unit, amount: i32) -> bool {
    if !unit.is_alive() {
        return false;
    }
    unit.health = (unit.health - amount.max(0)).max(0);
    if unit.health == 0 {
        unit.status = UnitStatus::Dead;
        return true;
    }
    false
}

/// Apply healing, clamping at max health. Returns the amount actually
/// restored (may be less than requested, 0 for dead units).
pub fn apply_healing(unit: &mut Unit, amount: i32) -> i32 {
    if !unit.is_alive() {
        return 0;
    }
    let before = unit.health;
    unit.health = (unit.health + amount.max(0)).min(unit.max_health);
    unit.health - before
}

/// One tick of damage-over-time from all active debuffs in a single pass.
/// Returns (total applied, died).
pub fn apply_damage_over_time(unit: &mut Unit) -> (i32, bool) {
    let total: i32 = unit
        .debuffs
        .iter()
        .map(|e| e.payload.damage_per_tick.max(0))
        .sum();
    if total == 0 || !unit.is_alive() {
        return (0, false);
    }
    let died = apply_damage(unit, total);
    (total, died)
}

/// One tick of healing-over-time from all active buffs in a single pass.
/// Returns the total actually restored.
pub fn apply_healing_over_time(unit: &mut Unit) -> i32 {
    let total: i32 = unit
        .buffs
        .iter()
        .map(|e| e.payload.heal_per_tick.max(0))
        .sum();
    if total == 0 {
        return 0;
    }
    apply_healing(unit, total)
}

/// Minimum enemies in the blast radius before an AOE is worth casting
const AOE_MIN_TARGETS: usize = 3;

/// Low-HP threshold (fraction of max) for heal decisions
pub const HEAL_THRESHOLD: f32 = 0.5;

/// Pick the recipient for a heal: the caster first, else the first living
/// ally at or below the threshold within the ability's range.
pub fn heal_recipient<'a>(
    caster: &'a Unit,
    ability: &Ability,
    all_units: &'a [Unit],
) -> Option<&'a Unit> {
    if caster.health_fraction() <= HEAL_THRESHOLD {
        return Some(caster);
    }
    ai::low_hp_allies(caster, all_units, HEAL_THRESHOLD)
        .into_iter()
        .find(|ally| ai::in_ability_range(caster, ally, ability.range))
}

/// Decide whether an off-cooldown ability should fire this tick
///
/// The ability's target must exist and be in range. AOE additionally wants
/// a worthwhile cluster; heals trigger off low health on the caster or an
/// ally. Buffs, debuffs, and single-target nukes fire whenever legal.
pub fn should_use_ability(
    caster: &Unit,
    ability: &Ability,
    current_target: Option<&Unit>,
    all_units: &[Unit],
) -> bool {
    match ability.kind {
        AbilityKind::Heal => heal_recipient(caster, ability, all_units).is_some(),
        AbilityKind::Aoe => {
            let Some(target) = current_target.filter(|t| t.is_alive()) else {
                return false;
            };
            if !ai::in_ability_range(caster, target, ability.range) {
                return false;
            }
            let radius = ability.radius.unwrap_or(0);
            ai::units_in_radius(
                caster.hex(),
                radius,
                all_units,
                Some(caster.side.opponent()),
            )
            .len()
                >= AOE_MIN_TARGETS
        }
        AbilityKind::Buff => true,
        AbilityKind::SingleTarget | AbilityKind::Debuff => current_target
            .filter(|t| t.is_alive())
            .map(|t| ai::in_ability_range(caster, t, ability.range))
            .unwrap_or(false),
    }
}
