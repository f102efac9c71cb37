//! Units, stat blocks, abilities, and status effects
//!
//! A [`Unit`] is one deployed creature. Units are never removed from a
//! match's list; death is a terminal status flip so event consumers can
//! still resolve ids after the fact.

use serde::{Deserialize, Serialize};

use crate::hex::{FracHex, HexCoord};

/// One of the two sides in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Challenger,
    Defender,
}

impl Side {
    pub fn opponent(&self) -> Self {
        match self {
            Side::Challenger => Side::Defender,
            Side::Defender => Side::Challenger,
        }
    }

    /// Stable label used in derived unit ids
    pub fn label(&self) -> &'static str {
        match self {
            Side::Challenger => "challenger",
            Side::Defender => "defender",
        }
    }
}

/// How damage interacts with armor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    #[default]
    Physical,
    /// Halves effective armor
    Magic,
    /// Ignores armor entirely
    True,
}

/// Broad combat role, used by the stat catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    #[default]
    Warrior,
    Archer,
    Mage,
    Guardian,
    Cleric,
}

/// Combat stats for one unit
///
/// Currently seeded from hardcoded archetype defaults; the catalog seam
/// exists so a real authoring database can replace them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    pub max_health: i32,
    /// Hexes per second
    pub movement_speed: f32,
    /// Hexes
    pub attack_range: u32,
    pub attack_damage: i32,
    pub armor: i32,
    /// Attacks per second
    pub attack_speed: f32,
    pub damage_type: DamageType,
    pub archetype: Archetype,
}

impl Default for StatBlock {
    fn default() -> Self {
        Self {
            max_health: 100,
            movement_speed: 2.0,
            attack_range: 1,
            attack_damage: 10,
            armor: 3,
            attack_speed: 1.0,
            damage_type: DamageType::Physical,
            archetype: Archetype::Warrior,
        }
    }
}

/// Ability categories, each with its own use-condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    SingleTarget,
    Aoe,
    Heal,
    Buff,
    Debuff,
}

/// Stat modifiers carried by a buff or debuff
///
/// Any combination may be present. Flat amounts stack additively across
/// effects; multipliers stack multiplicatively. Neutral values (0 and 1.0)
/// mean the field does nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectPayload {
    /// Flat armor added while the buff is active
    pub armor_bonus: i32,
    /// Flat armor subtracted while the debuff is active
    pub armor_penalty: i32,
    /// Outgoing damage multiplier (attacker buffs)
    pub damage_multiplier: f32,
    /// Incoming damage multiplier (target debuffs; >1.0 amplifies)
    pub damage_reduction: f32,
    /// Damage applied once per tick
    pub damage_per_tick: i32,
    /// Healing applied once per tick
    pub heal_per_tick: i32,
}

impl Default for EffectPayload {
    fn default() -> Self {
        Self {
            armor_bonus: 0,
            armor_penalty: 0,
            damage_multiplier: 1.0,
            damage_reduction: 1.0,
            damage_per_tick: 0,
            heal_per_tick: 0,
        }
    }
}

/// Template for the status effect an ability applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub name: String,
    /// Ticks the applied effect lasts
    pub duration: u32,
    pub payload: EffectPayload,
}

/// An active buff or debuff on a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub id: String,
    pub name: String,
    /// Unit that applied the effect; dead units stay resolvable so this
    /// never dangles
    pub source_id: String,
    pub applied_tick: u64,
    /// Decremented every tick; the effect is removed the tick this hits <= 0
    pub duration_remaining: i64,
    pub payload: EffectPayload,
}

impl StatusEffect {
    pub fn from_spec(spec: &EffectSpec, source_id: &str, tick: u64) -> Self {
        Self {
            id: format!("{}_{}_{}", source_id, spec.name, tick),
            name: spec.name.clone(),
            source_id: source_id.to_string(),
            applied_tick: tick,
            duration_remaining: spec.duration as i64,
            payload: spec.payload.clone(),
        }
    }
}

/// An ability belonging to one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    pub name: String,
    pub kind: AbilityKind,
    /// Hexes
    pub range: u32,
    /// Ticks between uses
    pub cooldown_total: u32,
    pub cooldown_remaining: u32,
    pub damage: Option<i32>,
    pub heal: Option<i32>,
    /// AOE radius in hexes
    pub radius: Option<u32>,
    pub effect: Option<EffectSpec>,
}

impl Ability {
    pub fn ready(&self) -> bool {
        self.cooldown_remaining == 0
    }
}

/// Life status; Dead is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Alive,
    Dead,
}

/// One deployed creature in a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique per match: `<side>_<creature>_<spawn ordinal>`
    pub id: String,
    /// Reference into the creature authoring data
    pub creature_id: String,
    pub side: Side,
    /// Fractional during sub-hex interpolation
    pub position: FracHex,
    pub health: i32,
    pub max_health: i32,
    pub status: UnitStatus,
    /// Degrees; cosmetic only
    pub facing: f32,
    /// Ticks until the next basic attack
    pub attack_cooldown: u32,
    pub stats: StatBlock,
    /// Weak reference: a unit id, re-resolved every tick if stale
    pub current_target: Option<String>,
    pub buffs: Vec<StatusEffect>,
    pub debuffs: Vec<StatusEffect>,
    pub abilities: Vec<Ability>,
}

impl Unit {
    pub fn new(
        id: String,
        creature_id: String,
        side: Side,
        position: HexCoord,
        stats: StatBlock,
        abilities: Vec<Ability>,
    ) -> Self {
        Self {
            id,
            creature_id,
            side,
            position: position.into(),
            health: stats.max_health,
            max_health: stats.max_health,
            status: UnitStatus::Alive,
            facing: 0.0,
            attack_cooldown: 0,
            stats,
            current_target: None,
            buffs: Vec::new(),
            debuffs: Vec::new(),
            abilities,
        }
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.status, UnitStatus::Alive)
    }

    /// Whole-hex position (rounded from the fractional coordinate)
    pub fn hex(&self) -> HexCoord {
        self.position.rounded()
    }

    /// Health as a fraction of max
    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0 {
            return 0.0;
        }
        self.health as f32 / self.max_health as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_unit(side: Side) -> Unit {
        Unit::new(
            format!("{}_warrior_0", side.label()),
            "warrior".into(),
            side,
            HexCoord::new(0, 0),
            StatBlock::default(),
            Vec::new(),
        )
    }

    #[test]
    fn test_unit_starts_at_full_health() {
        let unit = test_unit(Side::Challenger);
        assert_eq!(unit.health, unit.max_health);
        assert!(unit.is_alive());
    }

    #[test]
    fn test_health_fraction() {
        let mut unit = test_unit(Side::Challenger);
        unit.health = unit.max_health / 2;
        assert!((unit.health_fraction() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_side_opponent() {
        assert_eq!(Side::Challenger.opponent(), Side::Defender);
        assert_eq!(Side::Defender.opponent(), Side::Challenger);
    }

    #[test]
    fn test_effect_from_spec_carries_duration() {
        let spec = EffectSpec {
            name: "stoneskin".into(),
            duration: 300,
            payload: EffectPayload {
                armor_bonus: 5,
                ..Default::default()
            },
        };
        let effect = StatusEffect::from_spec(&spec, "defender_guardian_0", 42);
        assert_eq!(effect.duration_remaining, 300);
        assert_eq!(effect.applied_tick, 42);
        assert_eq!(effect.payload.armor_bonus, 5);
    }

    #[test]
    fn test_hex_rounds_fractional_position() {
        let mut unit = test_unit(Side::Defender);
        unit.position = crate::hex::FracHex::new(1.9, 0.05);
        assert_eq!(unit.hex(), HexCoord::new(2, 0));
    }
}
