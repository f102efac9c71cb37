//! Creature stat and ability defaults
//!
//! Stand-in for a real creature authoring database. The [`StatSource`] trait
//! is the seam: the engine only ever asks "stats for this creature id", so
//! swapping in a data-driven source touches nothing else.
//!
//! The defaults key off an archetype inferred from the creature id prefix
//! (`mage_ember` is a Mage, `guardian_oak` a Guardian). Unknown ids get the
//! baseline warrior block - construction never fails on the catalog side.

use crate::combat::unit::{
    Ability, AbilityKind, Archetype, DamageType, EffectPayload, EffectSpec, StatBlock,
};

/// Source of creature stats and abilities
pub trait StatSource: Send + Sync {
    fn stats_for(&self, creature_id: &str) -> StatBlock;
    fn abilities_for(&self, creature_id: &str) -> Vec<Ability>;
}

/// Hardcoded archetype defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCatalog;

impl DefaultCatalog {
    fn archetype_of(creature_id: &str) -> Archetype {
        let id = creature_id.to_ascii_lowercase();
        if id.starts_with("archer") || id.starts_with("ranger") {
            Archetype::Archer
        } else if id.starts_with("mage") || id.starts_with("wizard") || id.starts_with("sorcer") {
            Archetype::Mage
        } else if id.starts_with("guardian") || id.starts_with("golem") {
            Archetype::Guardian
        } else if id.starts_with("cleric") || id.starts_with("priest") || id.starts_with("healer") {
            Archetype::Cleric
        } else {
            Archetype::Warrior
        }
    }
}

impl StatSource for DefaultCatalog {
    fn stats_for(&self, creature_id: &str) -> StatBlock {
        let archetype = Self::archetype_of(creature_id);
        match archetype {
            Archetype::Warrior => StatBlock {
                max_health: 120,
                movement_speed: 2.0,
                attack_range: 1,
                attack_damage: 12,
                armor: 5,
                attack_speed: 1.0,
                damage_type: DamageType::Physical,
                archetype,
            },
            Archetype::Archer => StatBlock {
                max_health: 80,
                movement_speed: 2.2,
                attack_range: 4,
                attack_damage: 10,
                armor: 2,
                attack_speed: 1.2,
                damage_type: DamageType::Physical,
                archetype,
            },
            Archetype::Mage => StatBlock {
                max_health: 70,
                movement_speed: 2.0,
                attack_range: 3,
                attack_damage: 14,
                armor: 1,
                attack_speed: 0.8,
                damage_type: DamageType::Magic,
                archetype,
            },
            Archetype::Guardian => StatBlock {
                max_health: 160,
                movement_speed: 1.6,
                attack_range: 1,
                attack_damage: 8,
                armor: 9,
                attack_speed: 0.7,
                damage_type: DamageType::Physical,
                archetype,
            },
            Archetype::Cleric => StatBlock {
                max_health: 90,
                movement_speed: 1.8,
                attack_range: 2,
                attack_damage: 6,
                armor: 3,
                attack_speed: 0.9,
                damage_type: DamageType::Magic,
                archetype,
            },
        }
    }

    fn abilities_for(&self, creature_id: &str) -> Vec<Ability> {
        match Self::archetype_of(creature_id) {
            Archetype::Warrior => vec![Ability {
                id: "rend".into(),
                name: "Rend".into(),
                kind: AbilityKind::Debuff,
                range: 1,
                cooldown_total: 360,
                cooldown_remaining: 0,
                damage: None,
                heal: None,
                radius: None,
                effect: Some(EffectSpec {
                    name: "rend".into(),
                    duration: 180,
                    payload: EffectPayload {
                        armor_penalty: 2,
                        damage_per_tick: 1,
                        ..Default::default()
                    },
                }),
            }],
            Archetype::Archer => vec![Ability {
                id: "piercing_shot".into(),
                name: "Piercing Shot".into(),
                kind: AbilityKind::SingleTarget,
                range: 5,
                cooldown_total: 300,
                cooldown_remaining: 0,
                damage: Some(18),
                heal: None,
                radius: None,
                effect: None,
            }],
            Archetype::Mage => vec![Ability {
                id: "fireball".into(),
                name: "Fireball".into(),
                kind: AbilityKind::Aoe,
                range: 3,
                cooldown_total: 300,
                cooldown_remaining: 0,
                damage: Some(20),
                heal: None,
                radius: Some(1),
                effect: None,
            }],
            Archetype::Guardian => vec![Ability {
                id: "stoneskin".into(),
                name: "Stoneskin".into(),
                kind: AbilityKind::Buff,
                range: 0,
                cooldown_total: 600,
                cooldown_remaining: 0,
                damage: None,
                heal: None,
                radius: None,
                effect: Some(EffectSpec {
                    name: "stoneskin".into(),
                    duration: 300,
                    payload: EffectPayload {
                        armor_bonus: 5,
                        ..Default::default()
                    },
                }),
            }],
            Archetype::Cleric => vec![Ability {
                id: "mending".into(),
                name: "Mending".into(),
                kind: AbilityKind::Heal,
                range: 3,
                cooldown_total: 240,
                cooldown_remaining: 0,
                damage: None,
                heal: Some(25),
                radius: None,
                effect: None,
            }],
        }
    }
}
