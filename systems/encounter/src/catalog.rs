//! Linear boss progression.

use std::time::Duration;

use glam::Vec3;
use spell_arena_core::{Appearance, BodyPart, Rgb, SpellId};
use spell_arena_world::boss::{BossConfig, RangedAttack};

/// Ranged behaviour of a spell-casting boss.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CasterProfile {
    /// Minimum time between two casts in milliseconds.
    pub cooldown_ms: u64,
    /// Projectile speed in units per second.
    pub projectile_speed: f32,
}

/// Static description of a boss before difficulty scaling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BossBlueprint {
    /// Display name.
    pub name: &'static str,
    /// Base maximum health.
    pub max_health: f32,
    /// Ground speed before the caster penalty.
    pub speed: f32,
    /// Base contact and projectile damage.
    pub damage: f32,
    /// Bounding size of the body.
    pub size: Vec3,
    /// Spell unlocked when the boss is beaten.
    pub reward: Option<SpellId>,
    /// Health fraction at which the boss escapes.
    pub escape_threshold: Option<f32>,
    /// Ranged attack, if any.
    pub caster: Option<CasterProfile>,
    /// Placeholder colour.
    pub color: Rgb,
    /// Model requested from the loader.
    pub model: &'static str,
    /// Uniform model scale.
    pub model_scale: f32,
    /// Robe colour override applied to the loaded model.
    pub model_color: Option<Rgb>,
}

impl BossBlueprint {
    /// Visual description shared by the boss and its minions.
    #[must_use]
    pub fn appearance(&self) -> Appearance {
        Appearance {
            model: Some(self.model.to_owned()),
            base_color: self.color,
            scale: self.model_scale,
            palette: self
                .model_color
                .map(|color| vec![(BodyPart::Robe, color)])
                .unwrap_or_default(),
        }
    }

    /// Builds a boss configuration scaled by `stat_multiplier`.
    ///
    /// Scaled health and damage are floored to whole numbers.
    #[must_use]
    pub fn to_config(&self, stat_multiplier: f32, spawn: Vec3) -> BossConfig {
        let damage = (self.damage * stat_multiplier).floor();
        BossConfig {
            name: self.name.to_owned(),
            max_health: (self.max_health * stat_multiplier).floor(),
            damage,
            speed: self.speed,
            size: self.size,
            spawn,
            ranged: self.caster.map(|caster| RangedAttack {
                cooldown: Duration::from_millis(caster.cooldown_ms),
                projectile_speed: caster.projectile_speed,
                damage,
            }),
            reward: self.reward,
            escape_threshold: self.escape_threshold,
            appearance: self.appearance(),
        }
    }
}

const WIZARD: &str = "models/AnimatedWizard.glb";
const WITCH: &str = "models/Witch.glb";

/// Bosses in the order the linear progression meets them.
pub static BOSS_CATALOG: [BossBlueprint; 7] = [
    BossBlueprint {
        name: "Quirrell",
        max_health: 200.0,
        speed: 1.0,
        damage: 10.0,
        size: Vec3::new(1.5, 3.0, 1.5),
        reward: Some(SpellId::Incendio),
        escape_threshold: None,
        caster: None,
        color: Rgb::from_hex(0x8b00ff),
        model: WIZARD,
        model_scale: 1.0,
        model_color: None,
    },
    BossBlueprint {
        name: "Basilisk",
        max_health: 300.0,
        speed: 1.8,
        damage: 15.0,
        size: Vec3::new(2.0, 2.0, 4.0),
        reward: None,
        escape_threshold: None,
        caster: None,
        color: Rgb::from_hex(0x00ff00),
        model: "models/Snake.glb",
        model_scale: 1.0,
        model_color: None,
    },
    BossBlueprint {
        name: "Dementor",
        max_health: 500.0,
        speed: 1.5,
        damage: 20.0,
        size: Vec3::new(0.8, 1.5, 0.8),
        reward: Some(SpellId::Stupefix),
        escape_threshold: None,
        caster: None,
        color: Rgb::from_hex(0x363535),
        model: "models/Ghost.glb",
        model_scale: 1.0,
        model_color: None,
    },
    BossBlueprint {
        name: "Voldemort",
        max_health: 1_500.0,
        speed: 1.5,
        damage: 75.0,
        size: Vec3::new(1.0, 2.2, 1.0),
        reward: None,
        escape_threshold: Some(0.5),
        caster: Some(CasterProfile {
            cooldown_ms: 2_500,
            projectile_speed: 8.0,
        }),
        color: Rgb::from_hex(0x000000),
        model: WIZARD,
        model_scale: 1.1,
        model_color: Some(Rgb::from_hex(0x0f0f0f)),
    },
    BossBlueprint {
        name: "Umbridge",
        max_health: 800.0,
        speed: 1.0,
        damage: 50.0,
        size: Vec3::new(1.0, 1.8, 1.0),
        reward: Some(SpellId::ProtegoMaxima),
        escape_threshold: None,
        caster: Some(CasterProfile {
            cooldown_ms: 2_000,
            projectile_speed: 7.0,
        }),
        color: Rgb::from_hex(0xff1493),
        model: WITCH,
        model_scale: 1.0,
        model_color: Some(Rgb::from_hex(0xff69b4)),
    },
    BossBlueprint {
        name: "Bellatrix",
        max_health: 1_000.0,
        speed: 1.8,
        damage: 70.0,
        size: Vec3::new(0.9, 1.9, 0.9),
        reward: Some(SpellId::Sectumsempra),
        escape_threshold: None,
        caster: Some(CasterProfile {
            cooldown_ms: 1_800,
            projectile_speed: 9.0,
        }),
        color: Rgb::from_hex(0x808080),
        model: WITCH,
        model_scale: 1.0,
        model_color: None,
    },
    BossBlueprint {
        name: "Voldemort (final)",
        max_health: 1_500.0,
        speed: 2.0,
        damage: 80.0,
        size: Vec3::new(1.2, 2.5, 1.2),
        reward: None,
        escape_threshold: None,
        caster: Some(CasterProfile {
            cooldown_ms: 1_500,
            projectile_speed: 10.0,
        }),
        color: Rgb::from_hex(0x2a2a2a),
        model: WIZARD,
        model_scale: 1.2,
        model_color: Some(Rgb::from_hex(0x3a3a3a)),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_scaling_floors_health_and_damage() {
        let config = BOSS_CATALOG[1].to_config(1.1, Vec3::ZERO);

        assert_eq!(config.max_health, 330.0);
        assert_eq!(config.damage, 16.0);
        assert!(config.ranged.is_none());
    }

    #[test]
    fn casters_shoot_with_their_contact_damage() {
        let config = BOSS_CATALOG[4].to_config(1.0, Vec3::ZERO);
        let ranged = config.ranged.expect("Umbridge casts");

        assert_eq!(ranged.cooldown, Duration::from_millis(2_000));
        assert_eq!(ranged.damage, 50.0);
        assert_eq!(config.reward, Some(SpellId::ProtegoMaxima));
        assert_eq!(
            config.appearance.palette,
            vec![(BodyPart::Robe, Rgb::from_hex(0xff69b4))]
        );
    }

    #[test]
    fn only_the_first_voldemort_escapes() {
        let escapers: Vec<&str> = BOSS_CATALOG
            .iter()
            .filter(|blueprint| blueprint.escape_threshold.is_some())
            .map(|blueprint| blueprint.name)
            .collect();

        assert_eq!(escapers, vec!["Voldemort"]);
    }
}
