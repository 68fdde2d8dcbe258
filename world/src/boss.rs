//! Boss state machine.

use std::time::Duration;

use glam::Vec3;
use serde::Deserialize;
use spell_arena_core::{Appearance, EntityId, HealthPool, SpellId, Timestamp};

use crate::combat::{Activity, Combatant, Fate, Lifecycle, MeleeGate, Projectile, ProjectileOwner};
use crate::obstacles::ObstacleField;
use crate::status::StatusEffects;
use crate::{heading_yaw, planar};

/// Ranged attack parameters of a spell-casting boss.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangedAttack {
    /// Minimum time between two casts.
    pub cooldown: Duration,
    /// Projectile speed in units per second.
    pub projectile_speed: f32,
    /// Damage dealt by a projectile.
    pub damage: f32,
}

/// Configuration record a boss is created from.
#[derive(Clone, Debug, PartialEq)]
pub struct BossConfig {
    /// Display name.
    pub name: String,
    /// Maximum health.
    pub max_health: f32,
    /// Contact damage.
    pub damage: f32,
    /// Ground speed in units per second.
    pub speed: f32,
    /// Bounding size of the body.
    pub size: Vec3,
    /// Spawn position.
    pub spawn: Vec3,
    /// Ranged attack, if the boss casts spells.
    pub ranged: Option<RangedAttack>,
    /// Spell unlocked when the boss is beaten.
    pub reward: Option<SpellId>,
    /// Health fraction at or below which the boss escapes instead of dying.
    pub escape_threshold: Option<f32>,
    /// Visual description.
    pub appearance: Appearance,
}

/// Behaviour constants shared by every boss.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    /// Reach of the contact attack.
    pub melee_range: f32,
    /// Minimum time between two contact attacks.
    pub melee_cooldown_ms: u64,
    /// Closest distance at which the boss casts.
    pub ranged_min_distance: f32,
    /// Furthest distance at which the boss casts.
    pub ranged_max_distance: f32,
    /// Distance a boss projectile travels before fizzling.
    pub projectile_range: f32,
    /// Distance from the player centre that counts as a projectile hit.
    pub projectile_hit_radius: f32,
    /// Speed multiplier for bosses that cast spells.
    pub caster_speed_factor: f32,
    /// Length of the death and escape sequences.
    pub departure_ms: u64,
    /// Length of the hit flash.
    pub hit_flash_ms: u64,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            melee_range: 3.0,
            melee_cooldown_ms: 1_000,
            ranged_min_distance: 4.0,
            ranged_max_distance: 30.0,
            projectile_range: 40.0,
            projectile_hit_radius: 0.8,
            caster_speed_factor: 0.6,
            departure_ms: 1_000,
            hit_flash_ms: 200,
        }
    }
}

/// A boss fighting in the arena.
#[derive(Clone, Debug, PartialEq)]
pub struct Boss {
    id: EntityId,
    name: String,
    health: HealthPool,
    position: Vec3,
    facing: f32,
    speed: f32,
    size: Vec3,
    melee: MeleeGate,
    ranged: Option<RangedAttack>,
    last_cast: Option<Timestamp>,
    projectiles: Vec<Projectile>,
    status: StatusEffects,
    lifecycle: Lifecycle,
    reward: Option<SpellId>,
    escape_threshold: Option<f32>,
    appearance: Appearance,
    tuning: BossTuning,
    flash_until: Option<Timestamp>,
    moving: bool,
}

impl Boss {
    /// Creates a boss from its configuration record.
    #[must_use]
    pub fn spawn(id: EntityId, config: BossConfig, tuning: BossTuning) -> Self {
        let speed = if config.ranged.is_some() {
            config.speed * tuning.caster_speed_factor
        } else {
            config.speed
        };
        Self {
            id,
            health: HealthPool::full(config.max_health),
            position: config.spawn,
            facing: 0.0,
            speed,
            size: config.size,
            melee: MeleeGate::new(
                tuning.melee_range,
                config.damage,
                Duration::from_millis(tuning.melee_cooldown_ms),
            ),
            ranged: config.ranged,
            last_cast: None,
            projectiles: Vec::new(),
            status: StatusEffects::default(),
            lifecycle: Lifecycle::Active,
            reward: config.reward,
            escape_threshold: config.escape_threshold,
            appearance: config.appearance,
            name: config.name,
            tuning,
            flash_until: None,
            moving: false,
        }
    }

    /// Identifier of the boss.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Health pool.
    #[must_use]
    pub const fn health_pool(&self) -> &HealthPool {
        &self.health
    }

    /// Ground position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Yaw in radians, zero facing `+z`.
    #[must_use]
    pub const fn facing(&self) -> f32 {
        self.facing
    }

    /// Bounding size of the body.
    #[must_use]
    pub const fn size(&self) -> Vec3 {
        self.size
    }

    /// Radius used for hits and obstacle collision.
    #[must_use]
    pub fn radius(&self) -> f32 {
        (self.size.x / 2.0).max(0.5)
    }

    /// Spell unlocked when the boss is beaten.
    #[must_use]
    pub const fn reward(&self) -> Option<SpellId> {
        self.reward
    }

    /// Visual description.
    #[must_use]
    pub const fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    /// Reports whether the boss can cast spells.
    #[must_use]
    pub const fn can_cast_spells(&self) -> bool {
        self.ranged.is_some()
    }

    /// Projectiles the boss has in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Status overlays.
    #[must_use]
    pub const fn status(&self) -> &StatusEffects {
        &self.status
    }

    /// Removal state.
    #[must_use]
    pub const fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Reports whether the boss was slain.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.lifecycle.fate() == Some(Fate::Slain)
    }

    /// Reports whether the boss escaped.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.lifecycle.fate() == Some(Fate::Escaped)
    }

    /// Reports whether the boss is stunned at `now`.
    #[must_use]
    pub fn is_stunned(&self, now: Timestamp) -> bool {
        self.status.is_stunned(now)
    }

    /// Reports whether the boss is pacified at `now`.
    #[must_use]
    pub fn is_pacified(&self, now: Timestamp) -> bool {
        self.status.is_pacified(now)
    }

    /// Reports whether the hit flash is showing at `now`.
    #[must_use]
    pub fn is_flashing(&self, now: Timestamp) -> bool {
        self.flash_until.map_or(false, |until| now < until)
    }

    /// Animation the boss should be playing at `now`.
    #[must_use]
    pub fn activity(&self, now: Timestamp) -> Activity {
        let recent = |at: Option<Timestamp>| {
            at.map_or(false, |at| now.saturating_duration_since(at) < Duration::from_millis(500))
        };
        if recent(self.melee.last_attack()) || recent(self.last_cast) {
            Activity::Attacking
        } else if self.moving {
            Activity::Walking
        } else {
            Activity::Idle
        }
    }

    /// Advances behaviour and projectiles by one tick.
    ///
    /// Returns the damage of every boss projectile that reached the player
    /// during the tick; those projectiles are despawned.
    pub fn update(
        &mut self,
        player: Vec3,
        field: &ObstacleField,
        now: Timestamp,
        dt: Duration,
    ) -> Vec<f32> {
        self.moving = false;
        if !self.lifecycle.is_active() {
            return Vec::new();
        }

        for damage in self.status.drain_dot_ticks(now) {
            let _ = self.take_damage(damage, now);
            if !self.lifecycle.is_active() {
                return Vec::new();
            }
        }
        let _ = self.status.expire(now);

        let to_player = planar(player) - planar(self.position);
        if to_player.length_squared() > f32::EPSILON {
            self.facing = heading_yaw(to_player);
        }

        if !self.is_stunned(now) && !self.is_pacified(now) {
            self.chase(player, field, dt);
            self.cast(player, now);
        }

        self.advance_projectiles(player, dt)
    }

    fn chase(&mut self, player: Vec3, field: &ObstacleField, dt: Duration) {
        let offset = planar(player) - planar(self.position);
        let distance = offset.length();
        if distance <= self.melee.range() * 0.8 {
            return;
        }
        let step = (self.speed * dt.as_secs_f32()).min(distance);
        let direction = offset / distance;
        let target = self.position + Vec3::new(direction.x, 0.0, direction.y) * step;
        let outcome = field.check_collision(target, self.radius());
        if outcome.overflowed {
            return;
        }
        self.position = field.bounds().clamp(outcome.position, self.radius());
        self.moving = true;
    }

    fn cast(&mut self, player: Vec3, now: Timestamp) {
        let Some(ranged) = self.ranged else {
            return;
        };
        let distance = planar(player).distance(planar(self.position));
        let tuning = &self.tuning;
        if distance < tuning.ranged_min_distance || distance > tuning.ranged_max_distance {
            return;
        }
        let ready = self
            .last_cast
            .map_or(true, |last| now.saturating_duration_since(last) >= ranged.cooldown);
        if !ready {
            return;
        }

        let origin = self.position + Vec3::Y * (self.size.y * 0.6);
        let aim = player + Vec3::Y - origin;
        self.projectiles.push(Projectile::launch(
            origin,
            aim,
            ranged.projectile_speed,
            ranged.damage,
            ProjectileOwner::Boss,
            self.tuning.projectile_range,
        ));
        self.last_cast = Some(now);
    }

    fn advance_projectiles(&mut self, player: Vec3, dt: Duration) -> Vec<f32> {
        let radius = self.tuning.projectile_hit_radius;
        let mut hits = Vec::new();
        self.projectiles.retain_mut(|projectile| {
            let in_range = projectile.advance(dt);
            if projectile.hits(player, radius) {
                hits.push(projectile.damage());
                return false;
            }
            in_range
        });
        hits
    }

    /// Contact attack against the player, gated by the melee cooldown.
    pub fn try_melee(&mut self, player: Vec3, now: Timestamp) -> Option<f32> {
        if !self.lifecycle.is_active() || self.is_stunned(now) || self.is_pacified(now) {
            return None;
        }
        self.melee.try_strike(self.position, player, now)
    }

    /// Progresses the removal sequence; returns `true` when the boss detaches.
    pub fn advance_lifecycle(&mut self, now: Timestamp) -> bool {
        self.lifecycle.advance(now)
    }

    fn depart(&mut self, fate: Fate, now: Timestamp) {
        let fade = Duration::from_millis(self.tuning.departure_ms);
        self.lifecycle = Lifecycle::depart(fate, now, fade);
        self.projectiles.clear();
        self.status.clear();
        match fate {
            Fate::Slain => log::info!("{} was slain", self.name),
            Fate::Escaped => log::info!(
                "{} escaped with {:.0} health",
                self.name,
                self.health.current()
            ),
        }
    }
}

impl Combatant for Boss {
    fn health(&self) -> f32 {
        self.health.current()
    }

    fn is_alive(&self) -> bool {
        self.lifecycle.is_active()
    }

    fn take_damage(&mut self, amount: f32, now: Timestamp) -> f32 {
        if !self.lifecycle.is_active() {
            return 0.0;
        }
        let applied = self.health.deplete(amount);
        self.flash_until = Some(now.advanced_by(Duration::from_millis(self.tuning.hit_flash_ms)));

        if let Some(threshold) = self.escape_threshold {
            if self.health.fraction() <= threshold {
                self.health.raise_to(1.0);
                self.depart(Fate::Escaped, now);
                return applied;
            }
        }
        if self.health.is_depleted() {
            self.depart(Fate::Slain, now);
        }
        applied
    }

    fn apply_dot(&mut self, damage_per_tick: f32, duration: Duration, now: Timestamp) {
        if self.lifecycle.is_active() {
            self.status.apply_dot(damage_per_tick, duration, now);
        }
    }

    fn stun(&mut self, duration: Duration, now: Timestamp) {
        if self.lifecycle.is_active() {
            self.status.stun(duration, now);
        }
    }

    fn pacify(&mut self, duration: Duration, now: Timestamp) -> bool {
        if !self.lifecycle.is_active() {
            return false;
        }
        self.status.pacify(duration, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacles::ObstacleConfig;
    use spell_arena_core::Rgb;

    fn config() -> BossConfig {
        BossConfig {
            name: "Warden".to_owned(),
            max_health: 1_000.0,
            damage: 40.0,
            speed: 2.0,
            size: Vec3::new(1.0, 2.0, 1.0),
            spawn: Vec3::new(0.0, 0.0, 20.0),
            ranged: None,
            reward: Some(SpellId::Incendio),
            escape_threshold: None,
            appearance: Appearance::placeholder(Rgb::from_hex(0x444444)),
        }
    }

    fn empty_field() -> ObstacleField {
        ObstacleField::from_obstacles(ObstacleConfig::empty(100.0), 0, Vec::new(), Timestamp::ZERO)
    }

    #[test]
    fn escape_threshold_defeats_instead_of_killing() {
        let mut boss = Boss::spawn(
            EntityId::new(1),
            BossConfig {
                escape_threshold: Some(0.5),
                ..config()
            },
            BossTuning::default(),
        );

        let _ = boss.take_damage(499.0, Timestamp::ZERO);
        assert!(boss.lifecycle().is_active());

        let _ = boss.take_damage(1.0, Timestamp::from_millis(10));
        assert!(boss.is_defeated());
        assert!(!boss.is_dead());
        assert_eq!(boss.health(), 500.0);
        assert_eq!(boss.take_damage(100.0, Timestamp::from_millis(20)), 0.0);
    }

    #[test]
    fn overkill_on_escaping_boss_keeps_one_health() {
        let mut boss = Boss::spawn(
            EntityId::new(1),
            BossConfig {
                escape_threshold: Some(0.5),
                ..config()
            },
            BossTuning::default(),
        );

        let _ = boss.take_damage(5_000.0, Timestamp::ZERO);

        assert!(boss.is_defeated());
        assert_eq!(boss.health(), 1.0);
    }

    #[test]
    fn lethal_damage_kills_and_clamps_to_zero() {
        let mut boss = Boss::spawn(EntityId::new(1), config(), BossTuning::default());

        let applied = boss.take_damage(1_500.0, Timestamp::ZERO);

        assert_eq!(applied, 1_000.0);
        assert!(boss.is_dead());
        assert_eq!(boss.health(), 0.0);
        assert!(!boss.advance_lifecycle(Timestamp::from_millis(999)));
        assert!(boss.advance_lifecycle(Timestamp::from_millis(1_000)));
    }

    #[test]
    fn stunned_boss_holds_position_but_keeps_facing_player() {
        let field = empty_field();
        let mut boss = Boss::spawn(EntityId::new(1), config(), BossTuning::default());
        boss.stun(Duration::from_secs(5), Timestamp::ZERO);
        let player = Vec3::new(10.0, 0.0, 20.0);

        let _ = boss.update(
            player,
            &field,
            Timestamp::from_millis(100),
            Duration::from_millis(100),
        );

        assert_eq!(boss.position(), Vec3::new(0.0, 0.0, 20.0));
        assert!((boss.facing() - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
        assert_eq!(boss.try_melee(Vec3::new(0.0, 0.0, 21.0), Timestamp::from_millis(100)), None);
    }

    #[test]
    fn boss_walks_toward_player() {
        let field = empty_field();
        let mut boss = Boss::spawn(EntityId::new(1), config(), BossTuning::default());

        let _ = boss.update(
            Vec3::ZERO,
            &field,
            Timestamp::from_millis(1_000),
            Duration::from_secs(1),
        );

        assert!((boss.position().z - 18.0).abs() < 1e-4);
        assert_eq!(boss.activity(Timestamp::from_millis(1_000)), Activity::Walking);
    }

    #[test]
    fn pacified_boss_cannot_strike() {
        let mut boss = Boss::spawn(EntityId::new(1), config(), BossTuning::default());
        let player = Vec3::new(0.0, 0.0, 19.0);
        assert!(boss.pacify(Duration::from_secs(10), Timestamp::ZERO));

        assert_eq!(boss.try_melee(player, Timestamp::from_millis(500)), None);
        assert_eq!(boss.try_melee(player, Timestamp::from_millis(10_000)), Some(40.0));
    }

    #[test]
    fn caster_fires_within_band_and_projectile_hits_player() {
        let field = empty_field();
        let mut boss = Boss::spawn(
            EntityId::new(1),
            BossConfig {
                ranged: Some(RangedAttack {
                    cooldown: Duration::from_millis(2_500),
                    projectile_speed: 8.0,
                    damage: 30.0,
                }),
                speed: 0.0,
                ..config()
            },
            BossTuning::default(),
        );
        let player = Vec3::new(0.0, 0.0, 10.0);

        let first = boss.update(player, &field, Timestamp::ZERO, Duration::from_millis(16));
        assert!(first.is_empty());
        assert_eq!(boss.projectiles().len(), 1);

        let mut hits = Vec::new();
        let mut now = Timestamp::ZERO;
        for _ in 0..100 {
            now = now.advanced_by(Duration::from_millis(20));
            hits.extend(boss.update(player, &field, now, Duration::from_millis(20)));
        }

        assert_eq!(hits, vec![30.0]);
        assert!(boss.projectiles().is_empty());
    }

    #[test]
    fn death_releases_projectiles() {
        let field = empty_field();
        let mut boss = Boss::spawn(
            EntityId::new(1),
            BossConfig {
                ranged: Some(RangedAttack {
                    cooldown: Duration::from_millis(2_500),
                    projectile_speed: 8.0,
                    damage: 30.0,
                }),
                ..config()
            },
            BossTuning::default(),
        );
        let _ = boss.update(
            Vec3::new(0.0, 0.0, 5.0),
            &field,
            Timestamp::ZERO,
            Duration::from_millis(16),
        );
        assert!(!boss.projectiles().is_empty());

        let _ = boss.take_damage(10_000.0, Timestamp::from_millis(20));

        assert!(boss.projectiles().is_empty());
    }

    #[test]
    fn dot_damage_ticks_through_update() {
        let field = empty_field();
        let mut boss = Boss::spawn(EntityId::new(1), config(), BossTuning::default());
        boss.apply_dot(5.0, Duration::from_secs(10), Timestamp::ZERO);

        let _ = boss.update(
            Vec3::ZERO,
            &field,
            Timestamp::from_millis(3_000),
            Duration::from_millis(16),
        );

        assert_eq!(boss.health(), 985.0);
    }
}
