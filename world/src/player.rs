//! Player avatar: vitals, buffs, shield, and movement.

use std::time::Duration;

use glam::{Vec2, Vec3};
use serde::Deserialize;
use spell_arena_core::{HealthPool, Timestamp};

use crate::obstacles::ObstacleField;

/// Tunables for the player avatar.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Starting maximum health.
    pub max_health: f32,
    /// Starting maximum mana.
    pub max_mana: f32,
    /// Maximum health and mana in infinite mode.
    pub infinite_stat_pool: f32,
    /// Ground speed in units per second.
    pub speed: f32,
    /// Collision radius.
    pub radius: f32,
    /// Health regenerated per second as a fraction of maximum health.
    pub health_regen_fraction: f32,
    /// Mana regenerated per second.
    pub mana_regen_per_second: f32,
    /// Eye height used as the projectile origin.
    pub eye_height: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            max_mana: 100.0,
            infinite_stat_pool: 200.0,
            speed: 5.0,
            radius: 0.5,
            health_regen_fraction: 0.02,
            mana_regen_per_second: 5.0,
            eye_height: 1.6,
        }
    }
}

/// Timed shield that negates incoming damage.
///
/// The shield only gates damage taken by its owner; it never blocks the owner's
/// own actions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShieldEffect {
    active_until: Option<Timestamp>,
    visible: bool,
}

impl ShieldEffect {
    /// Raises the shield for `duration` starting at `now`.
    pub fn activate(&mut self, duration: Duration, now: Timestamp) {
        self.active_until = Some(now.advanced_by(duration));
        self.visible = true;
    }

    /// Reports whether damage should be applied at `now`.
    #[must_use]
    pub fn can_take_damage(&self, now: Timestamp) -> bool {
        self.active_until.map_or(true, |until| now >= until)
    }

    /// Reports whether the shield visual should be shown.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Time left before the shield drops.
    #[must_use]
    pub fn remaining(&self, now: Timestamp) -> Duration {
        self.active_until
            .map_or(Duration::ZERO, |until| until.saturating_duration_since(now))
    }

    /// Deactivates an expired shield; returns `true` when it dropped this call.
    pub fn update(&mut self, now: Timestamp) -> bool {
        if self.visible && self.can_take_damage(now) {
            self.visible = false;
            self.active_until = None;
            return true;
        }
        false
    }

    /// Drops the shield immediately.
    pub fn deactivate(&mut self) {
        *self = Self::default();
    }
}

/// Multiplier with an expiry.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TimedMultiplier {
    value: f32,
    until: Option<Timestamp>,
}

impl TimedMultiplier {
    const NEUTRAL: Self = Self {
        value: 1.0,
        until: None,
    };

    fn expire(&mut self, now: Timestamp) {
        if self.until.map_or(false, |until| now >= until) {
            *self = Self::NEUTRAL;
        }
    }
}

/// The player avatar.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    config: PlayerConfig,
    position: Vec3,
    health: HealthPool,
    mana: HealthPool,
    attack: TimedMultiplier,
    defense: TimedMultiplier,
    shield: ShieldEffect,
    regenerates_health: bool,
}

impl Player {
    /// Spawns a player at the arena centre with full vitals.
    #[must_use]
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            position: Vec3::ZERO,
            health: HealthPool::full(config.max_health),
            mana: HealthPool::full(config.max_mana),
            attack: TimedMultiplier::NEUTRAL,
            defense: TimedMultiplier::NEUTRAL,
            shield: ShieldEffect::default(),
            regenerates_health: true,
            config,
        }
    }

    /// Configuration used by the player.
    #[must_use]
    pub const fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Restores the spawn state with the provided stat pools.
    pub fn respawn(&mut self, max_health: f32, max_mana: f32, regenerates_health: bool) {
        self.position = Vec3::ZERO;
        self.health = HealthPool::full(max_health);
        self.mana = HealthPool::full(max_mana);
        self.attack = TimedMultiplier::NEUTRAL;
        self.defense = TimedMultiplier::NEUTRAL;
        self.shield.deactivate();
        self.regenerates_health = regenerates_health;
    }

    /// Ground position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Point projectiles are launched from.
    #[must_use]
    pub fn eye_position(&self) -> Vec3 {
        self.position + Vec3::Y * self.config.eye_height
    }

    /// Teleports the player.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Health pool.
    #[must_use]
    pub const fn health(&self) -> &HealthPool {
        &self.health
    }

    /// Mana pool.
    #[must_use]
    pub const fn mana(&self) -> &HealthPool {
        &self.mana
    }

    /// Shield state.
    #[must_use]
    pub const fn shield(&self) -> &ShieldEffect {
        &self.shield
    }

    /// Mutable shield state for spell casting.
    pub fn shield_mut(&mut self) -> &mut ShieldEffect {
        &mut self.shield
    }

    /// Outgoing damage multiplier.
    #[must_use]
    pub const fn attack_multiplier(&self) -> f32 {
        self.attack.value
    }

    /// Incoming damage multiplier.
    #[must_use]
    pub const fn defense_multiplier(&self) -> f32 {
        self.defense.value
    }

    /// Reports whether the player has died.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health.is_depleted()
    }

    /// Applies incoming damage and returns the health removed.
    ///
    /// An active shield negates the hit entirely.
    pub fn take_damage(&mut self, amount: f32, now: Timestamp) -> f32 {
        if !self.shield.can_take_damage(now) {
            return 0.0;
        }
        self.health.deplete(amount * self.defense.value)
    }

    /// Deducts mana; returns `false` without change when the pool is short.
    pub fn spend_mana(&mut self, cost: f32) -> bool {
        if self.mana.current() < cost {
            return false;
        }
        let _ = self.mana.deplete(cost);
        true
    }

    /// Restores health and returns the amount added.
    pub fn restore_health(&mut self, amount: f32) -> f32 {
        self.health.restore(amount)
    }

    /// Restores mana and returns the amount added.
    pub fn restore_mana(&mut self, amount: f32) -> f32 {
        self.mana.restore(amount)
    }

    /// Multiplies outgoing damage until `duration` elapses.
    pub fn grant_attack_boost(&mut self, multiplier: f32, duration: Duration, now: Timestamp) {
        self.attack = TimedMultiplier {
            value: multiplier,
            until: Some(now.advanced_by(duration)),
        };
    }

    /// Multiplies incoming damage until `duration` elapses.
    pub fn grant_defense_boost(&mut self, multiplier: f32, duration: Duration, now: Timestamp) {
        self.defense = TimedMultiplier {
            value: multiplier,
            until: Some(now.advanced_by(duration)),
        };
    }

    /// Raises both maxima and refills both pools.
    pub fn level_up(&mut self, health_gain: f32, mana_gain: f32) {
        self.health.extend_maximum(health_gain);
        self.mana.extend_maximum(mana_gain);
        self.health.refill();
        self.mana.refill();
    }

    /// Moves along `direction` for `dt`, resolving obstacles and arena walls.
    pub fn apply_movement(&mut self, direction: Vec2, dt: Duration, field: &ObstacleField) {
        let direction = direction.clamp_length_max(1.0);
        if direction == Vec2::ZERO {
            return;
        }
        let step = direction * self.config.speed * dt.as_secs_f32();
        let target = self.position + Vec3::new(step.x, 0.0, step.y);
        let outcome = field.check_collision(target, self.config.radius);
        let resolved = if outcome.overflowed {
            self.position
        } else {
            outcome.position
        };
        self.position = field.bounds().clamp(resolved, self.config.radius);
    }

    /// Expires buffs and the shield, then applies regeneration.
    ///
    /// Returns `true` when the shield dropped during this update.
    pub fn update(&mut self, dt: Duration, now: Timestamp) -> bool {
        let shield_dropped = self.shield.update(now);
        self.attack.expire(now);
        self.defense.expire(now);

        if self.is_dead() {
            return shield_dropped;
        }
        let seconds = dt.as_secs_f32();
        if self.regenerates_health {
            let _ = self
                .health
                .restore(self.health.maximum() * self.config.health_regen_fraction * seconds);
        }
        let _ = self.mana.restore(self.config.mana_regen_per_second * seconds);
        shield_dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacles::{Obstacle, ObstacleConfig};
    use spell_arena_core::ObstacleId;

    fn player() -> Player {
        Player::new(PlayerConfig::default())
    }

    #[test]
    fn shield_negates_damage_until_expiry() {
        let mut player = player();
        player
            .shield_mut()
            .activate(Duration::from_millis(3_000), Timestamp::ZERO);

        assert_eq!(player.take_damage(20.0, Timestamp::from_millis(500)), 0.0);
        assert_eq!(player.health().current(), 100.0);

        assert!(player.update(Duration::ZERO, Timestamp::from_millis(3_500)));
        assert!(!player.shield().is_visible());
        assert_eq!(player.take_damage(20.0, Timestamp::from_millis(3_500)), 20.0);
        assert_eq!(player.health().current(), 80.0);
    }

    #[test]
    fn defense_boost_scales_incoming_damage_and_expires() {
        let mut player = player();
        player.grant_defense_boost(0.5, Duration::from_secs(15), Timestamp::ZERO);

        assert_eq!(player.take_damage(20.0, Timestamp::from_millis(1_000)), 10.0);

        let _ = player.update(Duration::ZERO, Timestamp::from_millis(15_000));
        assert_eq!(player.defense_multiplier(), 1.0);
    }

    #[test]
    fn regeneration_respects_difficulty() {
        let mut player = player();
        let _ = player.take_damage(50.0, Timestamp::ZERO);
        assert!(player.spend_mana(40.0));

        let _ = player.update(Duration::from_secs(1), Timestamp::from_millis(1_000));
        assert!((player.health().current() - 52.0).abs() < 1e-4);
        assert!((player.mana().current() - 65.0).abs() < 1e-4);

        player.respawn(100.0, 100.0, false);
        let _ = player.take_damage(50.0, Timestamp::ZERO);
        let _ = player.update(Duration::from_secs(1), Timestamp::from_millis(1_000));
        assert_eq!(player.health().current(), 50.0);
    }

    #[test]
    fn spend_mana_refuses_overdraft() {
        let mut player = player();
        assert!(!player.spend_mana(150.0));
        assert_eq!(player.mana().current(), 100.0);
    }

    #[test]
    fn level_up_raises_maxima_and_refills() {
        let mut player = player();
        let _ = player.take_damage(60.0, Timestamp::ZERO);

        player.level_up(20.0, 20.0);

        assert_eq!(player.health().current(), 120.0);
        assert_eq!(player.mana().maximum(), 120.0);
    }

    #[test]
    fn movement_is_clamped_and_blocked() {
        let wall = Obstacle::hedge(
            ObstacleId::new(0),
            Vec2::new(0.0, 3.0),
            Vec2::new(5.0, 0.4),
            3.5,
            true,
        );
        let field = ObstacleField::from_obstacles(
            ObstacleConfig::empty(20.0),
            0,
            vec![wall],
            Timestamp::ZERO,
        );
        let mut player = player();

        for _ in 0..20 {
            player.apply_movement(Vec2::new(0.0, 1.0), Duration::from_millis(100), &field);
        }
        assert!(player.position().z <= 3.0 - 0.4 - 0.5 + 1e-4);

        for _ in 0..100 {
            player.apply_movement(Vec2::new(-1.0, 0.0), Duration::from_millis(100), &field);
        }
        assert!((player.position().x + 9.5).abs() < 1e-4);
    }
}
