//! Combat primitives shared by every entity in the arena.

use std::time::Duration;

use glam::Vec3;
use spell_arena_core::{Easing, SpellId, Timestamp, Transition};

use crate::planar;

/// Target of spell effects.
///
/// Bosses and minions implement this so hit resolution can apply damage,
/// damage over time, stuns, and pacify windows without knowing which kind of
/// entity it struck.
pub trait Combatant {
    /// Current health of the target.
    fn health(&self) -> f32;

    /// Reports whether the target still accepts effects.
    fn is_alive(&self) -> bool;

    /// Applies damage and returns the health actually removed.
    fn take_damage(&mut self, amount: f32, now: Timestamp) -> f32;

    /// Starts a damage-over-time effect.
    fn apply_dot(&mut self, damage_per_tick: f32, duration: Duration, now: Timestamp);

    /// Stuns the target.
    fn stun(&mut self, duration: Duration, now: Timestamp);

    /// Pacifies the target; returns `false` when the target cannot be pacified.
    fn pacify(&mut self, duration: Duration, now: Timestamp) -> bool;
}

/// Semantic animation an entity should be playing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Activity {
    /// Standing still.
    Idle,
    /// Moving across the arena.
    Walking,
    /// Recently attacked or cast.
    Attacking,
}

/// Rate limiter for contact attacks.
///
/// Damage is granted at most once per cooldown window, keyed on the timestamp
/// of the previous attack rather than on frame count.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeleeGate {
    range: f32,
    damage: f32,
    cooldown: Duration,
    last_attack: Option<Timestamp>,
}

impl MeleeGate {
    /// Creates a gate that has never attacked.
    #[must_use]
    pub const fn new(range: f32, damage: f32, cooldown: Duration) -> Self {
        Self {
            range,
            damage,
            cooldown,
            last_attack: None,
        }
    }

    /// Reach of the attack.
    #[must_use]
    pub const fn range(&self) -> f32 {
        self.range
    }

    /// Damage dealt per attack.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Timestamp of the last attack.
    #[must_use]
    pub const fn last_attack(&self) -> Option<Timestamp> {
        self.last_attack
    }

    /// Reports whether the cooldown window has passed.
    #[must_use]
    pub fn is_ready(&self, now: Timestamp) -> bool {
        self.last_attack
            .map_or(true, |last| now.saturating_duration_since(last) >= self.cooldown)
    }

    /// Attacks when `target` is in range and the cooldown allows it.
    pub fn try_strike(&mut self, attacker: Vec3, target: Vec3, now: Timestamp) -> Option<f32> {
        if planar(attacker).distance(planar(target)) > self.range || !self.is_ready(now) {
            return None;
        }
        self.last_attack = Some(now);
        Some(self.damage)
    }
}

/// Who fired a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectileOwner {
    /// Fired by the player with the carried spell.
    Player(SpellId),
    /// Fired by a boss.
    Boss,
}

/// Projectile travelling through the arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projectile {
    previous: Vec3,
    position: Vec3,
    velocity: Vec3,
    damage: f32,
    owner: ProjectileOwner,
    travelled: f32,
    max_range: f32,
}

impl Projectile {
    /// Launches a projectile from `origin` toward `direction`.
    #[must_use]
    pub fn launch(
        origin: Vec3,
        direction: Vec3,
        speed: f32,
        damage: f32,
        owner: ProjectileOwner,
        max_range: f32,
    ) -> Self {
        let heading = direction.try_normalize().unwrap_or(Vec3::Z);
        Self {
            previous: origin,
            position: origin,
            velocity: heading * speed,
            damage,
            owner,
            travelled: 0.0,
            max_range,
        }
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Position before the last step.
    #[must_use]
    pub const fn previous_position(&self) -> Vec3 {
        self.previous
    }

    /// Velocity in units per second.
    #[must_use]
    pub const fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Damage carried by the projectile.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Owner of the projectile.
    #[must_use]
    pub const fn owner(&self) -> ProjectileOwner {
        self.owner
    }

    /// Moves the projectile and reports whether it is still within range.
    pub fn advance(&mut self, dt: Duration) -> bool {
        let step = self.velocity * dt.as_secs_f32();
        self.previous = self.position;
        self.position += step;
        self.travelled += step.length();
        self.travelled <= self.max_range
    }

    /// Reports whether the last step passed within `radius` of `point`.
    #[must_use]
    pub fn hits(&self, point: Vec3, radius: f32) -> bool {
        self.contact(point, radius).is_some()
    }

    /// Point of the last step closest to `point`, if it came within `radius`.
    ///
    /// The whole segment from the previous position is swept so a long step
    /// cannot skip over a target.
    #[must_use]
    pub fn contact(&self, point: Vec3, radius: f32) -> Option<Vec3> {
        let start = planar(self.previous);
        let path = planar(self.position) - start;
        let length_squared = path.length_squared();
        let along = if length_squared > f32::EPSILON {
            ((planar(point) - start).dot(path) / length_squared).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if (start + path * along).distance(planar(point)) > radius {
            return None;
        }
        Some(self.previous.lerp(self.position, along))
    }
}

/// Why an entity is leaving the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fate {
    /// Health reached zero.
    Slain,
    /// Health crossed the escape threshold.
    Escaped,
}

/// Removal state of an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lifecycle {
    /// Taking part in the fight.
    Active,
    /// Playing its removal sequence; the transition runs from 1 to 0.
    Departing {
        /// Reason the entity is leaving.
        fate: Fate,
        /// Scale or opacity of the visual over the removal sequence.
        fade: Transition,
    },
    /// Detached from the simulation.
    Removed {
        /// Reason the entity left.
        fate: Fate,
    },
}

impl Lifecycle {
    /// Starts a removal sequence of `duration`.
    #[must_use]
    pub fn depart(fate: Fate, now: Timestamp, duration: Duration) -> Self {
        Self::Departing {
            fate,
            fade: Transition::new(now, duration, 1.0, 0.0, Easing::Linear),
        }
    }

    /// Reports whether the entity is still fighting.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Reports whether the entity has been detached.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }

    /// Fate of a departing or removed entity.
    #[must_use]
    pub const fn fate(&self) -> Option<Fate> {
        match self {
            Self::Active => None,
            Self::Departing { fate, .. } | Self::Removed { fate } => Some(*fate),
        }
    }

    /// Visual scale or opacity at `now`.
    #[must_use]
    pub fn presence(&self, now: Timestamp) -> f32 {
        match self {
            Self::Active => 1.0,
            Self::Departing { fade, .. } => fade.sample(now),
            Self::Removed { .. } => 0.0,
        }
    }

    /// Completes the removal sequence once its transition finished.
    ///
    /// Returns `true` on the call that detaches the entity.
    pub fn advance(&mut self, now: Timestamp) -> bool {
        if let Self::Departing { fate, fade } = *self {
            if fade.is_complete(now) {
                *self = Self::Removed { fate };
                return true;
            }
        }
        false
    }
}
