//! Time-bounded status overlays shared by bosses and minions.

use std::time::Duration;

use spell_arena_core::Timestamp;

/// Interval between two damage-over-time ticks.
pub const DOT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// A ticking damage-over-time effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DotEffect {
    damage_per_tick: f32,
    end: Timestamp,
    interval: Duration,
    last_tick: Timestamp,
}

impl DotEffect {
    /// Damage applied at every tick.
    #[must_use]
    pub const fn damage_per_tick(&self) -> f32 {
        self.damage_per_tick
    }

    /// Timestamp after which the effect stops ticking.
    #[must_use]
    pub const fn end(&self) -> Timestamp {
        self.end
    }
}

/// Stun, pacify, and damage-over-time state of an entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusEffects {
    stunned_until: Option<Timestamp>,
    pacified_until: Option<Timestamp>,
    dots: Vec<DotEffect>,
}

/// Overlays that ended during [`StatusEffects::expire`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExpiredOverlays {
    /// The stun overlay ended.
    pub stun: bool,
    /// The pacify overlay ended.
    pub pacify: bool,
}

impl StatusEffects {
    /// Stuns until `duration` after `now`, replacing any earlier stun.
    pub fn stun(&mut self, duration: Duration, now: Timestamp) {
        self.stunned_until = Some(now.advanced_by(duration));
    }

    /// Pacifies until `duration` after `now`, replacing any earlier pacify.
    pub fn pacify(&mut self, duration: Duration, now: Timestamp) {
        self.pacified_until = Some(now.advanced_by(duration));
    }

    /// Reports whether the stun overlay is active at `now`.
    #[must_use]
    pub fn is_stunned(&self, now: Timestamp) -> bool {
        self.stunned_until.map_or(false, |until| now < until)
    }

    /// Reports whether the pacify overlay is active at `now`.
    #[must_use]
    pub fn is_pacified(&self, now: Timestamp) -> bool {
        self.pacified_until.map_or(false, |until| now < until)
    }

    /// Starts a damage-over-time effect.
    pub fn apply_dot(&mut self, damage_per_tick: f32, duration: Duration, now: Timestamp) {
        self.dots.push(DotEffect {
            damage_per_tick,
            end: now.advanced_by(duration),
            interval: DOT_TICK_INTERVAL,
            last_tick: now,
        });
    }

    /// Active damage-over-time effects.
    #[must_use]
    pub fn dots(&self) -> &[DotEffect] {
        &self.dots
    }

    /// Collects every tick that elapsed up to `now` and prunes finished effects.
    ///
    /// Ticks are aligned to the effect's start, so an effect lasting five
    /// seconds ticks exactly five times regardless of frame pacing.
    pub fn drain_dot_ticks(&mut self, now: Timestamp) -> Vec<f32> {
        let mut ticks = Vec::new();
        for dot in &mut self.dots {
            let horizon = now.min(dot.end);
            loop {
                let next = dot.last_tick.advanced_by(dot.interval);
                if next > horizon || dot.interval.is_zero() {
                    break;
                }
                ticks.push(dot.damage_per_tick);
                dot.last_tick = next;
            }
        }
        self.dots.retain(|dot| now < dot.end);
        ticks
    }

    /// Clears overlays whose window has passed.
    pub fn expire(&mut self, now: Timestamp) -> ExpiredOverlays {
        let mut expired = ExpiredOverlays::default();
        if self.stunned_until.map_or(false, |until| now >= until) {
            self.stunned_until = None;
            expired.stun = true;
        }
        if self.pacified_until.map_or(false, |until| now >= until) {
            self.pacified_until = None;
            expired.pacify = true;
        }
        expired
    }

    /// Drops every overlay and effect.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stun_is_a_pure_time_comparison() {
        let mut status = StatusEffects::default();
        status.stun(Duration::from_millis(5_000), Timestamp::from_millis(1_000));

        assert!(status.is_stunned(Timestamp::from_millis(5_999)));
        assert!(!status.is_stunned(Timestamp::from_millis(6_000)));
        assert!(!status.is_pacified(Timestamp::from_millis(2_000)));
    }

    #[test]
    fn dot_ticks_once_per_interval_until_expiry() {
        let mut status = StatusEffects::default();
        status.apply_dot(5.0, Duration::from_secs(10), Timestamp::ZERO);

        assert!(status.drain_dot_ticks(Timestamp::from_millis(999)).is_empty());
        assert_eq!(status.drain_dot_ticks(Timestamp::from_millis(1_000)), vec![5.0]);
        assert_eq!(status.drain_dot_ticks(Timestamp::from_millis(3_500)).len(), 2);

        let remaining = status.drain_dot_ticks(Timestamp::from_millis(60_000));
        assert_eq!(remaining.len(), 7);
        assert!(status.dots().is_empty());
    }

    #[test]
    fn expire_reports_cleared_overlays_once() {
        let mut status = StatusEffects::default();
        status.pacify(Duration::from_millis(100), Timestamp::ZERO);

        assert_eq!(status.expire(Timestamp::from_millis(50)), ExpiredOverlays::default());
        let expired = status.expire(Timestamp::from_millis(100));
        assert!(expired.pacify);
        assert!(!expired.stun);
        assert!(!status.expire(Timestamp::from_millis(200)).pacify);
    }
}
