//! Simulation clock values and finite-duration transitions.
//!
//! Every timer in the arena compares against a [`Timestamp`] that the session
//! advances once per tick. Nothing in the simulation reads the wall clock, so
//! tests drive time by constructing timestamps directly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Milliseconds elapsed since the start of a simulation session.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Timestamp marking the first instant of a session.
    pub const ZERO: Self = Self(0);

    /// Creates a timestamp from a millisecond count.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Millisecond count represented by the timestamp.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns the timestamp reached after `duration` elapses.
    #[must_use]
    pub fn advanced_by(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(duration)))
    }

    /// Duration elapsed since `earlier`, or zero when `earlier` lies in the future.
    #[must_use]
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

/// Converts a duration into whole milliseconds, saturating on overflow.
#[must_use]
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Interpolation curve applied to a transition's normalised progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Easing {
    /// Progress maps directly onto the output.
    #[default]
    Linear,
    /// Quadratic acceleration for the first half and deceleration for the second.
    EaseInOutQuad,
}

impl Easing {
    /// Applies the curve to a progress value in `[0, 1]`.
    #[must_use]
    pub fn apply(self, progress: f32) -> f32 {
        let p = progress.clamp(0.0, 1.0);
        match self {
            Self::Linear => p,
            Self::EaseInOutQuad => {
                if p < 0.5 {
                    2.0 * p * p
                } else {
                    let tail = -2.0 * p + 2.0;
                    1.0 - tail * tail / 2.0
                }
            }
        }
    }
}

/// Finite-duration interpolation between two scalar values.
///
/// Transitions are pure value objects: the simulation creates them when an
/// animated change begins and any observer samples them against the current
/// [`Timestamp`]. Removal sequences, hedge motion, and pickup fades all use
/// this type so their timing is independent from the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    start: Timestamp,
    duration: Duration,
    from: f32,
    to: f32,
    easing: Easing,
}

impl Transition {
    /// Creates a transition that begins at `start` and lasts `duration`.
    #[must_use]
    pub const fn new(
        start: Timestamp,
        duration: Duration,
        from: f32,
        to: f32,
        easing: Easing,
    ) -> Self {
        Self {
            start,
            duration,
            from,
            to,
            easing,
        }
    }

    /// Timestamp at which the transition began.
    #[must_use]
    pub const fn start(&self) -> Timestamp {
        self.start
    }

    /// Total length of the transition.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Value reported before the transition starts.
    #[must_use]
    pub const fn from_value(&self) -> f32 {
        self.from
    }

    /// Value reported once the transition completes.
    #[must_use]
    pub const fn to_value(&self) -> f32 {
        self.to
    }

    /// Timestamp at which the transition completes.
    #[must_use]
    pub fn end(&self) -> Timestamp {
        self.start.advanced_by(self.duration)
    }

    /// Linear progress in `[0, 1]` at `now`.
    #[must_use]
    pub fn progress(&self, now: Timestamp) -> f32 {
        let total = duration_millis(self.duration);
        if total == 0 {
            return 1.0;
        }
        let elapsed = duration_millis(now.saturating_duration_since(self.start)).min(total);
        elapsed as f32 / total as f32
    }

    /// Eased value at `now`.
    #[must_use]
    pub fn sample(&self, now: Timestamp) -> f32 {
        let eased = self.easing.apply(self.progress(now));
        self.from + (self.to - self.from) * eased
    }

    /// Reports whether the transition has reached its end value.
    #[must_use]
    pub fn is_complete(&self, now: Timestamp) -> bool {
        now >= self.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_in_out_quad_is_symmetric_around_midpoint() {
        let easing = Easing::EaseInOutQuad;
        assert_eq!(easing.apply(0.0), 0.0);
        assert!((easing.apply(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(easing.apply(1.0), 1.0);
        let quarter = easing.apply(0.25);
        let three_quarters = easing.apply(0.75);
        assert!((quarter + three_quarters - 1.0).abs() < 1e-6);
        assert!(quarter < 0.25);
    }

    #[test]
    fn transition_samples_from_start_to_end() {
        let transition = Transition::new(
            Timestamp::from_millis(1_000),
            Duration::from_millis(1_000),
            2.0,
            -4.0,
            Easing::Linear,
        );

        assert_eq!(transition.sample(Timestamp::ZERO), 2.0);
        assert!((transition.sample(Timestamp::from_millis(1_500)) + 1.0).abs() < 1e-6);
        assert_eq!(transition.sample(Timestamp::from_millis(5_000)), -4.0);
        assert!(!transition.is_complete(Timestamp::from_millis(1_999)));
        assert!(transition.is_complete(Timestamp::from_millis(2_000)));
    }

    #[test]
    fn zero_length_transition_is_immediately_complete() {
        let transition = Transition::new(
            Timestamp::from_millis(10),
            Duration::ZERO,
            0.0,
            1.0,
            Easing::EaseInOutQuad,
        );
        assert!(transition.is_complete(Timestamp::from_millis(10)));
        assert_eq!(transition.sample(Timestamp::from_millis(10)), 1.0);
    }

    #[test]
    fn duration_since_saturates_for_future_timestamps() {
        let earlier = Timestamp::from_millis(500);
        let later = earlier.advanced_by(Duration::from_millis(250));
        assert_eq!(later.saturating_duration_since(earlier), Duration::from_millis(250));
        assert_eq!(earlier.saturating_duration_since(later), Duration::ZERO);
    }
}
