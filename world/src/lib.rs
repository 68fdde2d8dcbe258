#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Arena simulation entities: the obstacle field, its navigation grid, the
//! player, and the bosses and minions that hunt them.

pub mod boss;
pub mod combat;
pub mod minion;
pub mod navigation;
pub mod obstacles;
pub mod player;
pub mod status;

use glam::{Vec2, Vec3};

/// Square playable area centred on the world origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArenaBounds {
    size: f32,
}

impl ArenaBounds {
    /// Creates bounds for an arena with the provided side length.
    #[must_use]
    pub const fn new(size: f32) -> Self {
        Self { size }
    }

    /// Side length of the arena.
    #[must_use]
    pub const fn size(&self) -> f32 {
        self.size
    }

    /// Distance from the centre to every edge.
    #[must_use]
    pub fn half_extent(&self) -> f32 {
        self.size / 2.0
    }

    /// Clamps a position so a circle of `margin` stays inside the arena.
    #[must_use]
    pub fn clamp(&self, position: Vec3, margin: f32) -> Vec3 {
        let limit = (self.half_extent() - margin).max(0.0);
        Vec3::new(
            position.x.clamp(-limit, limit),
            position.y,
            position.z.clamp(-limit, limit),
        )
    }

    /// Reports whether a circle of `margin` around `position` lies inside the arena.
    #[must_use]
    pub fn contains(&self, position: Vec3, margin: f32) -> bool {
        let limit = self.half_extent() - margin;
        position.x.abs() <= limit && position.z.abs() <= limit
    }
}

/// Projects a world position onto the ground plane as `(x, z)`.
#[must_use]
pub fn planar(position: Vec3) -> Vec2 {
    Vec2::new(position.x, position.z)
}

/// Yaw that faces along a ground-plane direction, zero facing `+z`.
#[must_use]
pub fn heading_yaw(direction: Vec2) -> f32 {
    direction.x.atan2(direction.y)
}
