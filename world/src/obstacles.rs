//! Procedural obstacle field with periodically toggling hedges.
//!
//! The field owns every barrier volume in the arena. Hedges are long boxes
//! that the living maze raises and sinks on a timer; trees and rocks are
//! static circles. Collision queries, clearance checks for spawn sampling, and
//! navigation walkability all read from the same obstacle list so movers and
//! the navigation grid agree on what is solid.

use std::time::Duration;

use glam::{Vec2, Vec3};
use rand::{seq::index::sample, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, UnitCircle};
use serde::Deserialize;
use spell_arena_core::{Easing, ObstacleId, Timestamp, Transition};

use crate::{planar, ArenaBounds};

/// Tunables that shape obstacle generation and the living maze.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Side length of the square arena.
    pub arena_size: f32,
    /// Number of hedges the generator tries to place.
    pub hedge_attempts: u32,
    /// Rejection samples per hedge before it is skipped.
    pub hedge_samples: u32,
    /// Minimum distance of a hedge centre from the arena centre.
    pub hedge_min_distance: f32,
    /// Maximum distance of a hedge centre from the arena centre.
    pub hedge_max_distance: f32,
    /// Shortest hedge length.
    pub hedge_min_length: f32,
    /// Longest hedge length.
    pub hedge_max_length: f32,
    /// Hedge thickness.
    pub hedge_thickness: f32,
    /// Hedge height.
    pub hedge_height: f32,
    /// Minimum distance between two hedge centres.
    pub hedge_spacing: f32,
    /// Probability that a generated hedge starts raised.
    pub raised_ratio: f64,
    /// Number of tree placement attempts.
    pub tree_attempts: u32,
    /// Minimum tree distance from the arena centre.
    pub tree_min_distance: f32,
    /// Maximum tree distance from the arena centre.
    pub tree_max_distance: f32,
    /// Tree collision radius.
    pub tree_radius: f32,
    /// Fewest rock placement attempts.
    pub rock_min_attempts: u32,
    /// Most rock placement attempts.
    pub rock_max_attempts: u32,
    /// Minimum rock distance from the arena centre.
    pub rock_min_distance: f32,
    /// Maximum rock distance from the arena centre.
    pub rock_max_distance: f32,
    /// Smallest rock scale.
    pub rock_min_scale: f32,
    /// Largest rock scale.
    pub rock_max_scale: f32,
    /// Collision radius per unit of rock scale.
    pub rock_radius_factor: f32,
    /// Half extent of the spawn box kept free of decorations.
    pub spawn_clearance: f32,
    /// Minimum distance between a decoration and any other obstacle centre.
    pub decoration_spacing: f32,
    /// Time between living-maze changes.
    pub maze_interval_ms: u64,
    /// Length of a single hedge motion.
    pub maze_transition_ms: u64,
    /// Fewest hedges toggled per change.
    pub maze_min_toggles: u32,
    /// Most hedges toggled per change.
    pub maze_max_toggles: u32,
    /// Largest displacement a collision correction may apply.
    pub collision_cap: f32,
    /// Rejection samples for random spawn positions.
    pub spawn_attempts: u32,
    /// Clearance required around random spawn positions.
    pub spawn_margin: f32,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            arena_size: 100.0,
            hedge_attempts: 70,
            hedge_samples: 20,
            hedge_min_distance: 10.0,
            hedge_max_distance: 50.0,
            hedge_min_length: 8.0,
            hedge_max_length: 20.0,
            hedge_thickness: 0.8,
            hedge_height: 3.5,
            hedge_spacing: 5.0,
            raised_ratio: 0.8,
            tree_attempts: 20,
            tree_min_distance: 30.0,
            tree_max_distance: 48.0,
            tree_radius: 1.5,
            rock_min_attempts: 30,
            rock_max_attempts: 49,
            rock_min_distance: 25.0,
            rock_max_distance: 48.0,
            rock_min_scale: 0.8,
            rock_max_scale: 1.4,
            rock_radius_factor: 1.2,
            spawn_clearance: 6.0,
            decoration_spacing: 4.0,
            maze_interval_ms: 20_000,
            maze_transition_ms: 1_500,
            maze_min_toggles: 1,
            maze_max_toggles: 2,
            collision_cap: 5.0,
            spawn_attempts: 50,
            spawn_margin: 1.5,
        }
    }
}

impl ObstacleConfig {
    /// Configuration that produces an empty arena of the provided size.
    #[must_use]
    pub fn empty(arena_size: f32) -> Self {
        Self {
            arena_size,
            hedge_attempts: 0,
            tree_attempts: 0,
            rock_min_attempts: 0,
            rock_max_attempts: 0,
            ..Self::default()
        }
    }
}

/// Category of an obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    /// Hedge wall that the living maze can raise and sink.
    Hedge,
    /// Static tree trunk.
    Tree,
    /// Static boulder.
    Rock,
}

/// Ground-plane footprint of an obstacle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Footprint {
    /// Axis-aligned box.
    Box {
        /// Half extents along world `x` and `z`.
        half_extents: Vec2,
    },
    /// Circle.
    Circle {
        /// Radius of the circle.
        radius: f32,
    },
}

/// A single barrier volume.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    id: ObstacleId,
    kind: ObstacleKind,
    center: Vec2,
    footprint: Footprint,
    height: f32,
    raised: bool,
    colliding: bool,
    motion: Option<Transition>,
}

impl Obstacle {
    /// Creates a hedge centred on `center`.
    #[must_use]
    pub fn hedge(
        id: ObstacleId,
        center: Vec2,
        half_extents: Vec2,
        height: f32,
        raised: bool,
    ) -> Self {
        Self {
            id,
            kind: ObstacleKind::Hedge,
            center,
            footprint: Footprint::Box { half_extents },
            height,
            raised,
            colliding: raised,
            motion: None,
        }
    }

    /// Creates a tree trunk.
    #[must_use]
    pub fn tree(id: ObstacleId, center: Vec2, radius: f32) -> Self {
        Self::circle(id, ObstacleKind::Tree, center, radius)
    }

    /// Creates a rock.
    #[must_use]
    pub fn rock(id: ObstacleId, center: Vec2, radius: f32) -> Self {
        Self::circle(id, ObstacleKind::Rock, center, radius)
    }

    fn circle(id: ObstacleId, kind: ObstacleKind, center: Vec2, radius: f32) -> Self {
        Self {
            id,
            kind,
            center,
            footprint: Footprint::Circle { radius },
            height: radius * 2.0,
            raised: true,
            colliding: true,
            motion: None,
        }
    }

    /// Identifier of the obstacle.
    #[must_use]
    pub const fn id(&self) -> ObstacleId {
        self.id
    }

    /// Category of the obstacle.
    #[must_use]
    pub const fn kind(&self) -> ObstacleKind {
        self.kind
    }

    /// Centre in world `(x, z)`.
    #[must_use]
    pub const fn center(&self) -> Vec2 {
        self.center
    }

    /// Ground footprint.
    #[must_use]
    pub const fn footprint(&self) -> Footprint {
        self.footprint
    }

    /// Reports whether the obstacle is raised or rising.
    #[must_use]
    pub const fn is_raised(&self) -> bool {
        self.raised
    }

    /// Reports whether the obstacle currently belongs to the collision set.
    #[must_use]
    pub const fn is_colliding(&self) -> bool {
        self.colliding
    }

    /// Reports whether the obstacle is mid-motion.
    #[must_use]
    pub const fn is_animating(&self) -> bool {
        self.motion.is_some()
    }

    /// Motion currently applied to the obstacle.
    #[must_use]
    pub const fn motion(&self) -> Option<Transition> {
        self.motion
    }

    /// Vertical offset of the obstacle's centre at `now`.
    #[must_use]
    pub fn vertical_offset(&self, now: Timestamp) -> f32 {
        match self.motion {
            Some(motion) => motion.sample(now),
            None => self.rest_offset(self.raised),
        }
    }

    fn rest_offset(&self, raised: bool) -> f32 {
        if raised {
            self.height / 2.0
        } else {
            -self.height
        }
    }

    /// Reports whether a circle of `radius` around `point` touches the footprint.
    #[must_use]
    pub fn overlaps(&self, point: Vec2, radius: f32) -> bool {
        match self.footprint {
            Footprint::Box { half_extents } => {
                let delta = (point - self.center).abs();
                delta.x < half_extents.x + radius && delta.y < half_extents.y + radius
            }
            Footprint::Circle { radius: own } => point.distance(self.center) < own + radius,
        }
    }

    /// Point pushed out of the footprint, if the circle overlaps it.
    fn push_out(&self, point: Vec2, radius: f32) -> Option<Vec2> {
        match self.footprint {
            Footprint::Box { half_extents } => {
                let delta = point - self.center;
                let overlap = half_extents + Vec2::splat(radius) - delta.abs();
                if overlap.x <= 0.0 || overlap.y <= 0.0 {
                    return None;
                }
                let mut corrected = point;
                if overlap.x < overlap.y {
                    corrected.x += overlap.x * sign(delta.x);
                } else {
                    corrected.y += overlap.y * sign(delta.y);
                }
                Some(corrected)
            }
            Footprint::Circle { radius: own } => {
                let offset = point - self.center;
                let distance = offset.length();
                let minimum = own + radius;
                if distance >= minimum {
                    return None;
                }
                let direction = if distance < 0.01 {
                    Vec2::X
                } else {
                    offset / distance
                };
                Some(self.center + direction * minimum)
            }
        }
    }
}

fn sign(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Result of a collision query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionOutcome {
    /// Position after corrections, or the input when the cap was exceeded.
    pub position: Vec3,
    /// Reports whether any obstacle overlapped the query circle.
    pub collided: bool,
    /// Reports whether the correction was discarded for exceeding the cap.
    pub overflowed: bool,
}

/// Outcome of a rejection-sampled position request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    /// A candidate satisfied every constraint.
    Sampled(Vec3),
    /// The attempt budget ran out and a deterministic default was used.
    Fallback(Vec3),
}

impl Placement {
    /// Chosen position regardless of how it was found.
    #[must_use]
    pub const fn position(self) -> Vec3 {
        match self {
            Self::Sampled(position) | Self::Fallback(position) => position,
        }
    }

    /// Reports whether the fallback position was used.
    #[must_use]
    pub const fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Hedge motions that started or settled during a field tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MazeTick {
    /// Hedges that began raising or sinking.
    pub started: u32,
    /// Hedges whose motion completed.
    pub settled: u32,
}

/// Authoritative set of barrier volumes in the arena.
#[derive(Clone, Debug)]
pub struct ObstacleField {
    config: ObstacleConfig,
    bounds: ArenaBounds,
    obstacles: Vec<Obstacle>,
    rng: ChaCha8Rng,
    seed: u64,
    next_change_at: Timestamp,
    layout_generation: u64,
    next_id: u32,
}

impl ObstacleField {
    /// Generates a field deterministically from `seed`.
    #[must_use]
    pub fn generate(config: ObstacleConfig, seed: u64, now: Timestamp) -> Self {
        let mut field = Self::from_obstacles(config, seed, Vec::new(), now);
        field.populate();
        field
    }

    /// Builds a field around a caller-provided obstacle list.
    #[must_use]
    pub fn from_obstacles(
        config: ObstacleConfig,
        seed: u64,
        obstacles: Vec<Obstacle>,
        now: Timestamp,
    ) -> Self {
        let bounds = ArenaBounds::new(config.arena_size);
        let next_id = obstacles
            .iter()
            .map(|obstacle| obstacle.id().get().saturating_add(1))
            .max()
            .unwrap_or(0);
        let next_change_at = now.advanced_by(Duration::from_millis(config.maze_interval_ms));
        Self {
            config,
            bounds,
            obstacles,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            next_change_at,
            layout_generation: 0,
            next_id,
        }
    }

    /// Discards every obstacle and generates a new layout from a fresh seed.
    pub fn regenerate(&mut self, now: Timestamp) {
        let seed: u64 = self.rng.gen();
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.obstacles.clear();
        self.next_id = 0;
        self.next_change_at = now.advanced_by(Duration::from_millis(self.config.maze_interval_ms));
        self.populate();
        self.layout_generation = self.layout_generation.wrapping_add(1);
        log::info!(
            "obstacle field regenerated with seed {seed:#x}: {} obstacles",
            self.obstacles.len()
        );
    }

    /// Seed that produced the current layout.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Configuration used by the field.
    #[must_use]
    pub const fn config(&self) -> &ObstacleConfig {
        &self.config
    }

    /// Arena bounds enclosing the field.
    #[must_use]
    pub const fn bounds(&self) -> ArenaBounds {
        self.bounds
    }

    /// Every obstacle in the field.
    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Counter that changes whenever the collision set changes.
    #[must_use]
    pub const fn layout_generation(&self) -> u64 {
        self.layout_generation
    }

    /// Reports whether any hedge is mid-motion.
    #[must_use]
    pub fn is_transforming(&self) -> bool {
        self.obstacles.iter().any(Obstacle::is_animating)
    }

    /// Timestamp of the next living-maze change.
    #[must_use]
    pub const fn next_change_at(&self) -> Timestamp {
        self.next_change_at
    }

    /// Settles finished motions and runs the living maze when due.
    pub fn tick(&mut self, now: Timestamp) -> MazeTick {
        let mut report = MazeTick::default();

        for obstacle in &mut self.obstacles {
            let Some(motion) = obstacle.motion else {
                continue;
            };
            if !motion.is_complete(now) {
                continue;
            }
            obstacle.motion = None;
            report.settled += 1;
            if !obstacle.raised && obstacle.colliding {
                obstacle.colliding = false;
                self.layout_generation = self.layout_generation.wrapping_add(1);
            }
        }

        if now >= self.next_change_at {
            report.started = self.shift_maze(now);
            self.next_change_at =
                now.advanced_by(Duration::from_millis(self.config.maze_interval_ms));
        }

        report
    }

    fn shift_maze(&mut self, now: Timestamp) -> u32 {
        let idle: Vec<usize> = self
            .obstacles
            .iter()
            .enumerate()
            .filter(|(_, obstacle)| {
                obstacle.kind == ObstacleKind::Hedge && !obstacle.is_animating()
            })
            .map(|(index, _)| index)
            .collect();
        if idle.is_empty() {
            return 0;
        }

        let low = self.config.maze_min_toggles.max(1);
        let high = self.config.maze_max_toggles.max(low);
        let wanted = usize::try_from(self.rng.gen_range(low..=high)).unwrap_or(1);
        let amount = wanted.min(idle.len());

        let mut toggled = 0;
        for pick in sample(&mut self.rng, idle.len(), amount).into_iter() {
            let id = self.obstacles[idle[pick]].id;
            if self.toggle_hedge(id, now) {
                toggled += 1;
            }
        }
        log::debug!("living maze toggled {toggled} hedges");
        toggled
    }

    /// Starts raising a sunk hedge or sinking a raised one.
    ///
    /// A rising hedge joins the collision set immediately; a sinking hedge
    /// leaves it only once its motion completes. Returns `false` when the
    /// identifier does not name an idle hedge.
    pub fn toggle_hedge(&mut self, id: ObstacleId, now: Timestamp) -> bool {
        let duration = Duration::from_millis(self.config.maze_transition_ms);
        let Some(obstacle) = self
            .obstacles
            .iter_mut()
            .find(|obstacle| obstacle.id == id && obstacle.kind == ObstacleKind::Hedge)
        else {
            return false;
        };
        if obstacle.is_animating() {
            return false;
        }

        let from = obstacle.vertical_offset(now);
        obstacle.raised = !obstacle.raised;
        let to = obstacle.rest_offset(obstacle.raised);
        obstacle.motion = Some(Transition::new(now, duration, from, to, Easing::EaseInOutQuad));

        if obstacle.raised && !obstacle.colliding {
            obstacle.colliding = true;
            self.layout_generation = self.layout_generation.wrapping_add(1);
        }
        true
    }

    /// Resolves a mover circle against every colliding obstacle.
    ///
    /// The returned position is never further than the configured cap from
    /// `position`; an oversized correction is discarded and reported through
    /// [`CollisionOutcome::overflowed`].
    #[must_use]
    pub fn check_collision(&self, position: Vec3, radius: f32) -> CollisionOutcome {
        let original = planar(position);
        let mut corrected = original;
        let mut collided = false;

        for obstacle in self.obstacles.iter().filter(|obstacle| obstacle.colliding) {
            if let Some(pushed) = obstacle.push_out(corrected, radius) {
                corrected = pushed;
                collided = true;
            }
        }

        if collided && corrected.distance(original) > self.config.collision_cap {
            return CollisionOutcome {
                position,
                collided: true,
                overflowed: true,
            };
        }

        CollisionOutcome {
            position: Vec3::new(corrected.x, position.y, corrected.y),
            collided,
            overflowed: false,
        }
    }

    /// Reports whether a circle of `margin` around `position` is free of obstacles
    /// and inside the arena.
    #[must_use]
    pub fn is_position_clear(&self, position: Vec3, margin: f32) -> bool {
        self.bounds.contains(position, margin) && !self.blocks(planar(position), margin)
    }

    /// Reports whether any colliding obstacle touches a circle around `point`.
    #[must_use]
    pub fn blocks(&self, point: Vec2, margin: f32) -> bool {
        self.obstacles
            .iter()
            .any(|obstacle| obstacle.colliding && obstacle.overlaps(point, margin))
    }

    /// Samples an obstacle-free point in the annulus `[min, max)` around the centre.
    ///
    /// Draws come from `rng`, so callers sample on their own stream and never
    /// disturb the field's layout sequence.
    pub fn random_valid_position<R>(
        &self,
        rng: &mut R,
        min_distance: f32,
        max_distance: f32,
    ) -> Placement
    where
        R: Rng + ?Sized,
    {
        self.sample_position(rng, min_distance, max_distance, |_| true)
    }

    /// Samples a boss spawn point that also keeps `min_distance` from the player.
    pub fn random_boss_position<R>(
        &self,
        rng: &mut R,
        player: Vec3,
        min_distance: f32,
        max_distance: f32,
    ) -> Placement
    where
        R: Rng + ?Sized,
    {
        let player = planar(player);
        self.sample_position(rng, min_distance, max_distance, |candidate| {
            planar(candidate).distance(player) >= min_distance
        })
    }

    fn sample_position<R, F>(
        &self,
        rng: &mut R,
        min_distance: f32,
        max_distance: f32,
        accept: F,
    ) -> Placement
    where
        R: Rng + ?Sized,
        F: Fn(Vec3) -> bool,
    {
        let margin = self.config.spawn_margin;
        for _ in 0..self.config.spawn_attempts {
            let point = sample_annulus(rng, min_distance, max_distance);
            let candidate = Vec3::new(point.x, 0.0, point.y);
            if self.is_position_clear(candidate, margin) && accept(candidate) {
                return Placement::Sampled(candidate);
            }
        }
        log::warn!(
            "no clear position in annulus {min_distance}..{max_distance} after {} attempts; \
             using arena centre",
            self.config.spawn_attempts
        );
        Placement::Fallback(Vec3::ZERO)
    }

    fn allocate_id(&mut self) -> ObstacleId {
        let id = ObstacleId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn populate(&mut self) {
        self.place_hedges();
        self.place_trees();
        self.place_rocks();
    }

    fn place_hedges(&mut self) {
        let config = self.config.clone();
        let half = self.bounds.half_extent();

        for _ in 0..config.hedge_attempts {
            for _ in 0..config.hedge_samples {
                let center = sample_annulus(
                    &mut self.rng,
                    config.hedge_min_distance,
                    config.hedge_max_distance,
                );
                let length =
                    sample_range(&mut self.rng, config.hedge_min_length, config.hedge_max_length);
                let half_extents = if self.rng.gen_bool(0.5) {
                    Vec2::new(length / 2.0, config.hedge_thickness / 2.0)
                } else {
                    Vec2::new(config.hedge_thickness / 2.0, length / 2.0)
                };

                let extent = center.abs() + half_extents;
                if extent.x > half || extent.y > half {
                    continue;
                }
                let inner = center.abs() - half_extents;
                if inner.x < config.spawn_clearance && inner.y < config.spawn_clearance {
                    continue;
                }
                let crowded = self.obstacles.iter().any(|other| {
                    other.kind == ObstacleKind::Hedge
                        && other.center.distance(center) < config.hedge_spacing
                });
                if crowded {
                    continue;
                }

                let raised = self.rng.gen_bool(config.raised_ratio.clamp(0.0, 1.0));
                let id = self.allocate_id();
                self.obstacles
                    .push(Obstacle::hedge(id, center, half_extents, config.hedge_height, raised));
                break;
            }
        }
    }

    fn place_trees(&mut self) {
        let config = self.config.clone();
        for _ in 0..config.tree_attempts {
            let center =
                sample_annulus(&mut self.rng, config.tree_min_distance, config.tree_max_distance);
            if self.decoration_fits(center, config.tree_radius) {
                let id = self.allocate_id();
                self.obstacles.push(Obstacle::tree(id, center, config.tree_radius));
            }
        }
    }

    fn place_rocks(&mut self) {
        let config = self.config.clone();
        let attempts = if config.rock_max_attempts > config.rock_min_attempts {
            self.rng.gen_range(config.rock_min_attempts..=config.rock_max_attempts)
        } else {
            config.rock_min_attempts
        };
        for _ in 0..attempts {
            let center =
                sample_annulus(&mut self.rng, config.rock_min_distance, config.rock_max_distance);
            let scale = sample_range(&mut self.rng, config.rock_min_scale, config.rock_max_scale);
            let radius = scale * config.rock_radius_factor;
            if self.decoration_fits(center, radius) {
                let id = self.allocate_id();
                self.obstacles.push(Obstacle::rock(id, center, radius));
            }
        }
    }

    fn decoration_fits(&self, center: Vec2, radius: f32) -> bool {
        let clearance = self.config.spawn_clearance;
        if center.x.abs() < clearance && center.y.abs() < clearance {
            return false;
        }
        if !self.bounds.contains(Vec3::new(center.x, 0.0, center.y), radius) {
            return false;
        }
        self.obstacles.iter().all(|other| {
            other.center.distance(center) >= self.config.decoration_spacing
                && !other.overlaps(center, radius)
        })
    }
}

fn sample_annulus<R>(rng: &mut R, min_distance: f32, max_distance: f32) -> Vec2
where
    R: Rng + ?Sized,
{
    let [x, z]: [f32; 2] = UnitCircle.sample(rng);
    let distance = if max_distance > min_distance {
        rng.gen_range(min_distance..max_distance)
    } else {
        min_distance
    };
    Vec2::new(x, z) * distance
}

fn sample_range(rng: &mut ChaCha8Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_with(obstacles: Vec<Obstacle>) -> ObstacleField {
        ObstacleField::from_obstacles(ObstacleConfig::default(), 1, obstacles, Timestamp::ZERO)
    }

    fn wall(id: u32, center: Vec2, raised: bool) -> Obstacle {
        Obstacle::hedge(ObstacleId::new(id), center, Vec2::new(5.0, 0.4), 3.5, raised)
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let first = ObstacleField::generate(ObstacleConfig::default(), 99, Timestamp::ZERO);
        let second = ObstacleField::generate(ObstacleConfig::default(), 99, Timestamp::ZERO);
        let third = ObstacleField::generate(ObstacleConfig::default(), 100, Timestamp::ZERO);

        assert!(!first.obstacles().is_empty());
        assert_eq!(first.obstacles(), second.obstacles());
        assert_ne!(first.obstacles(), third.obstacles());
    }

    #[test]
    fn generated_layout_respects_spacing_and_spawn_area() {
        let field = ObstacleField::generate(ObstacleConfig::default(), 7, Timestamp::ZERO);
        let config = field.config().clone();
        let hedges: Vec<&Obstacle> = field
            .obstacles()
            .iter()
            .filter(|obstacle| obstacle.kind() == ObstacleKind::Hedge)
            .collect();

        for (index, hedge) in hedges.iter().enumerate() {
            assert!(hedge.center().length() >= config.hedge_min_distance - 1e-3);
            for other in &hedges[index + 1..] {
                assert!(hedge.center().distance(other.center()) >= config.hedge_spacing);
            }
        }

        for obstacle in field.obstacles() {
            if obstacle.kind() == ObstacleKind::Hedge {
                continue;
            }
            let center = obstacle.center();
            let clearance = config.spawn_clearance;
            assert!(!(center.x.abs() < clearance && center.y.abs() < clearance));
        }

        assert!(field.is_position_clear(Vec3::ZERO, 1.0));
    }

    #[test]
    fn box_collision_pushes_along_least_penetration_axis() {
        let field = field_with(vec![wall(0, Vec2::new(0.0, 10.0), true)]);

        let outcome = field.check_collision(Vec3::new(1.0, 0.0, 10.6), 0.5);

        assert!(outcome.collided);
        assert!(!outcome.overflowed);
        assert!((outcome.position.z - 10.9).abs() < 1e-4);
        assert!((outcome.position.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn circle_collision_pushes_radially() {
        let field = field_with(vec![Obstacle::tree(ObstacleId::new(0), Vec2::new(20.0, 0.0), 1.5)]);

        let outcome = field.check_collision(Vec3::new(19.0, 1.0, 0.0), 0.5);
        assert!(outcome.collided);
        assert!((outcome.position.x - 18.0).abs() < 1e-4);
        assert_eq!(outcome.position.y, 1.0);

        let centred = field.check_collision(Vec3::new(20.0, 0.0, 0.0), 0.5);
        assert!((centred.position.x - 22.0).abs() < 1e-4);
    }

    #[test]
    fn oversized_corrections_are_discarded() {
        let block = Obstacle::hedge(
            ObstacleId::new(0),
            Vec2::new(20.0, 20.0),
            Vec2::new(10.0, 10.0),
            3.5,
            true,
        );
        let field = field_with(vec![block]);
        let query = Vec3::new(20.0, 0.0, 20.0);

        let outcome = field.check_collision(query, 0.5);

        assert!(outcome.collided);
        assert!(outcome.overflowed);
        assert_eq!(outcome.position, query);
    }

    #[test]
    fn corrections_never_exceed_the_cap() {
        let field = ObstacleField::generate(ObstacleConfig::default(), 3, Timestamp::ZERO);
        let cap = field.config().collision_cap;
        for step in 0..400 {
            let x = -48.0 + (step % 20) as f32 * 4.8;
            let z = -48.0 + (step / 20) as f32 * 4.8;
            let query = Vec3::new(x, 0.0, z);
            let outcome = field.check_collision(query, 0.5);
            assert!(planar(outcome.position).distance(planar(query)) <= cap + 1e-4);
        }
    }

    #[test]
    fn sinking_hedge_stops_colliding_only_after_motion_completes() {
        let mut field = field_with(vec![wall(0, Vec2::new(0.0, 10.0), true)]);
        let point = Vec3::new(0.0, 0.0, 10.0);
        let start = Timestamp::from_millis(1_000);
        let generation = field.layout_generation();

        assert!(field.toggle_hedge(ObstacleId::new(0), start));
        assert!(field.is_transforming());

        let midway = Timestamp::from_millis(1_750);
        let _ = field.tick(midway);
        assert!(field.check_collision(point, 0.5).collided);
        assert!(field.obstacles()[0].is_colliding());
        assert_eq!(field.layout_generation(), generation);

        let done = Timestamp::from_millis(2_500);
        let report = field.tick(done);
        assert_eq!(report.settled, 1);
        assert!(!field.is_transforming());
        assert!(!field.check_collision(point, 0.5).collided);
        assert_ne!(field.layout_generation(), generation);
        assert_eq!(field.obstacles()[0].vertical_offset(done), -3.5);
    }

    #[test]
    fn rising_hedge_collides_immediately() {
        let mut field = field_with(vec![wall(0, Vec2::new(0.0, 10.0), false)]);
        let point = Vec3::new(0.0, 0.0, 10.0);
        assert!(!field.check_collision(point, 0.5).collided);

        assert!(field.toggle_hedge(ObstacleId::new(0), Timestamp::ZERO));

        assert!(field.check_collision(point, 0.5).collided);
        let offset = field.obstacles()[0].vertical_offset(Timestamp::from_millis(750));
        assert!(offset > -3.5 && offset < 1.75);
    }

    #[test]
    fn living_maze_toggles_one_or_two_hedges_on_schedule() {
        let mut field = field_with(vec![
            wall(0, Vec2::new(0.0, 10.0), true),
            wall(1, Vec2::new(0.0, -10.0), true),
            wall(2, Vec2::new(15.0, 20.0), false),
        ]);

        let early = field.tick(Timestamp::from_millis(19_999));
        assert_eq!(early.started, 0);
        assert!(!field.is_transforming());

        let due = field.tick(Timestamp::from_millis(20_000));
        assert!((1..=2).contains(&due.started));
        assert!(field.is_transforming());
        assert_eq!(field.next_change_at(), Timestamp::from_millis(40_000));
    }

    #[test]
    fn random_positions_fall_back_when_arena_is_blocked() {
        let cover = Obstacle::hedge(
            ObstacleId::new(0),
            Vec2::ZERO,
            Vec2::new(60.0, 60.0),
            3.5,
            true,
        );
        let field = field_with(vec![cover]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let placement = field.random_valid_position(&mut rng, 5.0, 20.0);

        assert_eq!(placement, Placement::Fallback(Vec3::ZERO));
    }

    #[test]
    fn boss_positions_keep_distance_from_player() {
        let field = field_with(Vec::new());
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let player = Vec3::new(10.0, 0.0, 0.0);
        for _ in 0..20 {
            let placement = field.random_boss_position(&mut rng, player, 15.0, 22.0);
            assert!(!placement.is_fallback());
            let position = placement.position();
            assert!(planar(position).distance(planar(player)) >= 15.0);
            assert!(planar(position).length() <= 22.0 + 1e-3);
        }
    }

    #[test]
    fn position_sampling_leaves_the_layout_stream_alone() {
        let config = ObstacleConfig::default();
        let mut sampled = ObstacleField::generate(config.clone(), 11, Timestamp::ZERO);
        let mut untouched = ObstacleField::generate(config, 11, Timestamp::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..10 {
            let _ = sampled.random_valid_position(&mut rng, 5.0, 20.0);
        }

        sampled.regenerate(Timestamp::from_millis(1_000));
        untouched.regenerate(Timestamp::from_millis(1_000));

        assert_eq!(sampled.seed(), untouched.seed());
        assert_eq!(sampled.obstacles(), untouched.obstacles());
    }

    #[test]
    fn regenerate_reseeds_and_bumps_generation() {
        let mut field = ObstacleField::generate(ObstacleConfig::default(), 11, Timestamp::ZERO);
        let seed = field.seed();
        let generation = field.layout_generation();

        field.regenerate(Timestamp::from_millis(5_000));

        assert_ne!(field.seed(), seed);
        assert_ne!(field.layout_generation(), generation);
        assert_eq!(field.next_change_at(), Timestamp::from_millis(25_000));
    }
}
