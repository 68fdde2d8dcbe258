//! Minion state machine: patrol, chase, and path following.

use std::time::Duration;

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, UnitCircle};
use serde::Deserialize;
use spell_arena_core::{Appearance, EntityId, HealthPool, Timestamp};

use crate::combat::{Activity, Combatant, Fate, Lifecycle, MeleeGate};
use crate::navigation::NavigationGrid;
use crate::obstacles::ObstacleField;
use crate::status::StatusEffects;
use crate::{heading_yaw, planar};

/// Behaviour constants shared by every minion.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MinionTuning {
    /// Maximum health.
    pub max_health: f32,
    /// Contact damage.
    pub damage: f32,
    /// Ground speed in units per second.
    pub speed: f32,
    /// Collision radius.
    pub radius: f32,
    /// Reach of the contact attack.
    pub melee_range: f32,
    /// Minimum time between two contact attacks.
    pub melee_cooldown_ms: u64,
    /// Distance at which a minion notices the player.
    pub detection_range: f32,
    /// Time after which a cached path is recomputed.
    pub path_refresh_ms: u64,
    /// Distance at which a waypoint counts as reached.
    pub waypoint_reach: f32,
    /// Time after which a new patrol point is chosen.
    pub patrol_retarget_ms: u64,
    /// Distance at which the patrol point counts as reached.
    pub patrol_reach: f32,
    /// Nearest patrol point distance.
    pub patrol_min_distance: f32,
    /// Furthest patrol point distance.
    pub patrol_max_distance: f32,
    /// Walkable samples tried when choosing a patrol point.
    pub patrol_attempts: u32,
    /// Distance patrol points keep from the arena edge.
    pub arena_margin: f32,
    /// Largest accepted displacement after collision resolution.
    pub max_displacement: f32,
    /// Fraction of melee range at which a chasing minion stops closing in.
    pub approach_fraction: f32,
    /// Length of the death sequence.
    pub death_ms: u64,
    /// Height of the help marker above the minion.
    pub marker_height: f32,
    /// Length of the hit flash.
    pub hit_flash_ms: u64,
}

impl Default for MinionTuning {
    fn default() -> Self {
        Self {
            max_health: 15.0,
            damage: 5.0,
            speed: 2.0,
            radius: 0.5,
            melee_range: 2.0,
            melee_cooldown_ms: 1_000,
            detection_range: 10.0,
            path_refresh_ms: 3_000,
            waypoint_reach: 1.0,
            patrol_retarget_ms: 5_000,
            patrol_reach: 2.0,
            patrol_min_distance: 5.0,
            patrol_max_distance: 25.0,
            patrol_attempts: 10,
            arena_margin: 2.0,
            max_displacement: 3.0,
            approach_fraction: 0.75,
            death_ms: 500,
            marker_height: 5.0,
            hit_flash_ms: 200,
        }
    }
}

/// Movement mode of a minion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Behavior {
    /// Wandering between random walkable points.
    Patrol,
    /// Pursuing the player.
    Chase,
}

/// Shared spatial state a minion navigates through.
#[derive(Debug)]
pub struct NavContext<'a> {
    /// Obstacle field for collision and change detection.
    pub field: &'a ObstacleField,
    /// Grid used for pathfinding.
    pub grid: &'a mut NavigationGrid,
}

/// A minion guarding the next boss.
#[derive(Clone, Debug)]
pub struct Minion {
    id: EntityId,
    name: String,
    health: HealthPool,
    position: Vec3,
    facing: f32,
    behavior: Behavior,
    path: Option<Vec<Vec3>>,
    waypoint: usize,
    path_planned_at: Option<Timestamp>,
    path_generation: u64,
    patrol_target: Option<Vec3>,
    patrol_chosen_at: Option<Timestamp>,
    melee: MeleeGate,
    status: StatusEffects,
    lifecycle: Lifecycle,
    marker_visible: bool,
    appearance: Appearance,
    tuning: MinionTuning,
    rng: ChaCha8Rng,
    moving: bool,
    flash_until: Option<Timestamp>,
}

impl Minion {
    /// Creates a minion at `position`.
    #[must_use]
    pub fn spawn(
        id: EntityId,
        name: String,
        position: Vec3,
        appearance: Appearance,
        tuning: MinionTuning,
        seed: u64,
    ) -> Self {
        Self {
            id,
            name,
            health: HealthPool::full(tuning.max_health),
            position,
            facing: 0.0,
            behavior: Behavior::Patrol,
            path: None,
            waypoint: 0,
            path_planned_at: None,
            path_generation: 0,
            patrol_target: None,
            patrol_chosen_at: None,
            melee: MeleeGate::new(
                tuning.melee_range,
                tuning.damage,
                Duration::from_millis(tuning.melee_cooldown_ms),
            ),
            status: StatusEffects::default(),
            lifecycle: Lifecycle::Active,
            marker_visible: false,
            appearance,
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            moving: false,
            flash_until: None,
        }
    }

    /// Identifier of the minion.
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

    /// Radius used for hits and obstacle collision.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.tuning.radius
    }

    /// Current movement mode.
    #[must_use]
    pub const fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// Cached path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&[Vec3]> {
        self.path.as_deref()
    }

    /// Current patrol destination.
    #[must_use]
    pub const fn patrol_target(&self) -> Option<Vec3> {
        self.patrol_target
    }

    /// Visual description.
    #[must_use]
    pub const fn appearance(&self) -> &Appearance {
        &self.appearance
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

    /// Reports whether the minion has died.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.lifecycle.fate().is_some()
    }

    /// Reports whether the minion is stunned at `now`.
    #[must_use]
    pub fn is_stunned(&self, now: Timestamp) -> bool {
        self.status.is_stunned(now)
    }

    /// Reports whether the hit flash is showing at `now`.
    #[must_use]
    pub fn is_flashing(&self, now: Timestamp) -> bool {
        self.flash_until.map_or(false, |until| now < until)
    }

    /// Animation the minion should be playing at `now`.
    #[must_use]
    pub fn activity(&self, now: Timestamp) -> Activity {
        let striking = self.melee.last_attack().map_or(false, |at| {
            now.saturating_duration_since(at) < Duration::from_millis(500)
        });
        if striking {
            Activity::Attacking
        } else if self.moving {
            Activity::Walking
        } else {
            Activity::Idle
        }
    }

    /// Shows the help marker; returns `true` when it was hidden before.
    pub fn show_help_marker(&mut self) -> bool {
        if self.marker_visible || !self.lifecycle.is_active() {
            return false;
        }
        self.marker_visible = true;
        true
    }

    /// Position of the help marker while it is shown.
    #[must_use]
    pub fn marker_position(&self) -> Option<Vec3> {
        self.marker_visible
            .then(|| self.position + Vec3::Y * self.tuning.marker_height)
    }

    /// Drops the cached path so the next update plans a fresh one.
    pub fn invalidate_path(&mut self) {
        self.path = None;
        self.waypoint = 0;
        self.path_planned_at = None;
    }

    /// Advances behaviour and movement by one tick.
    pub fn update(&mut self, player: Vec3, nav: &mut NavContext<'_>, now: Timestamp, dt: Duration) {
        self.moving = false;
        if !self.lifecycle.is_active() {
            return;
        }

        for damage in self.status.drain_dot_ticks(now) {
            let _ = self.take_damage(damage, now);
            if !self.lifecycle.is_active() {
                return;
            }
        }
        let _ = self.status.expire(now);

        let distance = planar(player).distance(planar(self.position));
        let wanted = if distance <= self.tuning.detection_range {
            Behavior::Chase
        } else {
            Behavior::Patrol
        };
        if wanted != self.behavior {
            log::debug!("{} switched to {wanted:?} at distance {distance:.1}", self.name);
            self.behavior = wanted;
            self.invalidate_path();
            self.patrol_target = None;
        }

        if self.is_stunned(now) || nav.field.is_transforming() {
            return;
        }

        let target = match self.behavior {
            Behavior::Chase => {
                if distance <= self.tuning.melee_range * self.tuning.approach_fraction {
                    self.face(planar(player) - planar(self.position));
                    return;
                }
                player
            }
            Behavior::Patrol => self.patrol_destination(nav.grid, now),
        };

        self.move_towards(target, nav, now, dt);
    }

    fn patrol_destination(&mut self, grid: &NavigationGrid, now: Timestamp) -> Vec3 {
        let retarget = Duration::from_millis(self.tuning.patrol_retarget_ms);
        let stale = self
            .patrol_chosen_at
            .map_or(true, |at| now.saturating_duration_since(at) >= retarget);
        let reached = self.patrol_target.map_or(true, |target| {
            planar(target).distance(planar(self.position)) < self.tuning.patrol_reach
        });

        if let (Some(target), false, false) = (self.patrol_target, stale, reached) {
            return target;
        }

        let target = self.pick_patrol_point(grid);
        self.patrol_target = Some(target);
        self.patrol_chosen_at = Some(now);
        self.invalidate_path();
        target
    }

    fn pick_patrol_point(&mut self, grid: &NavigationGrid) -> Vec3 {
        let limit = grid.cell_size() * grid.width() as f32 / 2.0 - self.tuning.arena_margin;
        for _ in 0..self.tuning.patrol_attempts {
            let [x, z]: [f32; 2] = UnitCircle.sample(&mut self.rng);
            let reach = if self.tuning.patrol_max_distance > self.tuning.patrol_min_distance {
                self.rng
                    .gen_range(self.tuning.patrol_min_distance..self.tuning.patrol_max_distance)
            } else {
                self.tuning.patrol_min_distance
            };
            let candidate = Vec3::new(
                (self.position.x + x * reach).clamp(-limit, limit),
                0.0,
                (self.position.z + z * reach).clamp(-limit, limit),
            );
            if grid.is_position_walkable(candidate) {
                return candidate;
            }
        }
        self.position
    }

    fn move_towards(
        &mut self,
        target: Vec3,
        nav: &mut NavContext<'_>,
        now: Timestamp,
        dt: Duration,
    ) {
        if self.path_generation != nav.field.layout_generation() {
            self.invalidate_path();
        }

        let refresh = Duration::from_millis(self.tuning.path_refresh_ms);
        let due = self
            .path_planned_at
            .map_or(true, |at| now.saturating_duration_since(at) >= refresh);
        if self.path.is_none() || due {
            self.path = nav.grid.find_path(self.position, target);
            self.waypoint = usize::from(self.path.as_ref().map_or(false, |path| path.len() > 1));
            self.path_planned_at = Some(now);
            self.path_generation = nav.field.layout_generation();
            if self.path.is_none() {
                log::debug!("{} has no route to its target; moving directly", self.name);
            }
        }

        let steer = self.next_waypoint().unwrap_or(target);
        let offset = planar(steer) - planar(self.position);
        let Some(direction) = offset.try_normalize() else {
            return;
        };
        let step = (self.tuning.speed * dt.as_secs_f32()).min(offset.length());
        let candidate = self.position + Vec3::new(direction.x, 0.0, direction.y) * step;
        let outcome = nav.field.check_collision(candidate, self.tuning.radius);

        let displacement = planar(outcome.position).distance(planar(self.position));
        if outcome.overflowed || displacement > self.tuning.max_displacement {
            log::warn!(
                "{} discarded a {displacement:.2} unit collision correction; replanning",
                self.name
            );
            self.invalidate_path();
            return;
        }
        if outcome.collided {
            self.path = None;
        }

        self.position = nav.field.bounds().clamp(outcome.position, self.tuning.radius);
        self.face(direction);
        self.moving = true;
    }

    fn next_waypoint(&mut self) -> Option<Vec3> {
        let path = self.path.as_ref()?;
        while let Some(waypoint) = path.get(self.waypoint) {
            if planar(*waypoint).distance(planar(self.position)) >= self.tuning.waypoint_reach {
                return Some(*waypoint);
            }
            self.waypoint += 1;
        }
        self.path = None;
        None
    }

    fn face(&mut self, direction: Vec2) {
        if direction.length_squared() > f32::EPSILON {
            self.facing = heading_yaw(direction);
        }
    }

    /// Contact attack against the player, gated by the melee cooldown.
    pub fn try_melee(&mut self, player: Vec3, now: Timestamp) -> Option<f32> {
        if !self.lifecycle.is_active() || self.is_stunned(now) {
            return None;
        }
        self.melee.try_strike(self.position, player, now)
    }

    /// Progresses the death sequence; returns `true` when the minion detaches.
    pub fn advance_lifecycle(&mut self, now: Timestamp) -> bool {
        self.lifecycle.advance(now)
    }
}

impl Combatant for Minion {
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
        if self.health.is_depleted() {
            self.lifecycle =
                Lifecycle::depart(Fate::Slain, now, Duration::from_millis(self.tuning.death_ms));
            self.invalidate_path();
            self.marker_visible = false;
            self.status.clear();
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

    fn pacify(&mut self, _duration: Duration, _now: Timestamp) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::NavigationConfig;
    use crate::obstacles::{Obstacle, ObstacleConfig};
    use spell_arena_core::{ObstacleId, Rgb};

    fn minion_at(position: Vec3) -> Minion {
        Minion::spawn(
            EntityId::new(7),
            "Minion".to_owned(),
            position,
            Appearance::placeholder(Rgb::from_hex(0x336633)),
            MinionTuning::default(),
            42,
        )
    }

    fn open_world() -> (ObstacleField, NavigationGrid) {
        let field = ObstacleField::from_obstacles(
            ObstacleConfig::empty(100.0),
            0,
            Vec::new(),
            Timestamp::ZERO,
        );
        let grid = NavigationGrid::build(NavigationConfig::default(), &field);
        (field, grid)
    }

    fn run(
        minion: &mut Minion,
        player: Vec3,
        field: &ObstacleField,
        grid: &mut NavigationGrid,
        ticks: u64,
    ) {
        for tick in 1..=ticks {
            let now = Timestamp::from_millis(tick * 50);
            let mut nav = NavContext {
                field,
                grid: &mut *grid,
            };
            minion.update(player, &mut nav, now, Duration::from_millis(50));
        }
    }

    #[test]
    fn switches_to_chase_inside_detection_range() {
        let (field, mut grid) = open_world();
        let mut minion = minion_at(Vec3::new(0.0, 0.0, 8.0));

        run(&mut minion, Vec3::ZERO, &field, &mut grid, 1);
        assert_eq!(minion.behavior(), Behavior::Chase);

        run(&mut minion, Vec3::new(40.0, 0.0, -40.0), &field, &mut grid, 1);
        assert_eq!(minion.behavior(), Behavior::Patrol);
        assert!(minion.patrol_target().is_some());
    }

    #[test]
    fn chasing_minion_closes_distance_and_stops_in_melee_range() {
        let (field, mut grid) = open_world();
        let mut minion = minion_at(Vec3::new(6.0, 0.0, 6.0));

        run(&mut minion, Vec3::ZERO, &field, &mut grid, 200);

        let distance = planar(minion.position()).length();
        assert!(distance <= 1.5 + 1e-3);
        assert!(minion.try_melee(Vec3::ZERO, Timestamp::from_millis(20_000)).is_some());
    }

    #[test]
    fn chasing_minion_routes_around_a_wall() {
        let wall = Obstacle::hedge(
            ObstacleId::new(0),
            Vec2::new(0.0, 4.0),
            Vec2::new(4.0, 0.4),
            3.5,
            true,
        );
        let field = ObstacleField::from_obstacles(
            ObstacleConfig::empty(100.0),
            0,
            vec![wall],
            Timestamp::ZERO,
        );
        let mut grid = NavigationGrid::build(NavigationConfig::default(), &field);
        let mut minion = minion_at(Vec3::new(0.0, 0.0, 9.0));

        run(&mut minion, Vec3::ZERO, &field, &mut grid, 400);

        assert!(planar(minion.position()).length() <= 2.0);
    }

    #[test]
    fn movement_pauses_while_the_maze_shifts() {
        let hedge = Obstacle::hedge(
            ObstacleId::new(0),
            Vec2::new(30.0, 30.0),
            Vec2::new(4.0, 0.4),
            3.5,
            true,
        );
        let mut field = ObstacleField::from_obstacles(
            ObstacleConfig::empty(100.0),
            0,
            vec![hedge],
            Timestamp::ZERO,
        );
        let mut grid = NavigationGrid::build(NavigationConfig::default(), &field);
        assert!(field.toggle_hedge(ObstacleId::new(0), Timestamp::ZERO));
        let start = Vec3::new(0.0, 0.0, 8.0);
        let mut minion = minion_at(start);

        run(&mut minion, Vec3::ZERO, &field, &mut grid, 10);

        assert_eq!(minion.position(), start);
    }

    #[test]
    fn layout_change_invalidates_cached_path() {
        let hedge = Obstacle::hedge(
            ObstacleId::new(0),
            Vec2::new(30.0, 30.0),
            Vec2::new(4.0, 0.4),
            3.5,
            false,
        );
        let mut field = ObstacleField::from_obstacles(
            ObstacleConfig::empty(100.0),
            0,
            vec![hedge],
            Timestamp::ZERO,
        );
        let mut grid = NavigationGrid::build(NavigationConfig::default(), &field);
        let mut minion = minion_at(Vec3::new(0.0, 0.0, 9.0));
        run(&mut minion, Vec3::ZERO, &field, &mut grid, 1);
        let generation = minion.path_generation;

        assert!(field.toggle_hedge(ObstacleId::new(0), Timestamp::ZERO));
        let _ = field.tick(Timestamp::from_millis(2_000));
        grid.rebuild(&field);
        let mut nav = NavContext {
            field: &field,
            grid: &mut grid,
        };
        minion.update(
            Vec3::ZERO,
            &mut nav,
            Timestamp::from_millis(2_050),
            Duration::from_millis(50),
        );

        assert_ne!(minion.path_generation, generation);
        assert_eq!(minion.path_generation, field.layout_generation());
    }

    #[test]
    fn death_starts_removal_and_hides_marker() {
        let mut minion = minion_at(Vec3::new(20.0, 0.0, 0.0));
        assert!(minion.show_help_marker());
        assert!(!minion.show_help_marker());
        assert_eq!(minion.marker_position(), Some(Vec3::new(20.0, 5.0, 0.0)));

        assert_eq!(minion.take_damage(40.0, Timestamp::ZERO), 15.0);

        assert!(minion.is_dead());
        assert_eq!(minion.marker_position(), None);
        assert!(!minion.pacify(Duration::from_secs(1), Timestamp::ZERO));
        assert!(minion.advance_lifecycle(Timestamp::from_millis(500)));
    }
}
