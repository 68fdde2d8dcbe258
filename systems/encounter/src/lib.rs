#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Encounter director: minion waves, boss transitions, rewards, and the
//! infinite cycle.

pub mod catalog;

use std::{f32::consts::TAU, time::Duration};

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use spell_arena_core::{Difficulty, EntityId, Event, Timestamp};
use spell_arena_system_spellcasting::SpellBook;
use spell_arena_world::{
    boss::{Boss, BossTuning},
    combat::Fate,
    minion::{Minion, MinionTuning, NavContext},
    navigation::NavigationGrid,
    obstacles::ObstacleField,
    planar,
    player::Player,
};

pub use catalog::{BossBlueprint, CasterProfile, BOSS_CATALOG};

const MINION_SCALE: f32 = 0.4;

/// Tunables of the encounter progression.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    /// Minions guarding each boss, by encounter index.
    pub minions_required: Vec<u32>,
    /// Wave size for encounters beyond the table.
    pub default_minions: u32,
    /// Half-extent of the square minions spawn in.
    pub minion_spawn_extent: f32,
    /// Minimum spacing between two minions of a wave.
    pub minion_spacing: f32,
    /// Minimum distance between a minion and the player.
    pub minion_player_distance: f32,
    /// Obstacle clearance required at a minion spawn point.
    pub minion_clearance: f32,
    /// Samples tried per minion before falling back.
    pub minion_spawn_attempts: u32,
    /// Radius of the fallback ring around the player.
    pub fallback_ring_radius: f32,
    /// Nearest boss spawn distance from the centre and the player.
    pub boss_min_distance: f32,
    /// Furthest boss spawn distance from the centre.
    pub boss_max_distance: f32,
    /// Maximum health granted per linear boss defeat.
    pub level_up_health: f32,
    /// Maximum mana granted per linear boss defeat.
    pub level_up_mana: f32,
    /// Pause between a defeat and the next encounter.
    pub advance_delay_ms: u64,
    /// Time after a wave spawns before help markers appear.
    pub help_timeout_ms: u64,
    /// Regenerate the obstacle field when advancing to the next encounter.
    pub regenerate_obstacles_on_advance: bool,
    /// Minion behaviour constants.
    pub minion: MinionTuning,
    /// Boss behaviour constants.
    pub boss: BossTuning,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            minions_required: vec![5, 7, 10, 12, 15, 17, 20],
            default_minions: 5,
            minion_spawn_extent: 45.0,
            minion_spacing: 20.0,
            minion_player_distance: 15.0,
            minion_clearance: 1.0,
            minion_spawn_attempts: 50,
            fallback_ring_radius: 30.0,
            boss_min_distance: 15.0,
            boss_max_distance: 22.0,
            level_up_health: 20.0,
            level_up_mana: 20.0,
            advance_delay_ms: 3_000,
            help_timeout_ms: 120_000,
            regenerate_obstacles_on_advance: true,
            minion: MinionTuning::default(),
            boss: BossTuning::default(),
        }
    }
}

/// Stage of the current encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncounterPhase {
    /// No encounter has started.
    Idle,
    /// Minions guard the boss.
    MinionWave,
    /// The boss is in the arena.
    BossFight,
    /// A boss fell; the next encounter starts at `resume_at`.
    Intermission {
        /// Timestamp at which the next encounter starts.
        resume_at: Timestamp,
    },
    /// The linear progression is complete.
    Victory,
}

/// Mutable world state the director drives.
#[derive(Debug)]
pub struct EncounterContext<'a> {
    /// Obstacle field, regenerated between encounters.
    pub field: &'a mut ObstacleField,
    /// Navigation grid rebuilt alongside the field.
    pub grid: &'a mut NavigationGrid,
    /// Player receiving rewards and level-ups.
    pub player: &'a mut Player,
    /// Spell book receiving reward spells.
    pub spells: &'a mut SpellBook,
}

/// Orchestrates encounter progression.
#[derive(Debug)]
pub struct Director {
    config: DirectorConfig,
    rng: ChaCha8Rng,
    difficulty: Difficulty,
    phase: EncounterPhase,
    encounter: usize,
    minions: Vec<Minion>,
    fallen: Vec<Minion>,
    boss: Option<Boss>,
    defeat_handled: bool,
    wave_started_at: Option<Timestamp>,
    help_shown: bool,
    wave_slain: u32,
    minions_slain: u32,
    bosses_defeated: u32,
    infinite_kills: u32,
    next_entity: u32,
}

impl Director {
    /// Creates an idle director drawing randomness from `seed`.
    #[must_use]
    pub fn new(config: DirectorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            difficulty: Difficulty::Normal,
            phase: EncounterPhase::Idle,
            encounter: 0,
            minions: Vec::new(),
            fallen: Vec::new(),
            boss: None,
            defeat_handled: false,
            wave_started_at: None,
            help_shown: false,
            wave_slain: 0,
            minions_slain: 0,
            bosses_defeated: 0,
            infinite_kills: 0,
            next_entity: 0,
        }
    }

    /// Configuration used by the director.
    #[must_use]
    pub const fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// Removes every entity and zeroes every counter.
    pub fn reset(&mut self) {
        self.phase = EncounterPhase::Idle;
        self.encounter = 0;
        self.minions.clear();
        self.fallen.clear();
        self.boss = None;
        self.defeat_handled = false;
        self.wave_started_at = None;
        self.help_shown = false;
        self.wave_slain = 0;
        self.minions_slain = 0;
        self.bosses_defeated = 0;
        self.infinite_kills = 0;
    }

    /// Difficulty applied to future bosses.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Sets the difficulty applied to future bosses.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    /// Stage of the current encounter.
    #[must_use]
    pub const fn phase(&self) -> EncounterPhase {
        self.phase
    }

    /// Reports whether the linear progression is complete.
    #[must_use]
    pub fn is_victorious(&self) -> bool {
        self.phase == EncounterPhase::Victory
    }

    /// Index of the current encounter; in infinite mode the catalog entry drawn.
    #[must_use]
    pub const fn encounter(&self) -> usize {
        self.encounter
    }

    /// Wave size guarding encounter `index`.
    #[must_use]
    pub fn minions_required(&self, index: usize) -> u32 {
        self.config
            .minions_required
            .get(index)
            .copied()
            .unwrap_or(self.config.default_minions)
    }

    /// Minions of the current wave that are still fighting.
    #[must_use]
    pub fn minions(&self) -> &[Minion] {
        &self.minions
    }

    /// Mutable access to the fighting minions.
    pub fn minions_mut(&mut self) -> &mut [Minion] {
        &mut self.minions
    }

    /// Minions playing their death sequence.
    #[must_use]
    pub fn fallen_minions(&self) -> &[Minion] {
        &self.fallen
    }

    /// Current boss, including one that is still departing.
    #[must_use]
    pub const fn boss(&self) -> Option<&Boss> {
        self.boss.as_ref()
    }

    /// Mutable access to the current boss.
    pub fn boss_mut(&mut self) -> Option<&mut Boss> {
        self.boss.as_mut()
    }

    /// Minions killed in the current wave.
    #[must_use]
    pub const fn wave_slain(&self) -> u32 {
        self.wave_slain
    }

    /// Minions killed across the run.
    #[must_use]
    pub const fn minions_slain(&self) -> u32 {
        self.minions_slain
    }

    /// Bosses beaten in the linear progression.
    #[must_use]
    pub const fn bosses_defeated(&self) -> u32 {
        self.bosses_defeated
    }

    /// Bosses beaten in infinite mode.
    #[must_use]
    pub const fn infinite_kills(&self) -> u32 {
        self.infinite_kills
    }

    /// Starts encounter `index`.
    ///
    /// Linear runs spawn the guarding wave first; infinite runs draw a random
    /// boss and spawn it directly. An index past the catalog ends the linear
    /// progression in victory.
    pub fn start(
        &mut self,
        index: usize,
        regenerate_obstacles: bool,
        ctx: &mut EncounterContext<'_>,
        now: Timestamp,
        out: &mut Vec<Event>,
    ) {
        self.minions.clear();
        self.fallen.clear();
        self.boss = None;
        self.defeat_handled = false;
        self.wave_slain = 0;
        self.wave_started_at = None;
        self.help_shown = false;

        if regenerate_obstacles {
            ctx.field.regenerate(now);
            ctx.grid.rebuild(ctx.field);
            out.push(Event::ObstaclesRegenerated);
        }

        if !self.difficulty.is_linear() {
            self.encounter = self.rng.gen_range(0..BOSS_CATALOG.len());
            self.spawn_boss(ctx, out);
            return;
        }

        if index >= BOSS_CATALOG.len() {
            log::info!("every boss has been beaten");
            self.encounter = index;
            self.phase = EncounterPhase::Victory;
            return;
        }

        self.encounter = index;
        self.spawn_wave(ctx, now, out);
    }

    fn spawn_wave(&mut self, ctx: &mut EncounterContext<'_>, now: Timestamp, out: &mut Vec<Event>) {
        let blueprint = &BOSS_CATALOG[self.encounter];
        let count = self.minions_required(self.encounter);
        let player = planar(ctx.player.position());
        let appearance = blueprint.appearance().scaled(MINION_SCALE);

        let mut placed: Vec<Vec2> = Vec::new();
        for slot in 0..count {
            let position = self
                .sample_minion_position(ctx.field, player, &placed)
                .unwrap_or_else(|| {
                    let angle = TAU * slot as f32 / count as f32;
                    let ring = self.config.fallback_ring_radius;
                    let fallback = player + Vec2::new(angle.cos(), angle.sin()) * ring;
                    log::warn!("no clear spawn point for minion {slot}; using the fallback ring");
                    let clamped = ctx
                        .field
                        .bounds()
                        .clamp(Vec3::new(fallback.x, 0.0, fallback.y), self.config.minion.radius);
                    planar(clamped)
                });
            placed.push(position);

            let id = self.allocate_id();
            let seed = self.rng.gen();
            self.minions.push(Minion::spawn(
                id,
                format!("{} minion", blueprint.name),
                Vec3::new(position.x, 0.0, position.y),
                appearance.clone(),
                self.config.minion.clone(),
                seed,
            ));
        }

        self.phase = EncounterPhase::MinionWave;
        self.wave_started_at = Some(now);
        log::info!(
            "{count} minions guard {} (encounter {})",
            blueprint.name,
            self.encounter + 1
        );
        out.push(Event::MinionWaveSpawned {
            encounter: self.encounter,
            count,
        });
    }

    fn sample_minion_position(
        &mut self,
        field: &ObstacleField,
        player: Vec2,
        placed: &[Vec2],
    ) -> Option<Vec2> {
        let extent = self.config.minion_spawn_extent;
        for _ in 0..self.config.minion_spawn_attempts {
            let candidate = Vec2::new(
                self.rng.gen_range(-extent..extent),
                self.rng.gen_range(-extent..extent),
            );
            if candidate.distance(player) < self.config.minion_player_distance {
                continue;
            }
            if placed
                .iter()
                .any(|other| other.distance(candidate) < self.config.minion_spacing)
            {
                continue;
            }
            if field.blocks(candidate, self.config.minion_clearance) {
                continue;
            }
            return Some(candidate);
        }
        None
    }

    fn spawn_boss(&mut self, ctx: &mut EncounterContext<'_>, out: &mut Vec<Event>) {
        let blueprint = &BOSS_CATALOG[self.encounter];
        let placement = ctx.field.random_boss_position(
            &mut self.rng,
            ctx.player.position(),
            self.config.boss_min_distance,
            self.config.boss_max_distance,
        );
        if placement.is_fallback() {
            log::warn!("no clear spawn point for {}; using the fallback", blueprint.name);
        }

        let id = self.allocate_id();
        let multiplier = self.difficulty.boss_stat_multiplier();
        let config = blueprint.to_config(multiplier, placement.position());
        let boss = Boss::spawn(id, config, self.config.boss.clone());
        log::info!(
            "{} entered the arena with {:.0} health",
            boss.name(),
            boss.health_pool().maximum()
        );
        out.push(Event::BossSpawned {
            boss: id,
            name: boss.name().to_owned(),
            encounter: self.encounter,
        });
        self.boss = Some(boss);
        self.defeat_handled = false;
        self.phase = EncounterPhase::BossFight;
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_entity);
        self.next_entity = self.next_entity.wrapping_add(1);
        id
    }

    /// Advances every encounter entity by one tick.
    ///
    /// Returns the damage of each boss projectile that reached the player.
    pub fn update(
        &mut self,
        ctx: &mut EncounterContext<'_>,
        now: Timestamp,
        dt: Duration,
        out: &mut Vec<Event>,
    ) -> Vec<f32> {
        if let EncounterPhase::Intermission { resume_at } = self.phase {
            if now >= resume_at {
                let next = if self.difficulty.is_linear() {
                    self.encounter + 1
                } else {
                    0
                };
                let regenerate = self.config.regenerate_obstacles_on_advance;
                self.start(next, regenerate, ctx, now, out);
            }
        }

        self.update_minions(ctx, now, dt, out);

        if self.phase == EncounterPhase::MinionWave && self.minions.is_empty() {
            log::info!("wave cleared; the boss arrives");
            self.spawn_boss(ctx, out);
        }

        self.update_boss(ctx, now, dt, out)
    }

    fn update_minions(
        &mut self,
        ctx: &mut EncounterContext<'_>,
        now: Timestamp,
        dt: Duration,
        out: &mut Vec<Event>,
    ) {
        let player = ctx.player.position();
        {
            let mut nav = NavContext {
                field: &*ctx.field,
                grid: &mut *ctx.grid,
            };
            for minion in &mut self.minions {
                minion.update(player, &mut nav, now, dt);
            }
        }

        let mut index = self.minions.len();
        while index > 0 {
            index -= 1;
            if self.minions[index].is_dead() {
                let minion = self.minions.remove(index);
                self.wave_slain += 1;
                self.minions_slain += 1;
                out.push(Event::MinionSlain {
                    minion: minion.id(),
                    remaining: u32::try_from(self.minions.len()).unwrap_or(u32::MAX),
                });
                self.fallen.push(minion);
            }
        }
        self.fallen.retain_mut(|minion| !minion.advance_lifecycle(now));

        let help_timeout = Duration::from_millis(self.config.help_timeout_ms);
        let help_due = self.wave_started_at.map_or(false, |started| {
            now.saturating_duration_since(started) >= help_timeout
        });
        if self.phase == EncounterPhase::MinionWave
            && help_due
            && !self.help_shown
            && !self.minions.is_empty()
        {
            self.help_shown = true;
            let count = self
                .minions
                .iter_mut()
                .map(Minion::show_help_marker)
                .filter(|shown| *shown)
                .count();
            let count = u32::try_from(count).unwrap_or(u32::MAX);
            log::info!("showing markers above the {count} remaining minions");
            out.push(Event::HelpMarkersShown { count });
        }
    }

    fn update_boss(
        &mut self,
        ctx: &mut EncounterContext<'_>,
        now: Timestamp,
        dt: Duration,
        out: &mut Vec<Event>,
    ) -> Vec<f32> {
        let Some(boss) = self.boss.as_mut() else {
            return Vec::new();
        };
        let hits = boss.update(ctx.player.position(), ctx.field, now, dt);

        let decided = boss.lifecycle().fate();
        if let (Some(fate), false) = (decided, self.defeat_handled) {
            self.defeat_handled = true;
            self.on_boss_defeated(fate, ctx, now, out);
        }

        if self.boss.as_mut().map_or(false, |boss| boss.advance_lifecycle(now)) {
            self.boss = None;
        }
        hits
    }

    fn on_boss_defeated(
        &mut self,
        fate: Fate,
        ctx: &mut EncounterContext<'_>,
        now: Timestamp,
        out: &mut Vec<Event>,
    ) {
        let Some(boss) = self.boss.as_ref() else {
            return;
        };
        let (id, name, reward) = (boss.id(), boss.name().to_owned(), boss.reward());
        let escaped = fate == Fate::Escaped;
        if escaped {
            log::info!("{name} escaped and will return stronger");
        }
        out.push(Event::BossDefeated {
            boss: id,
            name,
            escaped,
        });

        if self.difficulty.is_linear() {
            self.bosses_defeated += 1;
            if let Some(spell) = reward {
                if ctx.spells.unlock_spell(spell) {
                    out.push(Event::SpellUnlocked { spell });
                }
            }
            ctx.player
                .level_up(self.config.level_up_health, self.config.level_up_mana);
            out.push(Event::PlayerLevelledUp {
                max_health: ctx.player.health().maximum(),
                max_mana: ctx.player.mana().maximum(),
            });
        } else {
            self.infinite_kills += 1;
            log::info!("{} bosses beaten in infinite mode", self.infinite_kills);
        }

        self.phase = EncounterPhase::Intermission {
            resume_at: now.advanced_by(Duration::from_millis(self.config.advance_delay_ms)),
        };
    }
}
