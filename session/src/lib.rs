#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative simulation session for the Spell Arena.
//!
//! A [`Session`] owns the obstacle field, navigation grid, player, spell book,
//! encounter director, pickup field, and the player's in-flight spells. Every
//! mutation flows through [`apply`], which executes one [`Command`] and appends
//! the resulting [`Event`] values in the order they happened. Adapters read
//! state back through the [`query`] module.

pub mod query;

use std::{fmt, time::Duration};

use glam::{Vec2, Vec3};
use serde::Deserialize;
use spell_arena_core::{
    derive_stream_seed, duration_millis, Command, DamageSource, Difficulty, EntityId, Event,
    FlagStore, RunStats, SpellDefinition, SpellId, Timestamp, HARD_MODE_COMPLETED_FLAG,
    RNG_STREAM_DIRECTOR, RNG_STREAM_OBSTACLES, RNG_STREAM_PICKUPS,
};
use spell_arena_system_encounter::{Director, DirectorConfig, EncounterContext};
use spell_arena_system_pickups::{PickupConfig, PickupField};
use spell_arena_system_spellcasting::{resolve_hit, SpellBook};
use spell_arena_world::{
    combat::{Combatant, Projectile, ProjectileOwner},
    navigation::{NavigationConfig, NavigationGrid},
    obstacles::{ObstacleConfig, ObstacleField},
    planar,
    player::{Player, PlayerConfig},
};
use thiserror::Error;

/// Flight parameters of the player's spell bolts.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpellProjectileConfig {
    /// Speed in units per second.
    pub speed: f32,
    /// Time a bolt flies before fizzling.
    pub lifetime_ms: u64,
    /// Distance from a target centre that counts as a hit.
    pub hit_radius: f32,
}

impl Default for SpellProjectileConfig {
    fn default() -> Self {
        Self {
            speed: 20.0,
            lifetime_ms: 5_000,
            hit_radius: 1.5,
        }
    }
}

impl SpellProjectileConfig {
    fn max_range(&self) -> f32 {
        self.speed * Duration::from_millis(self.lifetime_ms).as_secs_f32()
    }
}

/// Complete configuration of a session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Master seed from which every random stream is derived.
    pub seed: u64,
    /// Potions queued when a run starts.
    pub initial_potions: usize,
    /// Obstacle generation and living maze.
    pub obstacles: ObstacleConfig,
    /// Navigation grid.
    pub navigation: NavigationConfig,
    /// Player avatar.
    pub player: PlayerConfig,
    /// Encounter progression.
    pub director: DirectorConfig,
    /// Pickup economy.
    pub pickups: PickupConfig,
    /// Player spell bolts.
    pub projectiles: SpellProjectileConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            initial_potions: 5,
            obstacles: ObstacleConfig::default(),
            navigation: NavigationConfig::default(),
            player: PlayerConfig::default(),
            director: DirectorConfig::default(),
            pickups: PickupConfig::default(),
            projectiles: SpellProjectileConfig::default(),
        }
    }
}

/// Failures reported by run management.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Infinite mode stays locked until the hard progression was completed.
    #[error("infinite mode unlocks after completing hard mode")]
    InfiniteModeLocked,
    /// No run is in progress.
    #[error("no run is in progress")]
    NotRunning,
}

/// Coarse state of the current run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Waiting for a run to start.
    Idle,
    /// A run is being simulated.
    Running,
    /// The linear progression was completed.
    Victory,
    /// The player died.
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Minion(EntityId),
    Boss(EntityId),
}

/// Authoritative state of one player's game.
pub struct Session {
    config: SessionConfig,
    flags: Box<dyn FlagStore>,
    now: Timestamp,
    run_started_at: Timestamp,
    state: RunState,
    difficulty: Difficulty,
    field: ObstacleField,
    grid: NavigationGrid,
    player: Player,
    spells: SpellBook,
    director: Director,
    pickups: PickupField,
    projectiles: Vec<Projectile>,
    movement: Vec2,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("now", &self.now)
            .field("state", &self.state)
            .field("difficulty", &self.difficulty)
            .field("encounter", &self.director.encounter())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Builds every component from `config` around the injected flag store.
    #[must_use]
    pub fn new(config: SessionConfig, flags: Box<dyn FlagStore>) -> Self {
        let seed = config.seed;
        let field = ObstacleField::generate(
            config.obstacles.clone(),
            derive_stream_seed(seed, RNG_STREAM_OBSTACLES),
            Timestamp::ZERO,
        );
        let grid = NavigationGrid::build(config.navigation.clone(), &field);
        let director = Director::new(
            config.director.clone(),
            derive_stream_seed(seed, RNG_STREAM_DIRECTOR),
        );
        let pickups = PickupField::new(
            config.pickups.clone(),
            derive_stream_seed(seed, RNG_STREAM_PICKUPS),
        );
        Self {
            player: Player::new(config.player.clone()),
            spells: SpellBook::new(),
            flags,
            now: Timestamp::ZERO,
            run_started_at: Timestamp::ZERO,
            state: RunState::Idle,
            difficulty: Difficulty::Normal,
            field,
            grid,
            director,
            pickups,
            projectiles: Vec::new(),
            movement: Vec2::ZERO,
            config,
        }
    }

    /// Configuration the session was built from.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Reports whether infinite mode may be started.
    #[must_use]
    pub fn infinite_mode_unlocked(&self) -> bool {
        match self.flags.read_flag(HARD_MODE_COMPLETED_FLAG) {
            Ok(value) => value,
            Err(error) => {
                log::warn!("could not read the hard mode flag: {error}");
                false
            }
        }
    }

    /// Starts a fresh run at `difficulty`.
    ///
    /// Every component is reset, the initial potions are queued, and the first
    /// encounter begins in the current obstacle layout.
    pub fn start_run(
        &mut self,
        difficulty: Difficulty,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SessionError> {
        if difficulty == Difficulty::Infinite && !self.infinite_mode_unlocked() {
            return Err(SessionError::InfiniteModeLocked);
        }

        self.reset_components();
        self.difficulty = difficulty;
        self.director.set_difficulty(difficulty);

        let player = &self.config.player;
        let (max_health, max_mana) = if difficulty == Difficulty::Infinite {
            (player.infinite_stat_pool, player.infinite_stat_pool)
        } else {
            (player.max_health, player.max_mana)
        };
        self.player
            .respawn(max_health, max_mana, difficulty.regenerates_health());
        if difficulty == Difficulty::Infinite {
            let _ = self.spells.unlock_all();
            self.pickups.set_spell_pickups_enabled(false);
        }

        self.pickups
            .spawn_batch(self.config.initial_potions, &self.field, self.now);
        self.state = RunState::Running;
        self.run_started_at = self.now;
        log::info!("starting a {difficulty:?} run");
        out_events.push(Event::RunStarted { difficulty });

        let mut ctx = EncounterContext {
            field: &mut self.field,
            grid: &mut self.grid,
            player: &mut self.player,
            spells: &mut self.spells,
        };
        self.director.start(0, false, &mut ctx, self.now, out_events);
        Ok(())
    }

    /// Abandons the run in progress and returns its statistics.
    pub fn finish_run(&mut self) -> Result<RunStats, SessionError> {
        if self.state != RunState::Running {
            return Err(SessionError::NotRunning);
        }
        let stats = self.run_stats();
        self.reset_components();
        Ok(stats)
    }

    fn reset_components(&mut self) {
        self.director.reset();
        self.pickups.reset();
        self.spells.reset();
        let player = &self.config.player;
        self.player.respawn(player.max_health, player.max_mana, true);
        self.projectiles.clear();
        self.movement = Vec2::ZERO;
        self.state = RunState::Idle;
    }

    fn run_stats(&self) -> RunStats {
        RunStats {
            health: self.player.health().current(),
            max_health: self.player.health().maximum(),
            mana: self.player.mana().current(),
            max_mana: self.player.mana().maximum(),
            spells_unlocked: self.spells.unlocked().to_vec(),
            bosses_defeated: self.director.bosses_defeated(),
            minions_slain: self.director.minions_slain(),
            infinite_kills: self.director.infinite_kills(),
            elapsed_ms: duration_millis(self.now.saturating_duration_since(self.run_started_at)),
        }
    }

    fn cast(&mut self, aim: Vec3, out_events: &mut Vec<Event>) {
        if self.state != RunState::Running {
            return;
        }
        let mana = self.player.mana().current();
        let definition =
            match self
                .spells
                .cast_current_spell(mana, self.now, self.player.shield_mut())
            {
                Ok(definition) => definition,
                Err(error) => {
                    log::debug!("cast rejected: {error}");
                    out_events.push(Event::CastRejected { error });
                    return;
                }
            };

        let _ = self.player.spend_mana(definition.mana_cost);
        out_events.push(Event::SpellCast {
            spell: definition.id,
            mana_cost: definition.mana_cost,
        });
        if definition.launches_projectile() {
            let bolt = &self.config.projectiles;
            self.projectiles.push(Projectile::launch(
                self.player.eye_position(),
                aim,
                bolt.speed,
                definition.damage,
                ProjectileOwner::Player(definition.id),
                bolt.max_range(),
            ));
        }
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.now = self.now.advanced_by(dt);
        out_events.push(Event::TimeAdvanced { dt });
        if self.state != RunState::Running {
            return;
        }
        let now = self.now;

        let maze = self.field.tick(now);
        if maze.started > 0 {
            out_events.push(Event::MazeShifted {
                toggled: maze.started,
            });
        }
        if self.grid.is_stale(&self.field) && !self.field.is_transforming() {
            self.grid.rebuild(&self.field);
        }

        self.player.apply_movement(self.movement, dt, &self.field);
        if self.player.update(dt, now) {
            log::debug!("shield dropped");
        }

        self.pickups.set_encounter(self.director.encounter());
        self.pickups.update(
            &mut self.player,
            &mut self.spells,
            &self.field,
            now,
            out_events,
        );

        self.advance_projectiles(dt, out_events);

        let mut ctx = EncounterContext {
            field: &mut self.field,
            grid: &mut self.grid,
            player: &mut self.player,
            spells: &mut self.spells,
        };
        let projectile_hits = self.director.update(&mut ctx, now, dt, out_events);
        for damage in projectile_hits {
            self.hurt_player(damage, DamageSource::BossProjectile, out_events);
        }

        let position = self.player.position();
        if let Some(damage) = self
            .director
            .boss_mut()
            .and_then(|boss| boss.try_melee(position, now))
        {
            self.hurt_player(damage, DamageSource::BossMelee, out_events);
        }
        let strikes: Vec<f32> = self
            .director
            .minions_mut()
            .iter_mut()
            .filter_map(|minion| minion.try_melee(position, now))
            .collect();
        for damage in strikes {
            self.hurt_player(damage, DamageSource::MinionMelee, out_events);
        }

        if self.player.is_dead() {
            self.state = RunState::GameOver;
            log::info!("the player fell in encounter {}", self.director.encounter());
            out_events.push(Event::GameOver {
                stats: self.run_stats(),
            });
        } else if self.director.is_victorious() {
            self.state = RunState::Victory;
            log::info!("victory on {:?}", self.difficulty);
            if self.difficulty == Difficulty::Hard {
                if let Err(error) = self.flags.write_flag(HARD_MODE_COMPLETED_FLAG, true) {
                    log::warn!("could not record hard mode completion: {error}");
                }
            }
            out_events.push(Event::Victory {
                stats: self.run_stats(),
            });
        }
    }

    fn hurt_player(&mut self, damage: f32, source: DamageSource, out_events: &mut Vec<Event>) {
        let amount = self.player.take_damage(damage, self.now);
        out_events.push(Event::PlayerDamaged { amount, source });
    }

    fn advance_projectiles(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let mut projectiles = std::mem::take(&mut self.projectiles);
        projectiles.retain_mut(|projectile| {
            let in_range = projectile.advance(dt);
            let ProjectileOwner::Player(spell) = projectile.owner() else {
                return false;
            };
            let struck = self.strike(projectile, spell.definition(), out_events);
            in_range && !struck
        });
        self.projectiles = projectiles;
    }

    fn strike(
        &mut self,
        projectile: &Projectile,
        definition: &SpellDefinition,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let radius = self.config.projectiles.hit_radius;
        let start = planar(projectile.previous_position());
        let primary = self
            .director
            .minions()
            .iter()
            .filter(|minion| minion.is_alive())
            .filter_map(|minion| {
                let contact = projectile.contact(minion.position(), radius)?;
                Some((Target::Minion(minion.id()), contact))
            })
            .min_by(|(_, a), (_, b)| {
                let a = planar(*a).distance_squared(start);
                let b = planar(*b).distance_squared(start);
                a.total_cmp(&b)
            })
            .or_else(|| {
                let boss = self.director.boss().filter(|boss| boss.is_alive())?;
                let contact = projectile.contact(boss.position(), radius)?;
                Some((Target::Boss(boss.id()), contact))
            });
        let Some((primary, centre)) = primary else {
            return false;
        };

        self.resolve(primary, definition, out_events);
        if let Some(splash) = definition.radius {
            let mut splashed: Vec<Target> = self
                .director
                .minions()
                .iter()
                .filter(|minion| {
                    minion.is_alive() && projectile_reaches(centre, minion.position(), splash)
                })
                .map(|minion| Target::Minion(minion.id()))
                .collect();
            if let Some(boss) = self.director.boss() {
                if boss.is_alive() && projectile_reaches(centre, boss.position(), splash) {
                    splashed.push(Target::Boss(boss.id()));
                }
            }
            for target in splashed.into_iter().filter(|target| *target != primary) {
                self.resolve(target, definition, out_events);
            }
        }
        true
    }

    fn resolve(
        &mut self,
        target: Target,
        definition: &SpellDefinition,
        out_events: &mut Vec<Event>,
    ) {
        let attack = self.player.attack_multiplier();
        let now = self.now;
        let (id, report) = match target {
            Target::Minion(id) => (
                id,
                self.director
                    .minions_mut()
                    .iter_mut()
                    .find(|minion| minion.id() == id)
                    .map(|minion| resolve_hit(definition, minion, attack, now)),
            ),
            Target::Boss(id) => (
                id,
                self.director
                    .boss_mut()
                    .map(|boss| resolve_hit(definition, boss, attack, now)),
            ),
        };
        if let Some(report) = report {
            out_events.push(Event::ProjectileImpact {
                target: id,
                spell: definition.id,
                damage: report.damage,
            });
        }
    }
}

fn projectile_reaches(centre: Vec3, target: Vec3, radius: f32) -> bool {
    planar(centre).distance(planar(target)) <= radius
}

/// Applies the provided command to the session, appending resulting events.
pub fn apply(session: &mut Session, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => session.tick(dt, out_events),
        Command::Move { direction } => {
            session.movement = direction.clamp_length_max(1.0);
        }
        Command::CastCurrentSpell { aim } => session.cast(aim, out_events),
        Command::SelectSpell { slot } => {
            if !session.spells.select_spell(slot) {
                log::debug!("slot {slot} is out of range");
            }
        }
        Command::EquipSpell { spell, slot } => {
            if let Err(error) = session.spells.equip_spell(spell, slot) {
                log::debug!("could not equip {spell:?}: {error}");
            }
        }
        Command::ResetGame => {
            log::info!("resetting the session");
            session.reset_components();
        }
    }
}

/// Spells every fresh spell book starts with.
#[must_use]
pub fn starter_spells() -> Vec<SpellId> {
    SpellBook::new().unlocked().to_vec()
}
