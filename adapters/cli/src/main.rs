#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless runner that plays the spell arena with an autopilot.

mod autopilot;
mod flags;

use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use spell_arena_core::{Command, Difficulty, Event, FlagStore, MemoryFlagStore, RunStats};
use spell_arena_rendering::{
    headless::{DeferredModelLoader, RecordingRenderer},
    presenter::Presenter,
    Frame,
};
use spell_arena_session::{self as session, query, Session, SessionConfig};

use crate::{autopilot::Autopilot, flags::TomlFlagStore};

/// Polls a model request waits before it resolves.
const MODEL_LOAD_DELAY: u32 = 3;

#[derive(Debug, Parser)]
#[command(
    name = "spell-arena",
    about = "Plays a spell arena run headlessly and prints its statistics"
)]
struct CliArgs {
    /// Master seed; overrides the configuration file.
    #[arg(long)]
    seed: Option<u64>,
    /// Difficulty of the run.
    #[arg(long, value_enum, default_value_t = DifficultyArg::Normal)]
    difficulty: DifficultyArg,
    /// Simulated seconds before the run is abandoned.
    #[arg(long, default_value_t = 300)]
    seconds: u64,
    /// Length of one simulation tick in milliseconds.
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,
    /// TOML file with session tunables.
    #[arg(long)]
    config: Option<PathBuf>,
    /// TOML file persisting unlock flags between runs.
    #[arg(long)]
    flags: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DifficultyArg {
    /// Linear progression with regeneration.
    Normal,
    /// Stronger bosses, no regeneration.
    Hard,
    /// Endless bosses; needs a completed hard run.
    Infinite,
}

impl From<DifficultyArg> for Difficulty {
    fn from(value: DifficultyArg) -> Self {
        match value {
            DifficultyArg::Normal => Self::Normal,
            DifficultyArg::Hard => Self::Hard,
            DifficultyArg::Infinite => Self::Infinite,
        }
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SessionConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let flags: Box<dyn FlagStore> = match &args.flags {
        Some(path) => Box::new(TomlFlagStore::new(path.clone())),
        None => Box::new(MemoryFlagStore::default()),
    };

    let mut session = Session::new(config, flags);
    println!("{}", query::welcome_banner(&session));

    let stats = play(&mut session, args.difficulty.into(), &args)?;
    print_stats(&stats);
    Ok(())
}

fn load_config(path: &Path) -> Result<SessionConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    toml::from_str(&text)
        .with_context(|| format!("failed to parse configuration {}", path.display()))
}

fn play(session: &mut Session, difficulty: Difficulty, args: &CliArgs) -> Result<RunStats> {
    let mut events = Vec::new();
    session
        .start_run(difficulty, &mut events)
        .with_context(|| format!("could not start a {difficulty:?} run"))?;
    log::info!("seed {} on {difficulty:?}", session.config().seed);

    let mut autopilot = Autopilot::new();
    let mut presenter = Presenter::new();
    let mut renderer = RecordingRenderer::default();
    let mut loader = DeferredModelLoader::new(MODEL_LOAD_DELAY);

    let dt = Duration::from_millis(args.tick_ms);
    let ticks = args.seconds.saturating_mul(1000) / args.tick_ms;
    for _ in 0..ticks {
        for command in autopilot.plan(session) {
            session::apply(session, command, &mut events);
        }
        session::apply(session, Command::Tick { dt }, &mut events);
        autopilot.observe(&events);

        presenter.sync(&Frame::capture(session), &mut renderer, &mut loader);
        log::trace!(
            "{} render calls for {} actors",
            renderer.calls().len(),
            presenter.actor_count()
        );
        renderer.clear();

        for event in events.drain(..) {
            if let Some(stats) = report(event) {
                return Ok(stats);
            }
        }
    }

    log::info!("time limit reached after {}s", args.seconds);
    session
        .finish_run()
        .context("the run ended without an outcome")
}

fn report(event: Event) -> Option<RunStats> {
    match event {
        Event::TimeAdvanced { .. } => {}
        Event::SpellCast { spell, mana_cost } => {
            log::debug!("cast {spell:?} for {mana_cost} mana");
        }
        Event::CastRejected { error } => log::debug!("cast rejected: {error}"),
        Event::ProjectileImpact {
            target,
            spell,
            damage,
        } => log::debug!("{spell:?} hit {target:?} for {damage:.1}"),
        Event::PlayerDamaged { amount, source } => {
            log::debug!("player took {amount:.1} from {source:?}");
        }
        Event::Victory { stats } => {
            log::info!("victory");
            return Some(stats);
        }
        Event::GameOver { stats } => {
            log::info!("game over");
            return Some(stats);
        }
        other => log::info!("{other:?}"),
    }
    None
}

fn print_stats(stats: &RunStats) {
    println!("health          {:.0}/{:.0}", stats.health, stats.max_health);
    println!("mana            {:.0}/{:.0}", stats.mana, stats.max_mana);
    println!("bosses defeated {}", stats.bosses_defeated);
    println!("minions slain   {}", stats.minions_slain);
    println!("infinite kills  {}", stats.infinite_kills);
    println!("spells unlocked {:?}", stats.spells_unlocked);
    println!("elapsed         {:.1}s", stats.elapsed_ms as f64 / 1000.0);
}
