use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use glam::{Vec2, Vec3};
use spell_arena_core::{Command, Difficulty, Event, MemoryFlagStore};
use spell_arena_session::{self as session, query, Session, SessionConfig};

#[test]
fn deterministic_replay_produces_identical_snapshots() {
    let first = replay(0x5eed, scripted_commands());
    let second = replay(0x5eed, scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
}

#[test]
fn different_seeds_produce_different_arenas() {
    let first = replay(1, scripted_commands());
    let second = replay(2, scripted_commands());

    assert_ne!(first.fingerprint(), second.fingerprint());
}

#[test]
fn pickup_spawns_leave_the_living_maze_untouched() {
    let with_pickups = SessionConfig {
        seed: 23,
        ..SessionConfig::default()
    };
    let mut without_pickups = with_pickups.clone();
    without_pickups.initial_potions = 0;
    without_pickups.pickups.max_pickups = 0;

    let (stocked, stocked_shifts) = shielded_run(with_pickups);
    let (bare, bare_shifts) = shielded_run(without_pickups);

    assert!(!query::pickups(&stocked).is_empty());
    assert!(query::pickups(&bare).is_empty());
    assert!(stocked_shifts.len() >= 2);
    assert_eq!(stocked_shifts, bare_shifts);
    assert_eq!(query::obstacles(&stocked), query::obstacles(&bare));
}

/// Stands still behind Protego for 65 seconds; returns the maze shifts seen.
fn shielded_run(config: SessionConfig) -> (Session, Vec<u32>) {
    let mut session = Session::new(config, Box::new(MemoryFlagStore::default()));
    let mut events = Vec::new();
    session
        .start_run(Difficulty::Normal, &mut events)
        .expect("normal runs are always available");
    for step in 0..650_u32 {
        if step % 25 == 0 {
            session::apply(&mut session, Command::SelectSpell { slot: 0 }, &mut events);
            session::apply(
                &mut session,
                Command::CastCurrentSpell { aim: Vec3::Z },
                &mut events,
            );
        }
        session::apply(
            &mut session,
            Command::Tick {
                dt: Duration::from_millis(100),
            },
            &mut events,
        );
    }
    let shifts = events
        .iter()
        .filter_map(|event| match event {
            Event::MazeShifted { toggled } => Some(*toggled),
            _ => None,
        })
        .collect();
    (session, shifts)
}

fn replay(seed: u64, commands: Vec<Command>) -> ReplayOutcome {
    let config = SessionConfig {
        seed,
        ..SessionConfig::default()
    };
    let mut session = Session::new(config, Box::new(MemoryFlagStore::default()));
    let mut log = Vec::new();

    let mut events = Vec::new();
    session
        .start_run(Difficulty::Normal, &mut events)
        .expect("normal runs are always available");
    record_events(&events, &mut log);

    for command in commands {
        let mut events = Vec::new();
        session::apply(&mut session, command, &mut events);
        record_events(&events, &mut log);
    }

    let mut state = Vec::new();
    state.push(format!("{:?}", query::player(&session)));
    state.push(format!("{:?}", query::boss(&session)));
    state.extend(query::minions(&session).iter().map(|minion| format!("{minion:?}")));
    state.extend(query::obstacles(&session).iter().map(|obstacle| format!("{obstacle:?}")));
    state.extend(query::pickups(&session).iter().map(|pickup| format!("{pickup:?}")));

    ReplayOutcome { state, events: log }
}

fn scripted_commands() -> Vec<Command> {
    let tick = Command::Tick {
        dt: Duration::from_millis(50),
    };
    let headings = [
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 1.0),
        Vec2::new(-1.0, 0.0),
        Vec2::new(0.0, -1.0),
    ];

    let mut commands = Vec::new();
    for step in 0..600_usize {
        if step % 40 == 0 {
            commands.push(Command::Move {
                direction: headings[(step / 40) % headings.len()],
            });
        }
        if step % 20 == 0 {
            commands.push(Command::SelectSpell {
                slot: (step / 20) % 2,
            });
            commands.push(Command::CastCurrentSpell {
                aim: Vec3::new(1.0, 0.0, 1.0),
            });
        }
        commands.push(tick.clone());
    }
    commands
}

fn record_events(events: &[Event], log: &mut Vec<String>) {
    log.extend(events.iter().map(|event| format!("{event:?}")));
}

#[derive(Debug, PartialEq, Eq)]
struct ReplayOutcome {
    state: Vec<String>,
    events: Vec<String>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.state.hash(&mut hasher);
        self.events.hash(&mut hasher);
        hasher.finish()
    }
}
