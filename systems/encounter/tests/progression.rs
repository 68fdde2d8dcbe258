use std::time::Duration;

use spell_arena_core::{Event, SpellId, Timestamp};
use spell_arena_system_encounter::{Director, DirectorConfig, EncounterContext, EncounterPhase};
use spell_arena_system_spellcasting::SpellBook;
use spell_arena_world::{
    combat::Combatant,
    navigation::{NavigationConfig, NavigationGrid},
    obstacles::{ObstacleConfig, ObstacleField},
    player::{Player, PlayerConfig},
};

const TICK: Duration = Duration::from_millis(50);

struct Arena {
    field: ObstacleField,
    grid: NavigationGrid,
    player: Player,
    spells: SpellBook,
}

impl Arena {
    fn open() -> Self {
        let field = ObstacleField::from_obstacles(
            ObstacleConfig::empty(100.0),
            9,
            Vec::new(),
            Timestamp::ZERO,
        );
        let grid = NavigationGrid::build(NavigationConfig::default(), &field);
        Self {
            field,
            grid,
            player: Player::new(PlayerConfig::default()),
            spells: SpellBook::new(),
        }
    }

    fn ctx(&mut self) -> EncounterContext<'_> {
        EncounterContext {
            field: &mut self.field,
            grid: &mut self.grid,
            player: &mut self.player,
            spells: &mut self.spells,
        }
    }
}

fn clear_wave(director: &mut Director, arena: &mut Arena, now: Timestamp, events: &mut Vec<Event>) {
    for minion in director.minions_mut() {
        let _ = minion.take_damage(1_000.0, now);
    }
    let _ = director.update(&mut arena.ctx(), now, TICK, events);
}

#[test]
fn boss_waits_for_the_whole_wave() {
    let mut arena = Arena::open();
    let mut director = Director::new(DirectorConfig::default(), 0xfeed);
    let mut events = Vec::new();
    director.start(0, false, &mut arena.ctx(), Timestamp::ZERO, &mut events);
    assert_eq!(director.minions().len(), 5);
    assert!(director.boss().is_none());

    let now = Timestamp::from_millis(50);
    for minion in director.minions_mut().iter_mut().take(4) {
        let _ = minion.take_damage(1_000.0, now);
    }
    events.clear();
    let _ = director.update(&mut arena.ctx(), now, TICK, &mut events);

    assert_eq!(director.minions().len(), 1);
    assert_eq!(director.wave_slain(), 4);
    assert!(director.boss().is_none());
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, Event::MinionSlain { .. }))
            .count(),
        4
    );

    let now = Timestamp::from_millis(100);
    events.clear();
    clear_wave(&mut director, &mut arena, now, &mut events);

    let boss = director.boss().expect("boss spawns once the wave is cleared");
    assert_eq!(boss.name(), "Quirrell");
    assert_eq!(director.phase(), EncounterPhase::BossFight);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::BossSpawned { encounter: 0, .. }
    )));
}

#[test]
fn linear_defeat_rewards_levels_and_advances() {
    let mut arena = Arena::open();
    let mut director = Director::new(DirectorConfig::default(), 0xbeef);
    let mut events = Vec::new();
    director.start(0, false, &mut arena.ctx(), Timestamp::ZERO, &mut events);
    clear_wave(&mut director, &mut arena, Timestamp::from_millis(50), &mut events);

    let now = Timestamp::from_millis(100);
    let boss = director.boss_mut().expect("boss is present");
    let _ = boss.take_damage(10_000.0, now);
    events.clear();
    let _ = director.update(&mut arena.ctx(), now, TICK, &mut events);

    assert!(events.iter().any(|event| matches!(
        event,
        Event::BossDefeated { escaped: false, .. }
    )));
    assert!(events.contains(&Event::SpellUnlocked {
        spell: SpellId::Incendio
    }));
    assert!(events.contains(&Event::PlayerLevelledUp {
        max_health: 120.0,
        max_mana: 120.0,
    }));
    assert_eq!(arena.player.health().current(), 120.0);
    assert_eq!(director.bosses_defeated(), 1);
    assert!(director.boss().is_some(), "the boss stays while it departs");

    let _ = director.update(&mut arena.ctx(), Timestamp::from_millis(1_100), TICK, &mut events);
    assert!(director.boss().is_none());

    events.clear();
    let _ = director.update(&mut arena.ctx(), Timestamp::from_millis(3_100), TICK, &mut events);
    assert_eq!(director.encounter(), 1);
    assert_eq!(director.minions().len(), 7);
    assert_eq!(events.first(), Some(&Event::ObstaclesRegenerated));
}

#[test]
fn escaping_boss_keeps_health_and_still_advances() {
    let mut arena = Arena::open();
    let mut director = Director::new(DirectorConfig::default(), 0xcafe);
    let mut events = Vec::new();
    director.start(3, false, &mut arena.ctx(), Timestamp::ZERO, &mut events);
    assert_eq!(director.minions().len(), 12);
    clear_wave(&mut director, &mut arena, Timestamp::from_millis(50), &mut events);

    let now = Timestamp::from_millis(100);
    let boss = director.boss_mut().expect("Voldemort arrives");
    assert_eq!(boss.take_damage(750.0, now), 750.0);
    assert!(boss.is_defeated());
    assert!(!boss.is_dead());
    assert_eq!(boss.health_pool().current(), 750.0);
    assert!(boss.projectiles().is_empty());

    events.clear();
    let _ = director.update(&mut arena.ctx(), now, TICK, &mut events);

    assert!(events.iter().any(|event| matches!(
        event,
        Event::BossDefeated { escaped: true, .. }
    )));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::SpellUnlocked { .. })));
    assert!(matches!(
        director.phase(),
        EncounterPhase::Intermission { .. }
    ));
}

#[test]
fn final_defeat_ends_in_victory() {
    let mut arena = Arena::open();
    let mut director = Director::new(DirectorConfig::default(), 7);
    let mut events = Vec::new();
    director.start(6, false, &mut arena.ctx(), Timestamp::ZERO, &mut events);
    clear_wave(&mut director, &mut arena, Timestamp::from_millis(50), &mut events);

    let now = Timestamp::from_millis(100);
    let _ = director
        .boss_mut()
        .expect("final boss arrives")
        .take_damage(10_000.0, now);
    let _ = director.update(&mut arena.ctx(), now, TICK, &mut events);
    assert!(!director.is_victorious());

    let _ = director.update(&mut arena.ctx(), Timestamp::from_millis(3_100), TICK, &mut events);
    assert!(director.is_victorious());
}
