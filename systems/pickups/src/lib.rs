#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Potion and spell pickups scattered around the arena.

use std::{
    collections::{BTreeSet, VecDeque},
    time::Duration,
};

use glam::Vec3;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use spell_arena_core::{
    Easing, Event, PickupId, PickupKind, PotionKind, SpellId, Timestamp, Transition,
};
use spell_arena_system_spellcasting::SpellBook;
use spell_arena_world::{obstacles::ObstacleField, planar, player::Player};

/// Spells that can lie on the ground.
pub const GROUND_SPELLS: [SpellId; 5] = [
    SpellId::ArrestoMomentum,
    SpellId::Bombarda,
    SpellId::Diffindo,
    SpellId::SperoPatronum,
    SpellId::PetrificusTotalus,
];

/// Tunables of the pickup economy.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PickupConfig {
    /// Pickups allowed on the field and in the queue together.
    pub max_pickups: usize,
    /// Time between two pickups appearing.
    pub spawn_interval_ms: u64,
    /// Planar distance at which the player collects a pickup.
    pub collection_radius: f32,
    /// Nearest spawn distance from the arena centre.
    pub spawn_min_distance: f32,
    /// Furthest spawn distance from the arena centre.
    pub spawn_max_distance: f32,
    /// Height pickups float at.
    pub hover_height: f32,
    /// Chance that a spawn is a spell instead of a potion.
    pub spell_chance: f64,
    /// Spell pickups allowed per run.
    pub max_spell_pickups: u32,
    /// First encounter index at which spells may drop.
    pub spell_min_encounter: usize,
    /// Length of the collection fade.
    pub collect_fade_ms: u64,
    /// Health restored by a health potion.
    pub health_restore: f32,
    /// Mana restored by a mana potion.
    pub mana_restore: f32,
    /// Outgoing damage multiplier granted by an attack potion.
    pub attack_multiplier: f32,
    /// Incoming damage multiplier granted by a defence potion.
    pub defense_multiplier: f32,
    /// Duration of attack and defence boosts.
    pub boost_ms: u64,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            max_pickups: 5,
            spawn_interval_ms: 5_000,
            collection_radius: 1.5,
            spawn_min_distance: 5.0,
            spawn_max_distance: 20.0,
            hover_height: 0.3,
            spell_chance: 0.2,
            max_spell_pickups: 5,
            spell_min_encounter: 1,
            collect_fade_ms: 300,
            health_restore: 50.0,
            mana_restore: 30.0,
            attack_multiplier: 2.0,
            defense_multiplier: 0.5,
            boost_ms: 15_000,
        }
    }
}

/// A pickup lying in the arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pickup {
    id: PickupId,
    kind: PickupKind,
    position: Vec3,
    fade: Option<Transition>,
}

impl Pickup {
    /// Identifier of the pickup.
    #[must_use]
    pub const fn id(&self) -> PickupId {
        self.id
    }

    /// Contents of the pickup.
    #[must_use]
    pub const fn kind(&self) -> PickupKind {
        self.kind
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Reports whether the pickup was collected and is fading out.
    #[must_use]
    pub const fn is_collected(&self) -> bool {
        self.fade.is_some()
    }

    /// Scale of the visual at `now`.
    #[must_use]
    pub fn presence(&self, now: Timestamp) -> f32 {
        self.fade.map_or(1.0, |fade| fade.sample(now))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Queued {
    kind: PickupKind,
    position: Vec3,
}

/// Spawns, paces, and resolves pickups.
#[derive(Debug)]
pub struct PickupField {
    config: PickupConfig,
    rng: ChaCha8Rng,
    pickups: Vec<Pickup>,
    queue: VecDeque<Queued>,
    last_spawn_at: Option<Timestamp>,
    encounter: usize,
    spell_pickups_enabled: bool,
    spells_spawned: u32,
    dropped_spells: BTreeSet<SpellId>,
    next_id: u32,
}

impl PickupField {
    /// Creates an empty field drawing randomness from `seed`.
    #[must_use]
    pub fn new(config: PickupConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            pickups: Vec::new(),
            queue: VecDeque::new(),
            last_spawn_at: None,
            encounter: 0,
            spell_pickups_enabled: true,
            spells_spawned: 0,
            dropped_spells: BTreeSet::new(),
            next_id: 0,
        }
    }

    /// Pickups currently in the arena, including fading ones.
    #[must_use]
    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    /// Pickups waiting for their spawn slot.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Spell pickups spawned during the run.
    #[must_use]
    pub const fn spells_spawned(&self) -> u32 {
        self.spells_spawned
    }

    /// Records the encounter index that gates spell drops.
    pub fn set_encounter(&mut self, encounter: usize) {
        self.encounter = encounter;
    }

    /// Enables or disables spell drops.
    pub fn set_spell_pickups_enabled(&mut self, enabled: bool) {
        self.spell_pickups_enabled = enabled;
    }

    /// Removes every pickup and queued spawn.
    pub fn clear(&mut self) {
        self.pickups.clear();
        self.queue.clear();
    }

    /// Clears the field and restores the run counters.
    pub fn reset(&mut self) {
        self.clear();
        self.last_spawn_at = None;
        self.encounter = 0;
        self.spell_pickups_enabled = true;
        self.spells_spawned = 0;
        self.dropped_spells.clear();
    }

    fn occupied(&self) -> usize {
        self.pickups.iter().filter(|pickup| !pickup.is_collected()).count() + self.queue.len()
    }

    fn spawn_position(&mut self, field: &ObstacleField) -> Vec3 {
        let placement = field.random_valid_position(
            &mut self.rng,
            self.config.spawn_min_distance,
            self.config.spawn_max_distance,
        );
        if placement.is_fallback() {
            log::warn!("no clear pickup position; using the arena centre");
        }
        let position = placement.position();
        Vec3::new(position.x, self.config.hover_height, position.z)
    }

    fn random_potion(&mut self) -> PotionKind {
        PotionKind::ALL
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(PotionKind::Health)
    }

    /// Queues up to `count` potions, bounded by the field capacity.
    ///
    /// The first queued potion appears one spawn interval after `now`.
    pub fn spawn_batch(&mut self, count: usize, field: &ObstacleField, now: Timestamp) {
        let free = self.config.max_pickups.saturating_sub(self.occupied());
        for _ in 0..count.min(free) {
            let kind = PickupKind::Potion(self.random_potion());
            let position = self.spawn_position(field);
            self.queue.push_back(Queued { kind, position });
        }
        self.last_spawn_at = Some(now);
    }

    fn should_drop_spell(&mut self) -> bool {
        self.spell_pickups_enabled
            && self.encounter >= self.config.spell_min_encounter
            && self.spells_spawned < self.config.max_spell_pickups
            && self.rng.gen_bool(self.config.spell_chance.clamp(0.0, 1.0))
    }

    fn top_up(&mut self, field: &ObstacleField) {
        if self.occupied() >= self.config.max_pickups {
            return;
        }
        let kind = if self.should_drop_spell() {
            self.spells_spawned += 1;
            let spell = GROUND_SPELLS
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(SpellId::Bombarda);
            PickupKind::Spell(spell)
        } else {
            PickupKind::Potion(self.random_potion())
        };
        let position = self.spawn_position(field);
        self.queue.push_back(Queued { kind, position });
    }

    fn materialize(&mut self, queued: Queued, out: &mut Vec<Event>) {
        let kind = match queued.kind {
            PickupKind::Spell(spell) if spell != SpellId::Bombarda => {
                if self.dropped_spells.insert(spell) {
                    queued.kind
                } else {
                    PickupKind::Potion(self.random_potion())
                }
            }
            other => other,
        };
        let id = PickupId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.pickups.push(Pickup {
            id,
            kind,
            position: queued.position,
            fade: None,
        });
        log::debug!("pickup {kind:?} appeared at {:?}", queued.position);
        out.push(Event::PickupSpawned { pickup: id, kind });
    }

    /// Paces spawns, resolves collection, and retires faded pickups.
    pub fn update(
        &mut self,
        player: &mut Player,
        spells: &mut SpellBook,
        field: &ObstacleField,
        now: Timestamp,
        out: &mut Vec<Event>,
    ) {
        self.top_up(field);

        let live = self.pickups.iter().filter(|pickup| !pickup.is_collected()).count();
        let interval = Duration::from_millis(self.config.spawn_interval_ms);
        let due = self
            .last_spawn_at
            .map_or(true, |last| now.saturating_duration_since(last) >= interval);
        if live < self.config.max_pickups && due {
            if let Some(queued) = self.queue.pop_front() {
                self.materialize(queued, out);
                self.last_spawn_at = Some(now);
            }
        }

        let reach = planar(player.position());
        let fade = Duration::from_millis(self.config.collect_fade_ms);
        for index in 0..self.pickups.len() {
            let pickup = self.pickups[index];
            if pickup.is_collected()
                || planar(pickup.position).distance(reach) >= self.config.collection_radius
            {
                continue;
            }
            self.pickups[index].fade = Some(Transition::new(now, fade, 1.0, 0.0, Easing::Linear));
            self.apply(pickup.kind, player, spells, now, out);
            out.push(Event::PickupCollected {
                pickup: pickup.id,
                kind: pickup.kind,
            });
        }

        self.pickups
            .retain(|pickup| pickup.fade.map_or(true, |fade| !fade.is_complete(now)));
    }

    fn apply(
        &self,
        kind: PickupKind,
        player: &mut Player,
        spells: &mut SpellBook,
        now: Timestamp,
        out: &mut Vec<Event>,
    ) {
        let boost = Duration::from_millis(self.config.boost_ms);
        match kind {
            PickupKind::Potion(PotionKind::Health) => {
                let _ = player.restore_health(self.config.health_restore);
            }
            PickupKind::Potion(PotionKind::Mana) => {
                let _ = player.restore_mana(self.config.mana_restore);
            }
            PickupKind::Potion(PotionKind::Attack) => {
                player.grant_attack_boost(self.config.attack_multiplier, boost, now);
            }
            PickupKind::Potion(PotionKind::Defense) => {
                player.grant_defense_boost(self.config.defense_multiplier, boost, now);
            }
            PickupKind::Spell(spell) => {
                if spells.unlock_spell(spell) {
                    out.push(Event::SpellUnlocked { spell });
                }
            }
        }
    }
}
