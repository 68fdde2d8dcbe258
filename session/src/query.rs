//! Query functions that provide read-only access to the session state.

use std::time::Duration;

use glam::{Vec2, Vec3};
use spell_arena_core::{
    Appearance, Difficulty, EntityId, ObstacleId, PickupId, PickupKind, SpellId, Timestamp,
    SPELL_SLOT_COUNT, WELCOME_BANNER,
};
use spell_arena_system_encounter::EncounterPhase;
use spell_arena_world::{
    combat::{Activity, Lifecycle},
    minion::{Behavior, Minion},
    obstacles::{Footprint, ObstacleKind},
};

use super::{RunState, Session};

/// Retrieves the welcome banner that adapters may display to players.
#[must_use]
pub fn welcome_banner(_session: &Session) -> &'static str {
    WELCOME_BANNER
}

/// Current simulation time.
#[must_use]
pub fn now(session: &Session) -> Timestamp {
    session.now
}

/// Coarse state of the current run.
#[must_use]
pub fn run_state(session: &Session) -> RunState {
    session.state
}

/// Difficulty of the current or last run.
#[must_use]
pub fn difficulty(session: &Session) -> Difficulty {
    session.difficulty
}

/// Encounter index currently being fought.
#[must_use]
pub fn encounter(session: &Session) -> usize {
    session.director.encounter()
}

/// Phase of the encounter director.
#[must_use]
pub fn phase(session: &Session) -> EncounterPhase {
    session.director.phase()
}

/// Spells the player has unlocked, in unlock order.
#[must_use]
pub fn unlocked_spells(session: &Session) -> &[SpellId] {
    session.spells.unlocked()
}

/// Captures the player's vitals and buffs.
#[must_use]
pub fn player(session: &Session) -> PlayerView {
    let player = &session.player;
    PlayerView {
        position: player.position(),
        eye_position: player.eye_position(),
        health: player.health().current(),
        max_health: player.health().maximum(),
        mana: player.mana().current(),
        max_mana: player.mana().maximum(),
        shield_visible: player.shield().is_visible(),
        shield_remaining: player.shield().remaining(session.now),
        attack_multiplier: player.attack_multiplier(),
        defense_multiplier: player.defense_multiplier(),
    }
}

/// Captures the boss, including one that is still playing its departure.
#[must_use]
pub fn boss(session: &Session) -> Option<BossView> {
    let now = session.now;
    session.director.boss().map(|boss| BossView {
        id: boss.id(),
        name: boss.name().to_owned(),
        position: boss.position(),
        facing: boss.facing(),
        size: boss.size(),
        health_fraction: boss.health_pool().fraction(),
        lifecycle: *boss.lifecycle(),
        presence: boss.lifecycle().presence(now),
        stunned: boss.is_stunned(now),
        pacified: boss.is_pacified(now),
        flashing: boss.is_flashing(now),
        activity: boss.activity(now),
        appearance: boss.appearance().clone(),
        projectiles: boss
            .projectiles()
            .iter()
            .map(|projectile| projectile.position())
            .collect(),
    })
}

/// Captures live minions followed by those still playing their death.
#[must_use]
pub fn minions(session: &Session) -> Vec<MinionView> {
    let now = session.now;
    session
        .director
        .minions()
        .iter()
        .chain(session.director.fallen_minions())
        .map(|minion| MinionView::capture(minion, now))
        .collect()
}

/// Captures every obstacle with its current vertical offset.
#[must_use]
pub fn obstacles(session: &Session) -> Vec<ObstacleView> {
    let now = session.now;
    session
        .field
        .obstacles()
        .iter()
        .map(|obstacle| ObstacleView {
            id: obstacle.id(),
            kind: obstacle.kind(),
            center: obstacle.center(),
            footprint: obstacle.footprint(),
            vertical_offset: obstacle.vertical_offset(now),
            raised: obstacle.is_raised(),
            colliding: obstacle.is_colliding(),
        })
        .collect()
}

/// Captures pickups on the field, including fading ones.
#[must_use]
pub fn pickups(session: &Session) -> Vec<PickupView> {
    let now = session.now;
    session
        .pickups
        .pickups()
        .iter()
        .map(|pickup| PickupView {
            id: pickup.id(),
            kind: pickup.kind(),
            position: pickup.position(),
            presence: pickup.presence(now),
            collected: pickup.is_collected(),
        })
        .collect()
}

/// Captures the loadout with per-slot cooldowns.
#[must_use]
pub fn spell_slots(session: &Session) -> Vec<SpellSlotView> {
    let book = &session.spells;
    (0..SPELL_SLOT_COUNT)
        .map(|slot| {
            let spell = book.slots()[slot];
            SpellSlotView {
                slot,
                spell,
                active: book.active_slot() == slot,
                cooldown_remaining: spell
                    .map_or(Duration::ZERO, |spell| book.cooldown_remaining(spell, session.now)),
            }
        })
        .collect()
}

/// Positions of the player's spells in flight.
#[must_use]
pub fn spell_projectiles(session: &Session) -> Vec<Vec3> {
    session
        .projectiles
        .iter()
        .map(|projectile| projectile.position())
        .collect()
}

/// Read-only snapshot of the player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerView {
    /// Ground position.
    pub position: Vec3,
    /// Point spells are launched from.
    pub eye_position: Vec3,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Current mana.
    pub mana: f32,
    /// Maximum mana.
    pub max_mana: f32,
    /// Whether the shield bubble is shown.
    pub shield_visible: bool,
    /// Time left on the shield.
    pub shield_remaining: Duration,
    /// Outgoing damage multiplier.
    pub attack_multiplier: f32,
    /// Incoming damage multiplier.
    pub defense_multiplier: f32,
}

/// Read-only snapshot of the boss.
#[derive(Clone, Debug, PartialEq)]
pub struct BossView {
    /// Identifier of the boss.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Ground position.
    pub position: Vec3,
    /// Yaw facing the player.
    pub facing: f32,
    /// Bounding size of the body.
    pub size: Vec3,
    /// Remaining health as a fraction of the maximum.
    pub health_fraction: f32,
    /// Removal state.
    pub lifecycle: Lifecycle,
    /// Scale or opacity of the visual.
    pub presence: f32,
    /// Whether a stun overlay is active.
    pub stunned: bool,
    /// Whether a pacify overlay is active.
    pub pacified: bool,
    /// Whether the hit flash is showing.
    pub flashing: bool,
    /// Animation the boss should play.
    pub activity: Activity,
    /// Visual description.
    pub appearance: Appearance,
    /// Positions of the boss's projectiles.
    pub projectiles: Vec<Vec3>,
}

/// Read-only snapshot of a minion.
#[derive(Clone, Debug, PartialEq)]
pub struct MinionView {
    /// Identifier of the minion.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Ground position.
    pub position: Vec3,
    /// Yaw of the body.
    pub facing: f32,
    /// Remaining health as a fraction of the maximum.
    pub health_fraction: f32,
    /// Patrol or chase.
    pub behavior: Behavior,
    /// Help marker position when shown.
    pub marker: Option<Vec3>,
    /// Scale of the visual.
    pub presence: f32,
    /// Whether a stun overlay is active.
    pub stunned: bool,
    /// Whether the hit flash is showing.
    pub flashing: bool,
    /// Animation the minion should play.
    pub activity: Activity,
    /// Visual description.
    pub appearance: Appearance,
}

impl MinionView {
    fn capture(minion: &Minion, now: Timestamp) -> Self {
        Self {
            id: minion.id(),
            name: minion.name().to_owned(),
            position: minion.position(),
            facing: minion.facing(),
            health_fraction: minion.health_pool().fraction(),
            behavior: minion.behavior(),
            marker: minion.marker_position(),
            presence: minion.lifecycle().presence(now),
            stunned: minion.is_stunned(now),
            flashing: minion.is_flashing(now),
            activity: minion.activity(now),
            appearance: minion.appearance().clone(),
        }
    }
}

/// Read-only snapshot of an obstacle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleView {
    /// Identifier of the obstacle.
    pub id: ObstacleId,
    /// Hedge, tree, or rock.
    pub kind: ObstacleKind,
    /// Centre in the ground plane.
    pub center: Vec2,
    /// Collision shape.
    pub footprint: Footprint,
    /// Height offset of the visual.
    pub vertical_offset: f32,
    /// Whether a hedge is raised or rising.
    pub raised: bool,
    /// Whether the obstacle currently blocks movement.
    pub colliding: bool,
}

/// Read-only snapshot of a pickup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickupView {
    /// Identifier of the pickup.
    pub id: PickupId,
    /// Contents.
    pub kind: PickupKind,
    /// World position.
    pub position: Vec3,
    /// Scale of the visual.
    pub presence: f32,
    /// Whether the pickup is fading after collection.
    pub collected: bool,
}

/// Read-only snapshot of a loadout slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpellSlotView {
    /// Zero-based slot index.
    pub slot: usize,
    /// Equipped spell.
    pub spell: Option<SpellId>,
    /// Whether the slot is selected.
    pub active: bool,
    /// Time until the equipped spell can be cast again.
    pub cooldown_remaining: Duration,
}
