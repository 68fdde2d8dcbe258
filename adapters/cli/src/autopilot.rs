//! Scripted player input for headless runs.

use glam::{Vec2, Vec3};
use spell_arena_core::{CastError, Command, Event, SpellId, SPELL_SLOT_COUNT};
use spell_arena_session::{
    query::{self, PlayerView},
    RunState, Session,
};
use spell_arena_world::{combat::Lifecycle, planar};

/// Targets farther than this are approached.
const ENGAGE_DISTANCE: f32 = 12.0;
/// Targets closer than this are backed away from.
const RETREAT_DISTANCE: f32 = 6.0;
/// Health fraction below which the shield is kept up.
const SHIELD_HEALTH_FRACTION: f32 = 0.5;

const SHIELDS: [SpellId; 2] = [SpellId::Protego, SpellId::ProtegoMaxima];

/// Drives the player: kites the nearest enemy, shoots at it and shields when hurt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Autopilot {
    preferred_slot: usize,
}

impl Autopilot {
    /// Creates an autopilot that starts from the first slot.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Commands to issue before the next tick.
    pub(crate) fn plan(&self, session: &Session) -> Vec<Command> {
        let mut commands = Vec::new();
        if query::run_state(session) != RunState::Running {
            return commands;
        }
        let player = query::player(session);

        commands.extend(self.equip_unlocked(session));

        let target = nearest_target(session, player.position);
        let direction = target.map_or(Vec2::ZERO, |target| {
            steer(planar(target) - planar(player.position))
        });
        commands.push(Command::Move { direction });

        if wants_shield(&player) {
            if let Some(slot) = ready_slot(session, 0, |spell| SHIELDS.contains(&spell)) {
                commands.push(Command::SelectSpell { slot });
                commands.push(Command::CastCurrentSpell { aim: Vec3::Z });
                return commands;
            }
        }

        let Some(target) = target else {
            return commands;
        };
        let attack = ready_slot(session, self.preferred_slot, |spell| {
            spell.definition().launches_projectile()
        });
        if let Some(slot) = attack {
            let offset = planar(target) - planar(player.eye_position);
            commands.push(Command::SelectSpell { slot });
            commands.push(Command::CastCurrentSpell {
                aim: Vec3::new(offset.x, 0.0, offset.y),
            });
        }
        commands
    }

    /// Reacts to the events of the last step.
    pub(crate) fn observe(&mut self, events: &[Event]) {
        for event in events {
            if let Event::CastRejected { error } = event {
                if matches!(
                    error,
                    CastError::OnCooldown { .. } | CastError::InsufficientMana { .. }
                ) {
                    self.preferred_slot = (self.preferred_slot + 1) % SPELL_SLOT_COUNT;
                    log::debug!("autopilot moves on to slot {}", self.preferred_slot);
                }
            }
        }
    }

    fn equip_unlocked(&self, session: &Session) -> Vec<Command> {
        let slots = query::spell_slots(session);
        let mut empty = slots
            .iter()
            .filter(|view| view.spell.is_none())
            .map(|view| view.slot);
        query::unlocked_spells(session)
            .iter()
            .copied()
            .filter(|spell| spell.definition().launches_projectile())
            .filter(|spell| !slots.iter().any(|view| view.spell == Some(*spell)))
            .filter_map(|spell| empty.next().map(|slot| Command::EquipSpell { spell, slot }))
            .collect()
    }
}

/// Movement that keeps a target between the retreat and engage distances.
pub(crate) fn steer(offset: Vec2) -> Vec2 {
    let distance = offset.length();
    if distance > ENGAGE_DISTANCE {
        offset / distance
    } else if distance < RETREAT_DISTANCE && distance > f32::EPSILON {
        -offset / distance
    } else {
        Vec2::ZERO
    }
}

/// Whether the player is hurt enough to want the shield back up.
pub(crate) fn wants_shield(player: &PlayerView) -> bool {
    !player.shield_visible && player.health < player.max_health * SHIELD_HEALTH_FRACTION
}

fn nearest_target(session: &Session, from: Vec3) -> Option<Vec3> {
    let minions = query::minions(session)
        .into_iter()
        .filter(|minion| minion.health_fraction > 0.0)
        .map(|minion| minion.position);
    let boss = query::boss(session)
        .filter(|boss| boss.lifecycle == Lifecycle::Active)
        .map(|boss| boss.position);
    minions.chain(boss).min_by(|a, b| {
        let a = planar(*a).distance_squared(planar(from));
        let b = planar(*b).distance_squared(planar(from));
        a.total_cmp(&b)
    })
}

fn ready_slot(session: &Session, first: usize, accept: impl Fn(SpellId) -> bool) -> Option<usize> {
    let slots = query::spell_slots(session);
    (0..SPELL_SLOT_COUNT)
        .map(|offset| (first + offset) % SPELL_SLOT_COUNT)
        .find(|slot| {
            let view = &slots[*slot];
            view.cooldown_remaining.is_zero() && view.spell.map_or(false, &accept)
        })
}
