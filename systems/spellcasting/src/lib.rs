#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spell book, cooldown bookkeeping, and on-hit effect resolution.

use std::{collections::BTreeMap, time::Duration};

use spell_arena_core::{CastError, SpellDefinition, SpellId, Timestamp, SPELL_SLOT_COUNT};
use spell_arena_world::{combat::Combatant, player::ShieldEffect};
use thiserror::Error;

const STARTER_SPELLS: [SpellId; 2] = [SpellId::Protego, SpellId::Expelliarmus];

/// Reasons a loadout change was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum EquipError {
    /// The spell has not been unlocked yet.
    #[error("{0:?} is locked")]
    Locked(SpellId),
    /// The slot index is outside the loadout.
    #[error("slot {0} is outside the loadout")]
    SlotOutOfRange(usize),
}

/// Earliest next-cast timestamp per spell.
///
/// A spell without an entry is ready.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CooldownTable {
    ready_at: BTreeMap<SpellId, Timestamp>,
}

impl CooldownTable {
    /// Starts the cooldown of `spell` at `now`.
    pub fn start(&mut self, spell: SpellId, cooldown: Duration, now: Timestamp) {
        if cooldown.is_zero() {
            return;
        }
        let _ = self.ready_at.insert(spell, now.advanced_by(cooldown));
    }

    /// Time left before `spell` can be cast again.
    #[must_use]
    pub fn remaining(&self, spell: SpellId, now: Timestamp) -> Duration {
        self.ready_at
            .get(&spell)
            .map_or(Duration::ZERO, |ready| ready.saturating_duration_since(now))
    }

    /// Forgets every cooldown.
    pub fn clear(&mut self) {
        self.ready_at.clear();
    }
}

/// Unlocked spells, the four-slot loadout, and their cooldowns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpellBook {
    unlocked: Vec<SpellId>,
    slots: [Option<SpellId>; SPELL_SLOT_COUNT],
    active_slot: usize,
    cooldowns: CooldownTable,
}

impl Default for SpellBook {
    fn default() -> Self {
        let mut slots = [None; SPELL_SLOT_COUNT];
        for (slot, spell) in slots.iter_mut().zip(STARTER_SPELLS) {
            *slot = Some(spell);
        }
        Self {
            unlocked: STARTER_SPELLS.to_vec(),
            slots,
            active_slot: 0,
            cooldowns: CooldownTable::default(),
        }
    }
}

impl SpellBook {
    /// Creates the starter book with the shield and the disarming bolt equipped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the starter book and clears every cooldown.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Adds a spell to the unlocked set; returns `true` when it was new.
    pub fn unlock_spell(&mut self, spell: SpellId) -> bool {
        if self.is_unlocked(spell) {
            return false;
        }
        self.unlocked.push(spell);
        log::info!("unlocked {}", spell.definition().name);
        true
    }

    /// Unlocks the whole catalog and returns the spells that were new.
    pub fn unlock_all(&mut self) -> Vec<SpellId> {
        SpellId::ALL
            .into_iter()
            .filter(|spell| self.unlock_spell(*spell))
            .collect()
    }

    /// Reports whether `spell` is unlocked.
    #[must_use]
    pub fn is_unlocked(&self, spell: SpellId) -> bool {
        self.unlocked.contains(&spell)
    }

    /// Unlocked spells in unlock order.
    #[must_use]
    pub fn unlocked(&self) -> &[SpellId] {
        &self.unlocked
    }

    /// Loadout slots.
    #[must_use]
    pub const fn slots(&self) -> &[Option<SpellId>; SPELL_SLOT_COUNT] {
        &self.slots
    }

    /// Index of the slot that casts.
    #[must_use]
    pub const fn active_slot(&self) -> usize {
        self.active_slot
    }

    /// Spell in the active slot.
    #[must_use]
    pub fn current_spell(&self) -> Option<SpellId> {
        self.slots[self.active_slot]
    }

    /// Places an unlocked spell into a loadout slot.
    pub fn equip_spell(&mut self, spell: SpellId, slot: usize) -> Result<(), EquipError> {
        if !self.is_unlocked(spell) {
            return Err(EquipError::Locked(spell));
        }
        let target = self
            .slots
            .get_mut(slot)
            .ok_or(EquipError::SlotOutOfRange(slot))?;
        *target = Some(spell);
        Ok(())
    }

    /// Makes `slot` the active slot; returns `false` when it is out of range.
    pub fn select_spell(&mut self, slot: usize) -> bool {
        if slot >= SPELL_SLOT_COUNT {
            return false;
        }
        self.active_slot = slot;
        true
    }

    /// Time left before `spell` can be cast again.
    #[must_use]
    pub fn cooldown_remaining(&self, spell: SpellId, now: Timestamp) -> Duration {
        self.cooldowns.remaining(spell, now)
    }

    /// Validates and commits a cast of the active spell.
    ///
    /// On success the cooldown starts and shield spells raise `shield`
    /// immediately. Deducting mana and launching any projectile is left to the
    /// caller.
    pub fn cast_current_spell(
        &mut self,
        mana: f32,
        now: Timestamp,
        shield: &mut ShieldEffect,
    ) -> Result<&'static SpellDefinition, CastError> {
        let spell = self.current_spell().ok_or(CastError::NoSpellEquipped)?;
        let definition = spell.definition();

        let remaining = self.cooldowns.remaining(spell, now);
        if !remaining.is_zero() {
            return Err(CastError::OnCooldown {
                spell,
                remaining_secs: remaining.as_secs_f32(),
            });
        }
        if mana < definition.mana_cost {
            return Err(CastError::InsufficientMana {
                spell,
                required: definition.mana_cost,
                available: mana,
            });
        }

        self.cooldowns.start(spell, definition.cooldown, now);
        if let Some(duration) = definition.shield {
            shield.activate(duration, now);
        }
        log::debug!("cast {}", definition.name);
        Ok(definition)
    }
}

/// Effects a spell applied to a single target.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HitReport {
    /// Health removed immediately.
    pub damage: f32,
    /// A damage-over-time effect was started.
    pub dot_applied: bool,
    /// A stun was applied.
    pub stunned: bool,
    /// The target accepted a pacify window.
    pub pacified: bool,
}

/// Applies a spell's payload to a struck target.
///
/// Percent damage is terminal. Otherwise a pacify window replaces flat damage,
/// and damage over time and stun follow whichever branch ran. Flat damage and
/// damage over time are scaled by `attack_multiplier`.
pub fn resolve_hit<T: Combatant + ?Sized>(
    spell: &SpellDefinition,
    target: &mut T,
    attack_multiplier: f32,
    now: Timestamp,
) -> HitReport {
    let mut report = HitReport::default();
    if !target.is_alive() {
        return report;
    }

    if let Some(percent) = spell.percent_damage {
        report.damage = target.take_damage(target.health() * percent, now);
        return report;
    }

    if let Some(window) = spell.pacify {
        report.pacified = target.pacify(window, now);
    } else if spell.damage > 0.0 {
        report.damage = target.take_damage(spell.damage * attack_multiplier, now);
    }

    if let Some(dot) = spell.dot {
        target.apply_dot(dot.damage_per_second * attack_multiplier, dot.duration, now);
        report.dot_applied = true;
    }
    if let Some(stun) = spell.stun {
        target.stun(stun, now);
        report.stunned = true;
    }
    report
}
