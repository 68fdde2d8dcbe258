//! Static spell catalog.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Number of loadout slots exposed by a spell book.
pub const SPELL_SLOT_COUNT: usize = 4;

/// Identifier of a catalog spell.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SpellId {
    /// Short personal shield.
    Protego,
    /// Basic disarming bolt.
    Expelliarmus,
    /// Fire bolt that keeps burning.
    Incendio,
    /// Stunning bolt.
    Stupefix,
    /// Long personal shield.
    ProtegoMaxima,
    /// Heavy cutting curse.
    Sectumsempra,
    /// Pure stun without damage.
    ArrestoMomentum,
    /// Small blast.
    Bombarda,
    /// Large blast.
    BombardaMaxima,
    /// Severing charm.
    Diffindo,
    /// Longest shield.
    SperoPatronum,
    /// Body-bind that stuns and chips health.
    PetrificusTotalus,
    /// Control curse that pacifies its target.
    Impero,
    /// Torture curse dealing heavy damage over time.
    Endoloris,
    /// Killing curse removing a fraction of the target's health.
    AvadaKedavra,
}

impl SpellId {
    /// Every spell in catalog order.
    pub const ALL: [SpellId; 15] = [
        SpellId::Protego,
        SpellId::Expelliarmus,
        SpellId::Incendio,
        SpellId::Stupefix,
        SpellId::ProtegoMaxima,
        SpellId::Sectumsempra,
        SpellId::ArrestoMomentum,
        SpellId::Bombarda,
        SpellId::BombardaMaxima,
        SpellId::Diffindo,
        SpellId::SperoPatronum,
        SpellId::PetrificusTotalus,
        SpellId::Impero,
        SpellId::Endoloris,
        SpellId::AvadaKedavra,
    ];

    /// Static record describing the spell.
    #[must_use]
    pub fn definition(self) -> &'static SpellDefinition {
        &CATALOG[self as usize]
    }
}

/// Broad category that decides how a cast is delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellKind {
    /// Activates the caster's shield; no projectile.
    Shield,
    /// Single-target bolt.
    Projectile,
    /// Bolt carrying a damage-over-time effect.
    Dot,
    /// Bolt whose main payload is a stun.
    Stun,
    /// Bolt that also affects everything around the impact point.
    Aoe,
    /// Bolt that pacifies a boss.
    Control,
    /// Bolt removing a fraction of the target's current health.
    Instant,
}

/// Damage-over-time payload carried by a spell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DotSpec {
    /// Damage applied at every one-second tick.
    pub damage_per_second: f32,
    /// Total time the effect keeps ticking.
    pub duration: Duration,
}

/// Immutable catalog entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpellDefinition {
    /// Identifier of the entry.
    pub id: SpellId,
    /// Incantation shown to players.
    pub name: &'static str,
    /// Mana required to cast.
    pub mana_cost: f32,
    /// Delivery category.
    pub kind: SpellKind,
    /// Flat damage on hit; zero when the spell deals none.
    pub damage: f32,
    /// Fraction of the target's current health removed on hit.
    pub percent_damage: Option<f32>,
    /// Damage-over-time payload.
    pub dot: Option<DotSpec>,
    /// Stun applied on hit.
    pub stun: Option<Duration>,
    /// Pacify window applied on hit.
    pub pacify: Option<Duration>,
    /// Shield window granted to the caster.
    pub shield: Option<Duration>,
    /// Splash radius around the impact point.
    pub radius: Option<f32>,
    /// Minimum time between two casts.
    pub cooldown: Duration,
    /// End-game spell that is never granted by pickups.
    pub forbidden: bool,
}

impl SpellDefinition {
    /// Reports whether casting the spell launches a projectile.
    #[must_use]
    pub const fn launches_projectile(&self) -> bool {
        !matches!(self.kind, SpellKind::Shield)
    }
}

const fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

const BASE: SpellDefinition = SpellDefinition {
    id: SpellId::Protego,
    name: "",
    mana_cost: 0.0,
    kind: SpellKind::Projectile,
    damage: 0.0,
    percent_damage: None,
    dot: None,
    stun: None,
    pacify: None,
    shield: None,
    radius: None,
    cooldown: Duration::ZERO,
    forbidden: false,
};

static CATALOG: [SpellDefinition; 15] = [
    SpellDefinition {
        id: SpellId::Protego,
        name: "Protego",
        mana_cost: 10.0,
        kind: SpellKind::Shield,
        shield: Some(ms(3_000)),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::Expelliarmus,
        name: "Expelliarmus",
        mana_cost: 5.0,
        damage: 10.0,
        cooldown: ms(2_000),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::Incendio,
        name: "Incendio",
        mana_cost: 15.0,
        kind: SpellKind::Dot,
        damage: 15.0,
        dot: Some(DotSpec {
            damage_per_second: 5.0,
            duration: ms(10_000),
        }),
        cooldown: ms(5_000),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::Stupefix,
        name: "Stupefix",
        mana_cost: 20.0,
        damage: 50.0,
        stun: Some(ms(5_000)),
        cooldown: ms(7_000),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::ProtegoMaxima,
        name: "Protego Maxima",
        mana_cost: 30.0,
        kind: SpellKind::Shield,
        shield: Some(ms(10_000)),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::Sectumsempra,
        name: "Sectumsempra",
        mana_cost: 50.0,
        damage: 200.0,
        cooldown: ms(10_000),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::ArrestoMomentum,
        name: "Arresto Momentum",
        mana_cost: 10.0,
        kind: SpellKind::Stun,
        stun: Some(ms(5_000)),
        cooldown: ms(8_000),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::Bombarda,
        name: "Bombarda",
        mana_cost: 20.0,
        kind: SpellKind::Aoe,
        damage: 25.0,
        radius: Some(5.0),
        cooldown: ms(4_000),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::BombardaMaxima,
        name: "Bombarda Maxima",
        mana_cost: 50.0,
        kind: SpellKind::Aoe,
        damage: 50.0,
        radius: Some(15.0),
        cooldown: ms(8_000),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::Diffindo,
        name: "Diffindo",
        mana_cost: 25.0,
        damage: 30.0,
        cooldown: ms(3_000),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::SperoPatronum,
        name: "Spero Patronum",
        mana_cost: 50.0,
        kind: SpellKind::Shield,
        shield: Some(ms(15_000)),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::PetrificusTotalus,
        name: "Petrificus Totalus",
        mana_cost: 25.0,
        kind: SpellKind::Stun,
        damage: 10.0,
        stun: Some(ms(7_000)),
        cooldown: ms(6_000),
        ..BASE
    },
    SpellDefinition {
        id: SpellId::Impero,
        name: "Impero",
        mana_cost: 100.0,
        kind: SpellKind::Control,
        pacify: Some(ms(10_000)),
        cooldown: ms(15_000),
        forbidden: true,
        ..BASE
    },
    SpellDefinition {
        id: SpellId::Endoloris,
        name: "Endoloris",
        mana_cost: 100.0,
        kind: SpellKind::Dot,
        damage: 100.0,
        dot: Some(DotSpec {
            damage_per_second: 10.0,
            duration: ms(5_000),
        }),
        cooldown: ms(12_000),
        forbidden: true,
        ..BASE
    },
    SpellDefinition {
        id: SpellId::AvadaKedavra,
        name: "Avada Kedavra",
        mana_cost: 200.0,
        kind: SpellKind::Instant,
        percent_damage: Some(0.5),
        cooldown: ms(20_000),
        forbidden: true,
        ..BASE
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_indexed_by_identifier() {
        for spell in SpellId::ALL {
            assert_eq!(spell.definition().id, spell);
        }
    }

    #[test]
    fn only_shields_skip_projectiles() {
        for spell in SpellId::ALL {
            let definition = spell.definition();
            assert_eq!(
                definition.launches_projectile(),
                definition.shield.is_none(),
                "{}",
                definition.name
            );
        }
    }

    #[test]
    fn forbidden_spells_are_the_end_game_curses() {
        let forbidden: Vec<SpellId> = SpellId::ALL
            .into_iter()
            .filter(|spell| spell.definition().forbidden)
            .collect();
        assert_eq!(
            forbidden,
            vec![SpellId::Impero, SpellId::Endoloris, SpellId::AvadaKedavra]
        );
    }
}
