#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Spell Arena engine.
//!
//! This crate defines the message surface that connects adapters, the
//! simulation session, and the systems it drives. Adapters submit [`Command`]
//! values describing player intent, the session executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values describing
//! what happened during the tick. Shared value types such as [`Timestamp`],
//! [`HealthPool`], and the static spell catalog live here so every crate
//! speaks the same vocabulary.

pub mod spells;
pub mod time;

use std::collections::BTreeMap;
use std::time::Duration;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use spells::{DotSpec, SpellDefinition, SpellId, SpellKind, SPELL_SLOT_COUNT};
pub use time::{duration_millis, Easing, Timestamp, Transition};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to the Spell Arena.";

/// Persisted flag recording that the hard progression was completed once.
pub const HARD_MODE_COMPLETED_FLAG: &str = "hard_mode_completed";

/// Random stream label used by the obstacle field.
pub const RNG_STREAM_OBSTACLES: &str = "obstacles";
/// Random stream label used by the encounter director.
pub const RNG_STREAM_DIRECTOR: &str = "director";
/// Random stream label used by the pickup economy.
pub const RNG_STREAM_PICKUPS: &str = "pickups";

/// Commands that express every permissible input into a session.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Updates the player's movement intent in the ground plane.
    Move {
        /// Desired direction in world `(x, z)`; the length is clamped to one.
        direction: Vec2,
    },
    /// Attempts to cast the spell in the active loadout slot.
    CastCurrentSpell {
        /// Direction the resulting projectile should travel.
        aim: Vec3,
    },
    /// Selects the active loadout slot.
    SelectSpell {
        /// Zero-based slot index.
        slot: usize,
    },
    /// Places an unlocked spell into a loadout slot.
    EquipSpell {
        /// Spell to equip.
        spell: SpellId,
        /// Zero-based slot index.
        slot: usize,
    },
    /// Discards the current run and returns to the idle state.
    ResetGame,
}

/// Events broadcast by the session after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that a new run began.
    RunStarted {
        /// Difficulty chosen for the run.
        difficulty: Difficulty,
    },
    /// Confirms that the active spell was cast.
    SpellCast {
        /// Spell that was cast.
        spell: SpellId,
        /// Mana deducted from the player.
        mana_cost: f32,
    },
    /// Reports a cast attempt that failed validation.
    CastRejected {
        /// Reason the cast was refused.
        error: CastError,
    },
    /// Reports that a player projectile struck an entity.
    ProjectileImpact {
        /// Entity that absorbed the hit.
        target: EntityId,
        /// Spell carried by the projectile.
        spell: SpellId,
        /// Immediate damage applied by the hit.
        damage: f32,
    },
    /// Reports damage dealt to the player.
    PlayerDamaged {
        /// Health actually removed; zero when a shield absorbed the hit.
        amount: f32,
        /// Origin of the damage.
        source: DamageSource,
    },
    /// Confirms that a minion wave entered the arena.
    MinionWaveSpawned {
        /// Encounter index the wave guards.
        encounter: usize,
        /// Number of minions spawned.
        count: u32,
    },
    /// Reports that a minion died.
    MinionSlain {
        /// Identifier of the fallen minion.
        minion: EntityId,
        /// Minions still alive in the wave.
        remaining: u32,
    },
    /// Announces that help markers appeared above the remaining minions.
    HelpMarkersShown {
        /// Number of minions that received a marker.
        count: u32,
    },
    /// Confirms that a boss entered the arena.
    BossSpawned {
        /// Identifier of the boss.
        boss: EntityId,
        /// Display name of the boss.
        name: String,
        /// Encounter index of the boss.
        encounter: usize,
    },
    /// Reports that the active boss was beaten.
    BossDefeated {
        /// Identifier of the boss.
        boss: EntityId,
        /// Display name of the boss.
        name: String,
        /// `true` when the boss escaped instead of dying.
        escaped: bool,
    },
    /// Confirms that a spell joined the player's unlocked set.
    SpellUnlocked {
        /// Newly unlocked spell.
        spell: SpellId,
    },
    /// Reports that the player's maxima increased.
    PlayerLevelledUp {
        /// New maximum health.
        max_health: f32,
        /// New maximum mana.
        max_mana: f32,
    },
    /// Confirms that a pickup appeared on the field.
    PickupSpawned {
        /// Identifier of the pickup.
        pickup: PickupId,
        /// Contents of the pickup.
        kind: PickupKind,
    },
    /// Confirms that the player collected a pickup.
    PickupCollected {
        /// Identifier of the pickup.
        pickup: PickupId,
        /// Contents of the pickup.
        kind: PickupKind,
    },
    /// Reports that the living maze started toggling hedges.
    MazeShifted {
        /// Number of hedges that began moving.
        toggled: u32,
    },
    /// Confirms that the obstacle field was rebuilt from a fresh seed.
    ObstaclesRegenerated,
    /// Signals that the linear progression was completed.
    Victory {
        /// Final statistics of the run.
        stats: RunStats,
    },
    /// Signals that the player died.
    GameOver {
        /// Final statistics of the run.
        stats: RunStats,
    },
}

/// Origin of damage applied to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DamageSource {
    /// Boss contact attack.
    BossMelee,
    /// Boss spell projectile.
    BossProjectile,
    /// Minion contact attack.
    MinionMelee,
}

/// Reasons a cast attempt may be refused.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum CastError {
    /// The active loadout slot is empty.
    #[error("no spell equipped in the active slot")]
    NoSpellEquipped,
    /// The spell is still recharging.
    #[error("{spell:?} is on cooldown for another {remaining_secs:.1}s")]
    OnCooldown {
        /// Spell that was attempted.
        spell: SpellId,
        /// Seconds until the spell can be cast again.
        remaining_secs: f32,
    },
    /// The caster lacks the mana to pay for the spell.
    #[error("{spell:?} needs {required} mana but only {available} is available")]
    InsufficientMana {
        /// Spell that was attempted.
        spell: SpellId,
        /// Mana cost of the spell.
        required: f32,
        /// Mana held by the caster.
        available: f32,
    },
}

/// Difficulty selected for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Linear progression with health regeneration.
    #[default]
    Normal,
    /// Linear progression with stronger bosses and no regeneration.
    Hard,
    /// Endless random bosses with every spell unlocked.
    Infinite,
}

impl Difficulty {
    /// Multiplier applied to boss health and damage.
    #[must_use]
    pub const fn boss_stat_multiplier(self) -> f32 {
        match self {
            Self::Normal => 1.0,
            Self::Hard | Self::Infinite => 1.1,
        }
    }

    /// Reports whether the player regenerates health over time.
    #[must_use]
    pub const fn regenerates_health(self) -> bool {
        matches!(self, Self::Normal)
    }

    /// Reports whether the run follows the fixed boss order.
    #[must_use]
    pub const fn is_linear(self) -> bool {
        !matches!(self, Self::Infinite)
    }
}

/// Unique identifier assigned to a boss or minion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(u32);

impl ObstacleId {
    /// Creates a new obstacle identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PickupId(u32);

impl PickupId {
    /// Creates a new pickup identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single navigation cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Chebyshev distance between two cell coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column()
            .abs_diff(other.column())
            .max(self.row().abs_diff(other.row()))
    }
}

/// Colour expressed as byte RGB components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    red: u8,
    green: u8,
    blue: u8,
}

impl Rgb {
    /// Creates a colour from byte RGB components.
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Creates a colour from a packed `0xRRGGBB` value.
    #[must_use]
    pub const fn from_hex(value: u32) -> Self {
        Self {
            red: ((value >> 16) & 0xff) as u8,
            green: ((value >> 8) & 0xff) as u8,
            blue: (value & 0xff) as u8,
        }
    }

    /// Red component of the colour.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Green component of the colour.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Blue component of the colour.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

/// Semantic body regions a renderer may recolour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    /// Outer garment.
    Robe,
    /// Exposed skin.
    Skin,
    /// Eyes.
    Eyes,
    /// Hair.
    Hair,
    /// Trim and secondary details.
    Accent,
}

/// Visual description attached to a boss or minion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    /// Model the renderer should load; `None` keeps the placeholder shape.
    pub model: Option<String>,
    /// Colour of the placeholder shape.
    pub base_color: Rgb,
    /// Uniform scale applied to the visual.
    pub scale: f32,
    /// Colour overrides applied once the model is available.
    pub palette: Vec<(BodyPart, Rgb)>,
}

impl Appearance {
    /// Creates an appearance that only uses a placeholder shape.
    #[must_use]
    pub fn placeholder(base_color: Rgb) -> Self {
        Self {
            model: None,
            base_color,
            scale: 1.0,
            palette: Vec::new(),
        }
    }

    /// Returns a copy scaled by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            scale: self.scale * factor,
            ..self.clone()
        }
    }
}

/// Bounded health or mana reservoir.
///
/// The current value always lies in `[0, maximum]`; every mutator clamps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthPool {
    current: f32,
    maximum: f32,
}

impl HealthPool {
    /// Creates a full pool with the provided maximum.
    #[must_use]
    pub fn full(maximum: f32) -> Self {
        let maximum = maximum.max(0.0);
        Self {
            current: maximum,
            maximum,
        }
    }

    /// Current amount held by the pool.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Upper bound of the pool.
    #[must_use]
    pub const fn maximum(&self) -> f32 {
        self.maximum
    }

    /// Current amount as a fraction of the maximum.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.maximum <= 0.0 {
            0.0
        } else {
            self.current / self.maximum
        }
    }

    /// Reports whether the pool is empty.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    /// Removes up to `amount` and returns the quantity actually removed.
    pub fn deplete(&mut self, amount: f32) -> f32 {
        let applied = amount.max(0.0).min(self.current);
        self.current -= applied;
        applied
    }

    /// Adds up to `amount` and returns the quantity actually added.
    pub fn restore(&mut self, amount: f32) -> f32 {
        let applied = amount.max(0.0).min(self.maximum - self.current);
        self.current += applied;
        applied
    }

    /// Raises the current value to at least `floor`, never above the maximum.
    pub fn raise_to(&mut self, floor: f32) {
        self.current = self.current.max(floor).min(self.maximum);
    }

    /// Increases the maximum by `amount` without touching the current value.
    pub fn extend_maximum(&mut self, amount: f32) {
        self.maximum = (self.maximum + amount).max(0.0);
        self.current = self.current.min(self.maximum);
    }

    /// Sets the current value to the maximum.
    pub fn refill(&mut self) {
        self.current = self.maximum;
    }
}

/// Consumable potion varieties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotionKind {
    /// Restores health.
    Health,
    /// Restores mana.
    Mana,
    /// Temporarily multiplies outgoing spell damage.
    Attack,
    /// Temporarily reduces incoming damage.
    Defense,
}

impl PotionKind {
    /// Every potion kind.
    pub const ALL: [PotionKind; 4] = [
        PotionKind::Health,
        PotionKind::Mana,
        PotionKind::Attack,
        PotionKind::Defense,
    ];
}

/// Contents of a collectible pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupKind {
    /// Consumable potion.
    Potion(PotionKind),
    /// Spell scroll that unlocks a spell.
    Spell(SpellId),
}

/// Final statistics reported when a run ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Player health at the end of the run.
    pub health: f32,
    /// Player maximum health at the end of the run.
    pub max_health: f32,
    /// Player mana at the end of the run.
    pub mana: f32,
    /// Player maximum mana at the end of the run.
    pub max_mana: f32,
    /// Spells unlocked during the run, in unlock order.
    pub spells_unlocked: Vec<SpellId>,
    /// Bosses beaten in the linear progression.
    pub bosses_defeated: u32,
    /// Minions slain across every wave.
    pub minions_slain: u32,
    /// Bosses beaten in infinite mode.
    pub infinite_kills: u32,
    /// Simulated time the run lasted.
    pub elapsed_ms: u64,
}

/// Key-value store for flags that outlive a single run.
pub trait FlagStore {
    /// Reads a flag; absent flags read as `false`.
    fn read_flag(&self, key: &str) -> Result<bool, FlagStoreError>;

    /// Writes a flag.
    fn write_flag(&mut self, key: &str, value: bool) -> Result<(), FlagStoreError>;
}

/// Failures reported by a [`FlagStore`].
#[derive(Debug, Error)]
pub enum FlagStoreError {
    /// The backing storage could not be read or written.
    #[error("flag storage unavailable: {0}")]
    Unavailable(String),
}

/// In-memory flag store used by tests and ephemeral sessions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryFlagStore {
    flags: BTreeMap<String, bool>,
}

impl MemoryFlagStore {
    /// Creates a store seeded with the provided flags.
    #[must_use]
    pub fn with_flags<I>(flags: I) -> Self
    where
        I: IntoIterator<Item = (String, bool)>,
    {
        Self {
            flags: flags.into_iter().collect(),
        }
    }
}

impl FlagStore for MemoryFlagStore {
    fn read_flag(&self, key: &str) -> Result<bool, FlagStoreError> {
        Ok(self.flags.get(key).copied().unwrap_or(false))
    }

    fn write_flag(&mut self, key: &str, value: bool) -> Result<(), FlagStoreError> {
        let _ = self.flags.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Derives an independent seed for a labelled random stream.
///
/// Components draw from their own stream so adding a consumer never shifts the
/// sequence observed by another.
#[must_use]
pub fn derive_stream_seed(master: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(master.to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}
