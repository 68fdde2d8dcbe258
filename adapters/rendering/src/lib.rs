#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Spell Arena adapters.
//!
//! The simulation never talks to a graphics stack. Adapters capture a [`Frame`]
//! from the session queries and hand it to a [`presenter::Presenter`], which
//! drives a [`Renderer`] and a [`ModelLoader`] supplied by the host.

pub mod headless;
pub mod presenter;

use std::{error::Error, fmt};

use glam::Vec3;
use spell_arena_core::{BodyPart, EntityId, PickupId, PickupKind, PotionKind, Rgb, SpellId};
use spell_arena_session::{query, Session};
use spell_arena_world::combat::Activity;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb(rgb: Rgb) -> Self {
        Self {
            red: rgb.red() as f32 / 255.0,
            green: rgb.green() as f32 / 255.0,
            blue: rgb.blue() as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Identity of a visual managed by the presenter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActorKey {
    /// The boss of the current encounter.
    Boss(EntityId),
    /// A wave minion.
    Minion(EntityId),
    /// A potion or spell pickup.
    Pickup(PickupId),
}

/// Placeholder geometry shown until a model is available.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Upright box of the provided size.
    Box {
        /// Edge lengths.
        size: Vec3,
    },
    /// Upright capsule.
    Capsule {
        /// Radius of the capsule.
        radius: f32,
        /// Total height.
        height: f32,
    },
    /// Small floating gem.
    Gem {
        /// Radius of the gem.
        radius: f32,
    },
}

/// Placement of a visual in the arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// World position.
    pub position: Vec3,
    /// Rotation about the vertical axis.
    pub yaw: f32,
    /// Uniform scale.
    pub scale: f32,
}

/// Animation clip requested from a loaded model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Clip {
    /// Standing still.
    Idle,
    /// Walking.
    Walk,
    /// Attacking or casting.
    Attack,
}

impl From<Activity> for Clip {
    fn from(activity: Activity) -> Self {
        match activity {
            Activity::Idle => Self::Idle,
            Activity::Walking => Self::Walk,
            Activity::Attacking => Self::Attack,
        }
    }
}

/// Colour overlay reflecting status effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tint {
    /// Natural colours.
    None,
    /// Frozen by a stun.
    Stunned,
    /// Calmed by a pacify window.
    Pacified,
    /// Briefly lit after taking damage.
    HitFlash,
}

impl Tint {
    /// Overlay colour, if any.
    #[must_use]
    pub fn color(self) -> Option<Color> {
        match self {
            Self::None => None,
            Self::Stunned => Some(Color::from_rgb(Rgb::from_hex(0x4444ff))),
            Self::Pacified => Some(Color::from_rgb(Rgb::from_hex(0x9400d3))),
            Self::HitFlash => Some(Color::new(1.0, 1.0, 1.0, 1.0)),
        }
    }

    fn from_overlays(flashing: bool, stunned: bool, pacified: bool) -> Self {
        if flashing {
            Self::HitFlash
        } else if stunned {
            Self::Stunned
        } else if pacified {
            Self::Pacified
        } else {
            Self::None
        }
    }
}

/// Handle to a model the loader finished loading.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LoadedModel {
    /// Asset key the model was requested with.
    pub key: String,
    /// Backend-specific handle.
    pub handle: u64,
}

/// Receipt for an in-flight model request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(u64);

impl LoadTicket {
    /// Creates a ticket with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the ticket.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Failure to load a model asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelLoadError {
    /// Asset key that failed.
    pub key: String,
    /// Description provided by the loader.
    pub reason: String,
}

impl fmt::Display for ModelLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load model {}: {}", self.key, self.reason)
    }
}

impl Error for ModelLoadError {}

/// Scene graph operations the presenter relies on.
pub trait Renderer {
    /// Shows a placeholder shape for a new actor.
    fn spawn_placeholder(
        &mut self,
        actor: ActorKey,
        shape: Shape,
        color: Color,
        transform: Transform,
    );

    /// Replaces the placeholder of `actor` with a loaded model.
    fn attach_model(&mut self, actor: ActorKey, model: &LoadedModel);

    /// Removes every visual belonging to `actor`.
    fn remove_visual(&mut self, actor: ActorKey);

    /// Moves, turns, and scales the visual.
    fn set_transform(&mut self, actor: ActorKey, transform: Transform);

    /// Starts an animation clip on a loaded model.
    fn play_clip(&mut self, actor: ActorKey, clip: Clip);

    /// Applies a status overlay.
    fn set_tint(&mut self, actor: ActorKey, tint: Tint);

    /// Recolours body parts of a loaded model.
    fn apply_palette(&mut self, actor: ActorKey, palette: &[(BodyPart, Rgb)]);
}

/// Asynchronous model loading.
pub trait ModelLoader {
    /// Starts loading `key` without blocking.
    fn request(&mut self, key: &str) -> LoadTicket;

    /// Returns every request that completed since the previous poll.
    fn poll(&mut self) -> Vec<(LoadTicket, Result<LoadedModel, ModelLoadError>)>;
}

/// Everything the presenter needs to know about one visual.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameActor {
    /// Identity of the visual.
    pub key: ActorKey,
    /// Placeholder geometry.
    pub shape: Shape,
    /// Placeholder colour.
    pub color: Color,
    /// Model to load, if any.
    pub model: Option<String>,
    /// Colour overrides applied once the model is attached.
    pub palette: Vec<(BodyPart, Rgb)>,
    /// Placement this frame.
    pub transform: Transform,
    /// Animation this frame.
    pub clip: Clip,
    /// Overlay this frame.
    pub tint: Tint,
}

/// Snapshot of every visual actor at one instant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    /// Actors in deterministic order: boss, minions, pickups.
    pub actors: Vec<FrameActor>,
}

impl Frame {
    /// Captures the boss, minions, and pickups of `session`.
    #[must_use]
    pub fn capture(session: &Session) -> Self {
        let mut actors = Vec::new();

        if let Some(boss) = query::boss(session) {
            actors.push(FrameActor {
                key: ActorKey::Boss(boss.id),
                shape: Shape::Box { size: boss.size },
                color: Color::from_rgb(boss.appearance.base_color),
                model: boss.appearance.model.clone(),
                palette: boss.appearance.palette.clone(),
                transform: Transform {
                    position: boss.position,
                    yaw: boss.facing,
                    scale: boss.appearance.scale * boss.presence,
                },
                clip: boss.activity.into(),
                tint: Tint::from_overlays(boss.flashing, boss.stunned, boss.pacified),
            });
        }

        for minion in query::minions(session) {
            actors.push(FrameActor {
                key: ActorKey::Minion(minion.id),
                shape: Shape::Capsule {
                    radius: 0.4,
                    height: 1.6,
                },
                color: Color::from_rgb(minion.appearance.base_color),
                model: minion.appearance.model.clone(),
                palette: minion.appearance.palette.clone(),
                transform: Transform {
                    position: minion.position,
                    yaw: minion.facing,
                    scale: minion.appearance.scale * minion.presence,
                },
                clip: minion.activity.into(),
                tint: Tint::from_overlays(minion.flashing, minion.stunned, false),
            });
        }

        for pickup in query::pickups(session) {
            actors.push(FrameActor {
                key: ActorKey::Pickup(pickup.id),
                shape: Shape::Gem { radius: 0.3 },
                color: Color::from_rgb(pickup_color(pickup.kind)),
                model: None,
                palette: Vec::new(),
                transform: Transform {
                    position: pickup.position,
                    yaw: 0.0,
                    scale: pickup.presence,
                },
                clip: Clip::Idle,
                tint: Tint::None,
            });
        }

        Self { actors }
    }
}

/// Colour of a pickup's gem.
#[must_use]
pub fn pickup_color(kind: PickupKind) -> Rgb {
    let hex = match kind {
        PickupKind::Potion(PotionKind::Health) => 0xff0000,
        PickupKind::Potion(PotionKind::Mana) => 0x00ffff,
        PickupKind::Potion(PotionKind::Attack) => 0x9900ff,
        PickupKind::Potion(PotionKind::Defense) => 0x00ff00,
        PickupKind::Spell(SpellId::ArrestoMomentum) => 0xffff00,
        PickupKind::Spell(SpellId::Bombarda) => 0xff6600,
        PickupKind::Spell(SpellId::BombardaMaxima) => 0xff0000,
        PickupKind::Spell(SpellId::Diffindo) => 0xc0c0c0,
        PickupKind::Spell(SpellId::SperoPatronum) => 0xadd8e6,
        PickupKind::Spell(SpellId::PetrificusTotalus) => 0x9370db,
        PickupKind::Spell(_) => 0xffd700,
    };
    Rgb::from_hex(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lighten_moves_channels_towards_white() {
        let color = Color::from_rgb(Rgb::from_hex(0x000000)).lighten(0.5);

        assert_eq!(color, Color::new(0.5, 0.5, 0.5, 1.0));
    }

    #[test]
    fn hit_flash_wins_over_status_overlays() {
        assert_eq!(Tint::from_overlays(true, true, true), Tint::HitFlash);
        assert_eq!(Tint::from_overlays(false, true, true), Tint::Stunned);
        assert_eq!(Tint::from_overlays(false, false, true), Tint::Pacified);
        assert_eq!(Tint::from_overlays(false, false, false), Tint::None);
    }

    #[test]
    fn spell_gems_use_their_own_colours() {
        assert_eq!(
            pickup_color(PickupKind::Spell(SpellId::Diffindo)),
            Rgb::from_hex(0xc0c0c0)
        );
        assert_eq!(
            pickup_color(PickupKind::Potion(PotionKind::Mana)),
            Rgb::from_hex(0x00ffff)
        );
    }
}
