//! Renderer and model loader that run without a graphics stack.

use std::collections::BTreeSet;

use crate::{
    ActorKey, Clip, Color, LoadTicket, LoadedModel, ModelLoadError, ModelLoader, Renderer, Shape,
    Tint, Transform,
};
use spell_arena_core::{BodyPart, Rgb};

/// One renderer call captured by [`RecordingRenderer`].
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCall {
    /// A placeholder appeared.
    SpawnPlaceholder {
        /// Actor that received it.
        actor: ActorKey,
        /// Geometry of the placeholder.
        shape: Shape,
        /// Colour of the placeholder.
        color: Color,
        /// Initial placement.
        transform: Transform,
    },
    /// A model replaced the placeholder.
    AttachModel {
        /// Actor that received it.
        actor: ActorKey,
        /// Asset key of the model.
        model: String,
    },
    /// An actor was removed.
    RemoveVisual {
        /// Removed actor.
        actor: ActorKey,
    },
    /// An actor moved.
    SetTransform {
        /// Moved actor.
        actor: ActorKey,
        /// New placement.
        transform: Transform,
    },
    /// An animation started.
    PlayClip {
        /// Animated actor.
        actor: ActorKey,
        /// Clip that started.
        clip: Clip,
    },
    /// An overlay changed.
    SetTint {
        /// Tinted actor.
        actor: ActorKey,
        /// New overlay.
        tint: Tint,
    },
    /// Body parts were recoloured.
    ApplyPalette {
        /// Recoloured actor.
        actor: ActorKey,
        /// Applied overrides.
        palette: Vec<(BodyPart, Rgb)>,
    },
}

/// Renderer that records every call for inspection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordingRenderer {
    calls: Vec<RenderCall>,
}

impl RecordingRenderer {
    /// Calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    /// Forgets the recorded calls.
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Renderer for RecordingRenderer {
    fn spawn_placeholder(
        &mut self,
        actor: ActorKey,
        shape: Shape,
        color: Color,
        transform: Transform,
    ) {
        self.calls.push(RenderCall::SpawnPlaceholder {
            actor,
            shape,
            color,
            transform,
        });
    }

    fn attach_model(&mut self, actor: ActorKey, model: &LoadedModel) {
        self.calls.push(RenderCall::AttachModel {
            actor,
            model: model.key.clone(),
        });
    }

    fn remove_visual(&mut self, actor: ActorKey) {
        self.calls.push(RenderCall::RemoveVisual { actor });
    }

    fn set_transform(&mut self, actor: ActorKey, transform: Transform) {
        self.calls.push(RenderCall::SetTransform { actor, transform });
    }

    fn play_clip(&mut self, actor: ActorKey, clip: Clip) {
        self.calls.push(RenderCall::PlayClip { actor, clip });
    }

    fn set_tint(&mut self, actor: ActorKey, tint: Tint) {
        self.calls.push(RenderCall::SetTint { actor, tint });
    }

    fn apply_palette(&mut self, actor: ActorKey, palette: &[(BodyPart, Rgb)]) {
        self.calls.push(RenderCall::ApplyPalette {
            actor,
            palette: palette.to_vec(),
        });
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingLoad {
    ticket: LoadTicket,
    key: String,
    polls_left: u32,
}

/// Loader whose requests complete after a fixed number of polls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeferredModelLoader {
    delay: u32,
    failing: BTreeSet<String>,
    pending: Vec<PendingLoad>,
    next_ticket: u64,
}

impl DeferredModelLoader {
    /// Creates a loader that resolves each request on its `delay + 1`-th poll.
    #[must_use]
    pub fn new(delay: u32) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Makes every request for `key` fail.
    #[must_use]
    pub fn failing(mut self, key: &str) -> Self {
        let _ = self.failing.insert(key.to_owned());
        self
    }

    /// Requests that have not resolved yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

impl ModelLoader for DeferredModelLoader {
    fn request(&mut self, key: &str) -> LoadTicket {
        let ticket = LoadTicket::new(self.next_ticket);
        self.next_ticket += 1;
        self.pending.push(PendingLoad {
            ticket,
            key: key.to_owned(),
            polls_left: self.delay,
        });
        ticket
    }

    fn poll(&mut self) -> Vec<(LoadTicket, Result<LoadedModel, ModelLoadError>)> {
        let mut completed = Vec::new();
        let failing = &self.failing;
        self.pending.retain_mut(|load| {
            if load.polls_left > 0 {
                load.polls_left -= 1;
                return true;
            }
            let outcome = if failing.contains(&load.key) {
                Err(ModelLoadError {
                    key: load.key.clone(),
                    reason: "asset not found".to_owned(),
                })
            } else {
                Ok(LoadedModel {
                    key: load.key.clone(),
                    handle: load.ticket.get(),
                })
            };
            completed.push((load.ticket, outcome));
            false
        });
        completed
    }
}
