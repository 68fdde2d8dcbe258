//! Keeps a renderer's scene graph in step with simulation frames.

use std::collections::BTreeMap;

use crate::{ActorKey, Clip, Frame, LoadTicket, ModelLoader, Renderer, Tint};
use spell_arena_core::{BodyPart, Rgb};

#[derive(Clone, Debug, PartialEq)]
struct ActorState {
    palette: Vec<(BodyPart, Rgb)>,
    model_attached: bool,
    clip: Option<Clip>,
    tint: Tint,
}

/// Diffs successive frames into renderer calls.
///
/// New actors appear as placeholders right away and request their model.
/// A completed load swaps the model in; a failed one keeps the placeholder.
/// Loads that finish after their actor vanished are dropped.
#[derive(Clone, Debug, Default)]
pub struct Presenter {
    actors: BTreeMap<ActorKey, ActorState>,
    pending: BTreeMap<LoadTicket, ActorKey>,
}

impl Presenter {
    /// Creates a presenter with an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actors currently shown.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Number of model loads still awaited.
    #[must_use]
    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// Reports whether `actor` shows its loaded model.
    #[must_use]
    pub fn has_model(&self, actor: ActorKey) -> bool {
        self.actors
            .get(&actor)
            .map_or(false, |state| state.model_attached)
    }

    /// Applies `frame` to `renderer`, resolving loads reported by `loader`.
    pub fn sync<R, L>(&mut self, frame: &Frame, renderer: &mut R, loader: &mut L)
    where
        R: Renderer + ?Sized,
        L: ModelLoader + ?Sized,
    {
        let present: Vec<ActorKey> = frame.actors.iter().map(|actor| actor.key).collect();
        let vanished: Vec<ActorKey> = self
            .actors
            .keys()
            .copied()
            .filter(|key| !present.contains(key))
            .collect();
        for key in vanished {
            let _ = self.actors.remove(&key);
            self.pending.retain(|_, pending| *pending != key);
            renderer.remove_visual(key);
        }

        for (ticket, outcome) in loader.poll() {
            let Some(key) = self.pending.remove(&ticket) else {
                continue;
            };
            let Some(state) = self.actors.get_mut(&key) else {
                continue;
            };
            match outcome {
                Ok(model) => {
                    renderer.attach_model(key, &model);
                    if !state.palette.is_empty() {
                        renderer.apply_palette(key, &state.palette);
                    }
                    state.model_attached = true;
                    state.clip = None;
                }
                Err(error) => {
                    log::warn!("keeping the placeholder for {key:?}: {error}");
                }
            }
        }

        for actor in &frame.actors {
            if self.actors.contains_key(&actor.key) {
                renderer.set_transform(actor.key, actor.transform);
            } else {
                renderer.spawn_placeholder(actor.key, actor.shape, actor.color, actor.transform);
                if let Some(model) = &actor.model {
                    let ticket = loader.request(model);
                    let _ = self.pending.insert(ticket, actor.key);
                }
                let _ = self.actors.insert(
                    actor.key,
                    ActorState {
                        palette: actor.palette.clone(),
                        model_attached: false,
                        clip: None,
                        tint: Tint::None,
                    },
                );
            }
            let Some(state) = self.actors.get_mut(&actor.key) else {
                continue;
            };

            if state.model_attached && state.clip != Some(actor.clip) {
                renderer.play_clip(actor.key, actor.clip);
                state.clip = Some(actor.clip);
            }
            if state.tint != actor.tint {
                renderer.set_tint(actor.key, actor.tint);
                state.tint = actor.tint;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        headless::{DeferredModelLoader, RenderCall, RecordingRenderer},
        Color, FrameActor, Shape, Transform,
    };
    use glam::Vec3;
    use spell_arena_core::EntityId;

    fn boss_actor(model: &str, tint: Tint) -> FrameActor {
        FrameActor {
            key: ActorKey::Boss(EntityId::new(1)),
            shape: Shape::Box {
                size: Vec3::new(1.0, 2.0, 1.0),
            },
            color: Color::new(0.5, 0.0, 1.0, 1.0),
            model: Some(model.to_owned()),
            palette: vec![(BodyPart::Robe, Rgb::from_hex(0x0f0f0f))],
            transform: Transform {
                position: Vec3::new(3.0, 0.0, 4.0),
                yaw: 0.0,
                scale: 1.0,
            },
            clip: Clip::Walk,
            tint,
        }
    }

    fn frame(actors: Vec<FrameActor>) -> Frame {
        Frame { actors }
    }

    #[test]
    fn placeholder_then_model_with_palette() {
        let mut presenter = Presenter::new();
        let mut renderer = RecordingRenderer::default();
        let mut loader = DeferredModelLoader::new(0);
        let key = ActorKey::Boss(EntityId::new(1));
        let current = frame(vec![boss_actor("models/AnimatedWizard.glb", Tint::None)]);

        presenter.sync(&current, &mut renderer, &mut loader);
        assert!(matches!(
            renderer.calls(),
            [RenderCall::SpawnPlaceholder { .. }]
        ));
        assert_eq!(presenter.pending_loads(), 1);

        renderer.clear();
        presenter.sync(&current, &mut renderer, &mut loader);

        assert!(presenter.has_model(key));
        assert_eq!(
            renderer.calls()[..3],
            [
                RenderCall::AttachModel {
                    actor: key,
                    model: "models/AnimatedWizard.glb".to_owned(),
                },
                RenderCall::ApplyPalette {
                    actor: key,
                    palette: vec![(BodyPart::Robe, Rgb::from_hex(0x0f0f0f))],
                },
                RenderCall::SetTransform {
                    actor: key,
                    transform: current.actors[0].transform,
                },
            ]
        );
        assert!(renderer.calls().contains(&RenderCall::PlayClip {
            actor: key,
            clip: Clip::Walk,
        }));
    }

    #[test]
    fn failed_load_keeps_the_placeholder() {
        let mut presenter = Presenter::new();
        let mut renderer = RecordingRenderer::default();
        let mut loader = DeferredModelLoader::new(0).failing("models/Missing.glb");
        let key = ActorKey::Boss(EntityId::new(1));
        let current = frame(vec![boss_actor("models/Missing.glb", Tint::Stunned)]);

        presenter.sync(&current, &mut renderer, &mut loader);
        presenter.sync(&current, &mut renderer, &mut loader);

        assert!(!presenter.has_model(key));
        assert_eq!(presenter.pending_loads(), 0);
        assert!(!renderer.calls().iter().any(|call| matches!(
            call,
            RenderCall::AttachModel { .. } | RenderCall::PlayClip { .. }
        )));
        assert!(renderer.calls().contains(&RenderCall::SetTint {
            actor: key,
            tint: Tint::Stunned,
        }));
    }

    #[test]
    fn late_load_for_a_removed_actor_is_ignored() {
        let mut presenter = Presenter::new();
        let mut renderer = RecordingRenderer::default();
        let mut loader = DeferredModelLoader::new(2);
        let key = ActorKey::Boss(EntityId::new(1));

        presenter.sync(
            &frame(vec![boss_actor("models/Ghost.glb", Tint::None)]),
            &mut renderer,
            &mut loader,
        );
        presenter.sync(&Frame::default(), &mut renderer, &mut loader);
        assert!(renderer
            .calls()
            .contains(&RenderCall::RemoveVisual { actor: key }));
        assert_eq!(presenter.pending_loads(), 0);

        renderer.clear();
        for _ in 0..3 {
            presenter.sync(&Frame::default(), &mut renderer, &mut loader);
        }
        assert!(renderer.calls().is_empty());
        assert_eq!(presenter.actor_count(), 0);
    }

    #[test]
    fn tint_changes_are_only_sent_once() {
        let mut presenter = Presenter::new();
        let mut renderer = RecordingRenderer::default();
        let mut loader = DeferredModelLoader::new(5);
        let key = ActorKey::Boss(EntityId::new(1));

        for _ in 0..3 {
            presenter.sync(
                &frame(vec![boss_actor("models/Witch.glb", Tint::HitFlash)]),
                &mut renderer,
                &mut loader,
            );
        }
        presenter.sync(
            &frame(vec![boss_actor("models/Witch.glb", Tint::None)]),
            &mut renderer,
            &mut loader,
        );

        let tints: Vec<Tint> = renderer
            .calls()
            .iter()
            .filter_map(|call| match call {
                RenderCall::SetTint { actor, tint } if *actor == key => Some(*tint),
                _ => None,
            })
            .collect();
        assert_eq!(tints, vec![Tint::HitFlash, Tint::None]);
    }
}
