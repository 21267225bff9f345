//! Composer lifecycle: maps mount, resize, effect-list changes and unmount
//! onto an [`EffectComposer`].
//!
//! The lifecycle moves through `Created -> Sized -> Composed -> Disposed`:
//!
//! - [`mount`](ComposerLifecycle::mount) builds the composer for a
//!   (renderer, scene, camera) binding, attaches the scene render pass and
//!   composes an empty effect chain.
//! - [`set_effects`](ComposerLifecycle::set_effects) (re)builds the normal pass
//!   and the composite effect pass, which is the only pass drawn to screen.
//! - [`resize`](ComposerLifecycle::resize) propagates surface size changes.
//! - [`unmount`](ComposerLifecycle::unmount) disposes every pass.

use std::sync::Arc;

use crate::backend::{Binding, PassFactory};
use crate::composer::EffectComposer;
use crate::effect::Effect;
use crate::effect_pass::EffectPass;
use crate::error::{ComposerError, Result};
use crate::options::{validate_edge_detection, ComposerOptions};
use crate::pass::{Pass, PassId};
use crate::size::Size;

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, no composer yet.
    Created,
    /// Composer built and sized; only the render pass is attached.
    Sized,
    /// Normal and effect passes attached.
    Composed,
    /// Unmounted; every pass disposed.
    Disposed,
}

/// Handles made available to effects that need the composer or the normal buffer.
///
/// Passed explicitly to effect constructors instead of being looked up from
/// an ambient scope.
pub struct ComposerContext<'a, B: PassFactory> {
    /// The composer.
    pub composer: &'a EffectComposer<B>,
    /// The current normal pass, if the chain has been composed.
    pub normal_pass: Option<PassId>,
    /// The normal buffer shared by every normal pass of this binding.
    pub normal_buffer: &'a B::NormalBuffer,
}

/// Drives an [`EffectComposer`] through its lifecycle.
pub struct ComposerLifecycle<B: PassFactory> {
    options: ComposerOptions,
    state: LifecycleState,
    binding: Option<Binding<B>>,
    size: Size,
    composer: Option<EffectComposer<B>>,
    render_pass: Option<PassId>,
    normal_pass: Option<PassId>,
    effect_pass: Option<PassId>,
    normal_buffer: Option<B::NormalBuffer>,
    antialias: Option<B::AntialiasResource>,
    /// Number of caller-declared effects in the current effect pass.
    declared_effects: usize,
    rebuilds: u64,
}

impl<B: PassFactory> ComposerLifecycle<B> {
    /// Creates an unmounted lifecycle.
    pub fn new(options: ComposerOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            state: LifecycleState::Created,
            binding: None,
            size: Size::default(),
            composer: None,
            render_pass: None,
            normal_pass: None,
            effect_pass: None,
            normal_buffer: None,
            antialias: None,
            declared_effects: 0,
            rebuilds: 0,
        })
    }

    /// Builds the composer for `binding` and composes an empty effect chain.
    ///
    /// Loads the anti-aliasing resource when enabled; a load failure is
    /// returned and leaves the lifecycle unmounted. Mounting again with the
    /// same identity is a no-op; a different identity behaves like
    /// [`rebind`](Self::rebind).
    pub fn mount(&mut self, backend: &B, binding: Binding<B>, size: Size) -> Result<()> {
        if self.is_mounted() {
            self.rebind(backend, binding)?;
            return self.resize(backend, size);
        }
        self.size = size;
        self.construct(backend, binding, None, None)?;
        self.set_effects(backend, Vec::new())
    }

    /// Mounts and composes the chain with `effects` in one step.
    pub fn mount_with_effects(
        &mut self,
        backend: &B,
        binding: Binding<B>,
        size: Size,
        effects: Vec<Box<dyn Effect<B>>>,
    ) -> Result<()> {
        if self.is_mounted() {
            self.rebind(backend, binding)?;
            self.resize(backend, size)?;
        } else {
            self.size = size;
            self.construct(backend, binding, None, None)?;
        }
        self.set_effects(backend, effects)
    }

    fn construct(
        &mut self,
        backend: &B,
        binding: Binding<B>,
        normal_buffer: Option<B::NormalBuffer>,
        antialias: Option<B::AntialiasResource>,
    ) -> Result<()> {
        let antialias = match antialias {
            Some(resource) => Some(resource),
            None if self.options.smaa => Some(backend.load_antialias_resource()?),
            None => None,
        };

        let mut composer =
            EffectComposer::new(backend, self.size, self.options.frame_buffer_type)?;
        let render_pass = backend.create_render_pass(&binding, &self.options)?;
        let render_id = composer.add_pass(backend, render_pass)?;

        self.normal_buffer =
            Some(normal_buffer.unwrap_or_else(|| backend.create_normal_buffer()));
        self.antialias = antialias;
        self.composer = Some(composer);
        self.render_pass = Some(render_id);
        self.normal_pass = None;
        self.effect_pass = None;
        self.declared_effects = 0;
        self.binding = Some(binding);
        self.state = LifecycleState::Sized;
        log::info!("effect composer mounted at {}", self.size);
        Ok(())
    }

    /// Rebuilds the composer if the renderer, scene or camera changed.
    ///
    /// Returns true if the composer was rebuilt. When only the scene or camera
    /// changed the declared effects are carried over to the new composer; a
    /// renderer change drops them, since their GPU resources belong to the old
    /// device.
    pub fn rebind(&mut self, backend: &B, binding: Binding<B>) -> Result<bool> {
        let Some(current) = &self.binding else {
            return Err(ComposerError::NotMounted);
        };
        if current.same_identity(&binding) {
            return Ok(false);
        }

        let same_renderer = current.renderer == binding.renderer;
        let carried = if same_renderer {
            self.take_declared_effects()
        } else {
            None
        };
        let normal_buffer = if same_renderer {
            self.normal_buffer.take()
        } else {
            None
        };
        let antialias = if same_renderer {
            self.antialias.take()
        } else {
            None
        };

        self.teardown();
        self.binding = None;
        self.state = LifecycleState::Created;
        self.construct(backend, binding, normal_buffer, antialias)?;
        self.set_effects(backend, carried.unwrap_or_default())?;
        log::debug!("effect composer rebuilt for a new binding");
        Ok(true)
    }

    /// Moves the caller-declared effects out of the current effect pass.
    fn take_declared_effects(&mut self) -> Option<Vec<Box<dyn Effect<B>>>> {
        let id = self.effect_pass?;
        let declared = self.declared_effects;
        let pass = self.composer.as_mut()?.pass_mut::<EffectPass<B>>(id)?;
        let mut effects = pass.take_effects();
        for mut extra in effects.drain(declared..) {
            extra.dispose();
        }
        Some(effects)
    }

    /// Propagates a new surface size to the composer.
    pub fn resize(&mut self, backend: &B, size: Size) -> Result<()> {
        let composer = self.composer.as_mut().ok_or(ComposerError::NotMounted)?;
        if size == self.size {
            return Ok(());
        }
        composer.set_size(backend, size)?;
        self.size = size;
        Ok(())
    }

    /// Rebuilds the effect chain from the declared effects.
    ///
    /// A fresh normal pass and a single [`EffectPass`] built from the camera
    /// and `effects` (followed by the anti-aliasing effect when enabled) are
    /// sized first. Only then are the previous normal and effect passes
    /// removed and disposed. The effect pass becomes the only pass rendering
    /// to screen and the scene render pass is kept.
    ///
    /// On error the new passes and effects are disposed and the previous
    /// chain stays in place.
    pub fn set_effects(&mut self, backend: &B, effects: Vec<Box<dyn Effect<B>>>) -> Result<()> {
        let binding = self.binding.clone().ok_or(ComposerError::NotMounted)?;
        let composer = self.composer.as_mut().ok_or(ComposerError::NotMounted)?;
        let normal_buffer = self.normal_buffer.as_ref().ok_or(ComposerError::NotMounted)?;
        let size = composer.size();

        let declared = effects.len();
        let mut effects = effects;
        if self.options.smaa {
            if let Some(resource) = &self.antialias {
                match backend.create_antialias_effect(resource, self.options.edge_detection) {
                    Ok(effect) => effects.push(effect),
                    Err(err) => {
                        for effect in &mut effects {
                            effect.dispose();
                        }
                        return Err(err);
                    }
                }
            }
        }

        let mut effect_pass: Box<dyn Pass<B>> = Box::new(
            EffectPass::new(Arc::clone(&binding.camera), effects)
                .with_frame_buffer_type(self.options.frame_buffer_type),
        );
        let mut normal_pass = match backend.create_normal_pass(&binding, normal_buffer) {
            Ok(pass) => pass,
            Err(err) => {
                effect_pass.dispose();
                return Err(err);
            }
        };
        if let Err(err) = normal_pass
            .set_size(backend, size)
            .and_then(|()| effect_pass.set_size(backend, size))
        {
            log::warn!("effect chain rebuild failed, keeping the previous chain: {err}");
            normal_pass.dispose();
            effect_pass.dispose();
            return Err(err);
        }

        if let Some(id) = self.normal_pass.take() {
            composer.dispose_pass(id);
        }
        if let Some(id) = self.effect_pass.take() {
            composer.dispose_pass(id);
        }
        composer.clear_render_to_screen();
        effect_pass.set_render_to_screen(true);

        self.normal_pass = Some(composer.push_pass(normal_pass)?);
        self.effect_pass = Some(composer.push_pass(effect_pass)?);
        self.declared_effects = declared;
        self.rebuilds += 1;
        self.state = LifecycleState::Composed;
        log::debug!(
            "effect chain rebuilt with {declared} declared effect(s), {} pass(es)",
            composer.pass_count()
        );
        Ok(())
    }

    /// Forwards a frame tick to the composer.
    pub fn render_frame(&mut self, backend: &B, frame: &mut B::Frame, delta: f32) -> Result<()> {
        match self.composer.as_mut() {
            Some(composer) => composer.render(backend, frame, delta),
            None if self.state == LifecycleState::Disposed => Err(ComposerError::Disposed),
            None => Err(ComposerError::NotMounted),
        }
    }

    /// Changes the edge-detection threshold used by the next rebuild.
    pub fn set_edge_detection(&mut self, edge_detection: f32) -> Result<()> {
        validate_edge_detection(edge_detection)?;
        self.options.edge_detection = edge_detection;
        Ok(())
    }

    /// Disposes every pass and the composer.
    pub fn unmount(&mut self) {
        if self.composer.is_none() {
            return;
        }
        self.teardown();
        self.normal_buffer = None;
        self.antialias = None;
        self.binding = None;
        self.state = LifecycleState::Disposed;
        log::info!("effect composer unmounted");
    }

    fn teardown(&mut self) {
        if let Some(mut composer) = self.composer.take() {
            composer.dispose();
        }
        self.render_pass = None;
        self.normal_pass = None;
        self.effect_pass = None;
        self.declared_effects = 0;
    }

    /// Handles for effect constructors, available once mounted.
    pub fn context(&self) -> Option<ComposerContext<'_, B>> {
        Some(ComposerContext {
            composer: self.composer.as_ref()?,
            normal_pass: self.normal_pass,
            normal_buffer: self.normal_buffer.as_ref()?,
        })
    }

    /// Returns true while a composer exists.
    pub fn is_mounted(&self) -> bool {
        self.composer.is_some()
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Options in effect.
    pub fn options(&self) -> &ComposerOptions {
        &self.options
    }

    /// Priority of the per-frame render callback.
    pub fn priority(&self) -> i32 {
        self.options.render_priority
    }

    /// Last observed surface size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// The composer, if mounted.
    pub fn composer(&self) -> Option<&EffectComposer<B>> {
        self.composer.as_ref()
    }

    /// The current binding, if mounted.
    pub fn binding(&self) -> Option<&Binding<B>> {
        self.binding.as_ref()
    }

    /// Number of passes in the composer (zero when unmounted).
    pub fn pass_count(&self) -> usize {
        self.composer.as_ref().map_or(0, EffectComposer::pass_count)
    }

    /// Id of the scene render pass.
    pub fn render_pass_id(&self) -> Option<PassId> {
        self.render_pass
    }

    /// Id of the current normal pass.
    pub fn normal_pass_id(&self) -> Option<PassId> {
        self.normal_pass
    }

    /// Id of the current effect pass.
    pub fn effect_pass_id(&self) -> Option<PassId> {
        self.effect_pass
    }

    /// The current effect pass.
    pub fn effect_pass(&self) -> Option<&EffectPass<B>> {
        self.composer.as_ref()?.pass(self.effect_pass?)
    }

    /// Number of effect chain rebuilds since construction.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

impl<B: PassFactory> Drop for ComposerLifecycle<B> {
    fn drop(&mut self) {
        self.unmount();
    }
}
