//! Composite pass built from a camera and an ordered list of effects.

use std::any::Any;
use std::sync::Arc;

use crate::backend::Backend;
use crate::effect::{Effect, EffectContext};
use crate::error::{ComposerError, Result};
use crate::pass::{Pass, PassKind};
use crate::size::{FrameBufferType, Size};

/// Applies a list of effects as a single pass.
///
/// Effects run in declaration order. Each intermediate result lands in an
/// internal scratch buffer; the last effect writes to the composer output
/// buffer, or to the visible surface when this pass renders to screen. With
/// no effects the pass copies its input through unchanged.
pub struct EffectPass<B: Backend> {
    name: String,
    camera: Arc<B::Camera>,
    effects: Vec<Box<dyn Effect<B>>>,
    scratch: Vec<B::Target>,
    size: Option<Size>,
    frame_buffer_type: FrameBufferType,
    render_to_screen: bool,
    enabled: bool,
}

impl<B: Backend> EffectPass<B> {
    /// Creates an effect pass.
    pub fn new(camera: Arc<B::Camera>, effects: Vec<Box<dyn Effect<B>>>) -> Self {
        Self {
            name: "EffectPass".to_string(),
            camera,
            effects,
            scratch: Vec::new(),
            size: None,
            frame_buffer_type: FrameBufferType::default(),
            render_to_screen: false,
            enabled: true,
        }
    }

    /// Sets the precision of the intermediate buffers.
    #[must_use]
    pub fn with_frame_buffer_type(mut self, frame_buffer_type: FrameBufferType) -> Self {
        self.frame_buffer_type = frame_buffer_type;
        self
    }

    /// Sets the pass name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables or disables this pass.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The camera this pass was built with.
    pub fn camera(&self) -> &Arc<B::Camera> {
        &self.camera
    }

    /// Number of effects.
    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Effect names in application order.
    pub fn effect_names(&self) -> Vec<&str> {
        self.effects.iter().map(|effect| effect.name()).collect()
    }

    /// Gets the effect at `index`, downcast to its concrete type.
    pub fn effect<T: Effect<B>>(&self, index: usize) -> Option<&T> {
        self.effects
            .get(index)
            .and_then(|effect| effect.as_any().downcast_ref::<T>())
    }

    /// Moves the effects out of this pass, leaving it empty.
    pub fn take_effects(&mut self) -> Vec<Box<dyn Effect<B>>> {
        self.scratch.clear();
        std::mem::take(&mut self.effects)
    }

    /// Two scratch buffers are enough to ping-pong any number of effects.
    fn scratch_count(&self) -> usize {
        self.effects.len().saturating_sub(1).min(2)
    }
}

impl<B: Backend> Pass<B> for EffectPass<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PassKind {
        PassKind::Effect
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn render_to_screen(&self) -> bool {
        self.render_to_screen
    }

    fn set_render_to_screen(&mut self, render_to_screen: bool) {
        self.render_to_screen = render_to_screen;
    }

    fn set_size(&mut self, backend: &B, size: Size) -> Result<()> {
        let scratch_size = size.clamped();
        self.scratch = (0..self.scratch_count())
            .map(|i| {
                backend.create_target(
                    &format!("{} Scratch {i}", self.name),
                    scratch_size,
                    self.frame_buffer_type,
                )
            })
            .collect::<Result<_>>()?;

        for effect in &mut self.effects {
            effect.set_size(backend, size)?;
        }
        self.size = Some(size);
        Ok(())
    }

    fn render(
        &mut self,
        backend: &B,
        frame: &mut B::Frame,
        input: &B::Target,
        output: &B::Target,
        delta: f32,
    ) -> Result<()> {
        let destination = if self.render_to_screen {
            None
        } else {
            Some(output)
        };

        if self.effects.is_empty() {
            return backend.copy_target(frame, input, destination);
        }
        if self.scratch.len() < self.scratch_count() {
            return Err(ComposerError::Render(format!(
                "{} rendered before it was sized",
                self.name
            )));
        }

        let mut ctx = EffectContext {
            backend,
            frame,
            camera: &self.camera,
            delta,
        };
        let last = self.effects.len() - 1;
        let mut source = input;
        for (i, effect) in self.effects.iter_mut().enumerate() {
            if i == last {
                effect.apply(&mut ctx, source, destination)?;
            } else {
                let target = &self.scratch[i % self.scratch.len()];
                effect.apply(&mut ctx, source, Some(target))?;
                source = target;
            }
        }
        Ok(())
    }

    fn dispose(&mut self) {
        for effect in &mut self.effects {
            effect.dispose();
        }
        self.effects.clear();
        self.scratch.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
