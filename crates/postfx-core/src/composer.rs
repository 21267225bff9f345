//! The effect composer: an ordered chain of passes rendered once per frame.

use crate::backend::Backend;
use crate::error::{ComposerError, Result};
use crate::pass::{Pass, PassId, PassKind};
use crate::size::{FrameBufferType, Size};

struct PassEntry<B: Backend> {
    id: PassId,
    pass: Box<dyn Pass<B>>,
}

/// Ping-pong pair of frame buffers.
struct BufferPair<T> {
    input: T,
    output: T,
}

impl<T> BufferPair<T> {
    fn swap(&mut self) {
        std::mem::swap(&mut self.input, &mut self.output);
    }
}

/// Owns an ordered sequence of passes and the buffers they render between.
///
/// Each frame, enabled passes run in insertion order. A pass reads the input
/// buffer and writes the output buffer; the buffers are swapped after every
/// pass that reports [`Pass::needs_swap`].
pub struct EffectComposer<B: Backend> {
    passes: Vec<PassEntry<B>>,
    buffers: Option<BufferPair<B::Target>>,
    size: Size,
    frame_buffer_type: FrameBufferType,
    next_pass_id: u64,
    frames_rendered: u64,
}

impl<B: Backend> EffectComposer<B> {
    /// Creates a composer with input and output buffers of the given size and precision.
    pub fn new(backend: &B, size: Size, frame_buffer_type: FrameBufferType) -> Result<Self> {
        let buffers = Self::create_buffers(backend, size, frame_buffer_type)?;
        log::debug!("effect composer created at {size} ({frame_buffer_type:?})");
        Ok(Self {
            passes: Vec::new(),
            buffers: Some(buffers),
            size,
            frame_buffer_type,
            next_pass_id: 0,
            frames_rendered: 0,
        })
    }

    fn create_buffers(
        backend: &B,
        size: Size,
        frame_buffer_type: FrameBufferType,
    ) -> Result<BufferPair<B::Target>> {
        let size = size.clamped();
        Ok(BufferPair {
            input: backend.create_target("Composer Input Buffer", size, frame_buffer_type)?,
            output: backend.create_target("Composer Output Buffer", size, frame_buffer_type)?,
        })
    }

    fn ensure_live(&self) -> Result<()> {
        if self.buffers.is_none() {
            return Err(ComposerError::Disposed);
        }
        Ok(())
    }

    /// Appends a pass, sizing it to the composer first.
    pub fn add_pass(&mut self, backend: &B, mut pass: Box<dyn Pass<B>>) -> Result<PassId> {
        self.ensure_live()?;
        pass.set_size(backend, self.size)?;
        self.push_pass(pass)
    }

    /// Appends a pass that the caller already sized to [`Self::size`].
    pub(crate) fn push_pass(&mut self, pass: Box<dyn Pass<B>>) -> Result<PassId> {
        self.ensure_live()?;
        let id = PassId::new(self.next_pass_id);
        self.next_pass_id += 1;
        log::debug!("added {:?} pass '{}' as {id}", pass.kind(), pass.name());
        self.passes.push(PassEntry { id, pass });
        Ok(id)
    }

    /// Removes a pass and hands it back without disposing it.
    pub fn remove_pass(&mut self, id: PassId) -> Option<Box<dyn Pass<B>>> {
        let index = self.passes.iter().position(|entry| entry.id == id)?;
        Some(self.passes.remove(index).pass)
    }

    /// Removes and disposes a pass. Returns false if the id is unknown.
    pub fn dispose_pass(&mut self, id: PassId) -> bool {
        match self.remove_pass(id) {
            Some(mut pass) => {
                pass.dispose();
                true
            }
            None => false,
        }
    }

    /// Clears the render-to-screen flag on every pass.
    pub fn clear_render_to_screen(&mut self) {
        for entry in &mut self.passes {
            entry.pass.set_render_to_screen(false);
        }
    }

    /// Resizes the frame buffers and every pass.
    ///
    /// Passes are neither rebuilt nor reordered.
    pub fn set_size(&mut self, backend: &B, size: Size) -> Result<()> {
        self.ensure_live()?;
        if size == self.size {
            return Ok(());
        }

        self.buffers = Some(Self::create_buffers(
            backend,
            size,
            self.frame_buffer_type,
        )?);
        self.size = size;

        for entry in &mut self.passes {
            entry.pass.set_size(backend, size)?;
        }
        log::debug!("effect composer resized to {size}");
        Ok(())
    }

    /// Renders all enabled passes once.
    pub fn render(&mut self, backend: &B, frame: &mut B::Frame, delta: f32) -> Result<()> {
        let buffers = self.buffers.as_mut().ok_or(ComposerError::Disposed)?;

        for entry in &mut self.passes {
            if !entry.pass.is_enabled() {
                continue;
            }
            entry
                .pass
                .render(backend, frame, &buffers.input, &buffers.output, delta)?;
            if entry.pass.needs_swap() {
                buffers.swap();
            }
        }

        self.frames_rendered += 1;
        Ok(())
    }

    /// Disposes every pass and allocates fresh buffers.
    pub fn reset(&mut self, backend: &B) -> Result<()> {
        self.dispose_passes();
        self.buffers = Some(Self::create_buffers(
            backend,
            self.size,
            self.frame_buffer_type,
        )?);
        Ok(())
    }

    /// Disposes every pass and releases the buffers. The composer cannot render afterwards.
    pub fn dispose(&mut self) {
        self.dispose_passes();
        self.buffers = None;
        log::debug!("effect composer disposed");
    }

    fn dispose_passes(&mut self) {
        for mut entry in self.passes.drain(..) {
            entry.pass.dispose();
        }
    }

    /// Returns true once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.buffers.is_none()
    }

    /// Returns the number of passes.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Returns the pass ids in render order.
    pub fn pass_ids(&self) -> Vec<PassId> {
        self.passes.iter().map(|entry| entry.id).collect()
    }

    /// Returns the pass kinds in render order.
    pub fn pass_kinds(&self) -> Vec<PassKind> {
        self.passes.iter().map(|entry| entry.pass.kind()).collect()
    }

    /// Returns the pass names in render order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|entry| entry.pass.name()).collect()
    }

    /// Returns true if the composer holds a pass with this id.
    pub fn contains(&self, id: PassId) -> bool {
        self.passes.iter().any(|entry| entry.id == id)
    }

    /// Gets a pass by id, downcast to its concrete type.
    pub fn pass<T: Pass<B>>(&self, id: PassId) -> Option<&T> {
        self.passes
            .iter()
            .find(|entry| entry.id == id)
            .and_then(|entry| entry.pass.as_any().downcast_ref::<T>())
    }

    /// Gets a mutable pass by id, downcast to its concrete type.
    pub fn pass_mut<T: Pass<B>>(&mut self, id: PassId) -> Option<&mut T> {
        self.passes
            .iter_mut()
            .find(|entry| entry.id == id)
            .and_then(|entry| entry.pass.as_any_mut().downcast_mut::<T>())
    }

    /// Returns the id of the last pass in the chain.
    pub fn terminal_pass(&self) -> Option<PassId> {
        self.passes.last().map(|entry| entry.id)
    }

    /// Returns the ids of passes that write to the visible surface.
    pub fn screen_passes(&self) -> Vec<PassId> {
        self.passes
            .iter()
            .filter(|entry| entry.pass.render_to_screen())
            .map(|entry| entry.id)
            .collect()
    }

    /// Current buffer size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Frame buffer precision.
    pub fn frame_buffer_type(&self) -> FrameBufferType {
        self.frame_buffer_type
    }

    /// Number of frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// The buffer the next pass reads from.
    pub fn input_buffer(&self) -> Option<&B::Target> {
        self.buffers.as_ref().map(|buffers| &buffers.input)
    }

    /// The buffer the next pass writes to.
    pub fn output_buffer(&self) -> Option<&B::Target> {
        self.buffers.as_ref().map(|buffers| &buffers.output)
    }
}

impl<B: Backend> Drop for EffectComposer<B> {
    fn drop(&mut self) {
        self.dispose_passes();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::mock::{MockBackend, MockFrame, MockPass};

    fn composer(backend: &MockBackend) -> EffectComposer<MockBackend> {
        EffectComposer::new(backend, Size::new(64, 32), FrameBufferType::HalfFloat).unwrap()
    }

    fn pass(backend: &MockBackend, name: &str, kind: PassKind, swap: bool) -> Box<MockPass> {
        Box::new(MockPass::new(name, kind, swap, Rc::clone(&backend.census)))
    }

    #[test]
    fn test_new_allocates_half_float_buffers() {
        let backend = MockBackend::new(1);
        let composer = composer(&backend);
        let allocations = backend.allocations.borrow();
        assert_eq!(allocations.len(), 2);
        assert!(allocations
            .iter()
            .all(|t| t.frame_buffer_type == FrameBufferType::HalfFloat));
        assert_eq!(composer.input_buffer().unwrap().size, Size::new(64, 32));
    }

    #[test]
    fn test_add_pass_sizes_pass() {
        let backend = MockBackend::new(1);
        let mut composer = composer(&backend);
        let id = composer
            .add_pass(&backend, pass(&backend, "render", PassKind::Render, false))
            .unwrap();
        assert_eq!(composer.pass::<MockPass>(id).unwrap().size, Some(Size::new(64, 32)));
        assert_eq!(composer.terminal_pass(), Some(id));
    }

    #[test]
    fn test_render_swaps_only_when_needed() {
        let backend = MockBackend::new(1);
        let mut composer = composer(&backend);
        composer
            .add_pass(&backend, pass(&backend, "render", PassKind::Render, false))
            .unwrap();
        composer
            .add_pass(&backend, pass(&backend, "a", PassKind::Custom, true))
            .unwrap();
        composer
            .add_pass(&backend, pass(&backend, "b", PassKind::Custom, true))
            .unwrap();

        let mut frame = MockFrame::default();
        composer.render(&backend, &mut frame, 0.5).unwrap();
        assert_eq!(
            frame.events,
            vec!["render t0->t1 dt=0.5", "a t0->t1 dt=0.5", "b t1->t0 dt=0.5"]
        );
        assert_eq!(composer.frames_rendered(), 1);
    }

    #[test]
    fn test_disabled_pass_is_skipped() {
        let backend = MockBackend::new(1);
        let mut composer = composer(&backend);
        let mut disabled = pass(&backend, "off", PassKind::Custom, true);
        disabled.enabled = false;
        composer.add_pass(&backend, disabled).unwrap();

        let mut frame = MockFrame::default();
        composer.render(&backend, &mut frame, 0.1).unwrap();
        assert!(frame.events.is_empty());
    }

    #[test]
    fn test_set_size_keeps_passes() {
        let backend = MockBackend::new(1);
        let mut composer = composer(&backend);
        let first = composer
            .add_pass(&backend, pass(&backend, "render", PassKind::Render, false))
            .unwrap();
        let second = composer
            .add_pass(&backend, pass(&backend, "fx", PassKind::Effect, true))
            .unwrap();

        composer.set_size(&backend, Size::new(800, 600)).unwrap();
        assert_eq!(composer.pass_ids(), vec![first, second]);
        assert_eq!(composer.size(), Size::new(800, 600));
        assert_eq!(composer.output_buffer().unwrap().size, Size::new(800, 600));
        assert_eq!(
            composer.pass::<MockPass>(second).unwrap().size,
            Some(Size::new(800, 600))
        );

        // Same size again does not reallocate
        let allocated = backend.allocations.borrow().len();
        composer.set_size(&backend, Size::new(800, 600)).unwrap();
        assert_eq!(backend.allocations.borrow().len(), allocated);
    }

    #[test]
    fn test_zero_size_buffers_are_clamped() {
        let backend = MockBackend::new(1);
        let mut composer = composer(&backend);
        composer.set_size(&backend, Size::new(0, 0)).unwrap();
        assert_eq!(composer.input_buffer().unwrap().size, Size::new(1, 1));
    }

    #[test]
    fn test_reset_and_dispose() {
        let backend = MockBackend::new(1);
        let mut composer = composer(&backend);
        composer
            .add_pass(&backend, pass(&backend, "render", PassKind::Render, false))
            .unwrap();
        composer
            .add_pass(&backend, pass(&backend, "fx", PassKind::Effect, true))
            .unwrap();

        composer.reset(&backend).unwrap();
        assert_eq!(composer.pass_count(), 0);
        assert_eq!(backend.census.passes_disposed.get(), 2);
        assert!(!composer.is_disposed());

        composer.dispose();
        assert!(composer.is_disposed());
        let mut frame = MockFrame::default();
        assert!(matches!(
            composer.render(&backend, &mut frame, 0.0),
            Err(ComposerError::Disposed)
        ));
        assert!(matches!(
            composer.add_pass(&backend, pass(&backend, "late", PassKind::Custom, true)),
            Err(ComposerError::Disposed)
        ));
    }

    #[test]
    fn test_remove_and_dispose_pass() {
        let backend = MockBackend::new(1);
        let mut composer = composer(&backend);
        let id = composer
            .add_pass(&backend, pass(&backend, "fx", PassKind::Effect, true))
            .unwrap();
        assert!(composer.dispose_pass(id));
        assert!(!composer.dispose_pass(id));
        assert!(!composer.contains(id));
        assert_eq!(backend.census.passes_disposed.get(), 1);
    }

    #[test]
    fn test_pass_ids_are_not_reused() {
        let backend = MockBackend::new(1);
        let mut composer = composer(&backend);
        let a = composer
            .add_pass(&backend, pass(&backend, "a", PassKind::Custom, true))
            .unwrap();
        composer.dispose_pass(a);
        let b = composer
            .add_pass(&backend, pass(&backend, "b", PassKind::Custom, true))
            .unwrap();
        assert_ne!(a, b);
        assert!(b > a);
    }
}
