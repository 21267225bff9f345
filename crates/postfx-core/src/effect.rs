//! Effect trait.
//!
//! An [`Effect`] is a single post-processing operation. Effects are owned by an
//! [`EffectPass`](crate::EffectPass), which applies them in declaration order.

use std::any::Any;

use crate::backend::Backend;
use crate::error::Result;
use crate::size::Size;

/// Per-frame state handed to effects.
pub struct EffectContext<'a, B: Backend> {
    /// The rendering backend.
    pub backend: &'a B,
    /// The frame being recorded.
    pub frame: &'a mut B::Frame,
    /// The camera the owning effect pass was built with.
    pub camera: &'a B::Camera,
    /// Seconds since the previous frame.
    pub delta: f32,
}

/// A post-processing operation.
pub trait Effect<B: Backend>: Any {
    /// Returns a human readable name.
    fn name(&self) -> &str;

    /// Resizes internal buffers.
    fn set_size(&mut self, _backend: &B, _size: Size) -> Result<()> {
        Ok(())
    }

    /// Reads `input` and writes the result to `output`, or to the visible
    /// surface when `output` is `None`.
    fn apply(
        &mut self,
        ctx: &mut EffectContext<'_, B>,
        input: &B::Target,
        output: Option<&B::Target>,
    ) -> Result<()>;

    /// Releases resources.
    fn dispose(&mut self) {}

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}
