//! Pass trait and related types.
//!
//! A [`Pass`] is a single stage of the composer's chain, such as rendering the
//! scene, computing normals or compositing effects.

use std::any::Any;
use std::fmt;

use crate::backend::Backend;
use crate::error::Result;
use crate::size::Size;

/// Identifier of a pass within one composer. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(u64);

impl PassId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pass#{}", self.0)
    }
}

/// The kind of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Renders the scene.
    Render,
    /// Renders scene normals into a dedicated buffer.
    Normal,
    /// Composites one or more effects.
    Effect,
    /// Anything else.
    Custom,
}

/// A stage of the composer chain.
///
/// Each frame the composer calls [`Pass::render`] with its current input and
/// output buffers, and swaps them afterwards if [`Pass::needs_swap`] is true.
/// A pass marked render-to-screen writes to the frame's visible surface
/// instead of `output`.
pub trait Pass<B: Backend>: Any {
    /// Returns a human readable name.
    fn name(&self) -> &str;

    /// Returns the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Disabled passes are skipped.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Whether the composer swaps input and output after this pass.
    fn needs_swap(&self) -> bool {
        true
    }

    /// Whether this pass writes to the visible surface.
    fn render_to_screen(&self) -> bool;

    /// Marks this pass as writing to the visible surface.
    fn set_render_to_screen(&mut self, render_to_screen: bool);

    /// Resizes internal buffers.
    fn set_size(&mut self, _backend: &B, _size: Size) -> Result<()> {
        Ok(())
    }

    /// Records this pass.
    fn render(
        &mut self,
        backend: &B,
        frame: &mut B::Frame,
        input: &B::Target,
        output: &B::Target,
        delta: f32,
    ) -> Result<()>;

    /// Releases resources. Called once when the pass leaves the composer.
    fn dispose(&mut self) {}

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to self as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
