//! Rendering backend seam.
//!
//! The composer never talks to a GPU API directly. A [`Backend`] allocates
//! frame buffers and copies between them, and a [`PassFactory`] builds the
//! fixed passes the lifecycle attaches (scene render, normal buffer,
//! anti-aliasing).

use std::sync::Arc;

use crate::effect::Effect;
use crate::error::Result;
use crate::options::ComposerOptions;
use crate::pass::Pass;
use crate::size::{FrameBufferType, Size};

/// GPU resources the composer needs from a rendering backend.
pub trait Backend: Sized + 'static {
    /// An offscreen color buffer.
    type Target: 'static;
    /// Per-frame recording state (command encoder and visible surface).
    type Frame: 'static;
    /// The scene rendered by the base render pass.
    type Scene: 'static;
    /// The camera used by scene-dependent passes and effects.
    type Camera: 'static;

    /// Identifier of the underlying renderer (device).
    ///
    /// Two backends with the same id share GPU resources.
    fn renderer_id(&self) -> u64;

    /// Allocates a color buffer.
    fn create_target(
        &self,
        label: &str,
        size: Size,
        frame_buffer_type: FrameBufferType,
    ) -> Result<Self::Target>;

    /// Copies `source` into `destination`, or onto the frame's visible surface
    /// when `destination` is `None`.
    fn copy_target(
        &self,
        frame: &mut Self::Frame,
        source: &Self::Target,
        destination: Option<&Self::Target>,
    ) -> Result<()>;
}

/// The (renderer, scene, camera) triple a composer is built for.
pub struct Binding<B: Backend> {
    /// Renderer identity, see [`Backend::renderer_id`].
    pub renderer: u64,
    /// Shared scene handle.
    pub scene: Arc<B::Scene>,
    /// Shared camera handle.
    pub camera: Arc<B::Camera>,
}

impl<B: Backend> Binding<B> {
    /// Creates a binding for the given backend, scene and camera.
    pub fn new(backend: &B, scene: Arc<B::Scene>, camera: Arc<B::Camera>) -> Self {
        Self {
            renderer: backend.renderer_id(),
            scene,
            camera,
        }
    }

    /// Returns true if both bindings refer to the same renderer, scene and camera.
    pub fn same_identity(&self, other: &Self) -> bool {
        self.renderer == other.renderer
            && Arc::ptr_eq(&self.scene, &other.scene)
            && Arc::ptr_eq(&self.camera, &other.camera)
    }
}

impl<B: Backend> Clone for Binding<B> {
    fn clone(&self) -> Self {
        Self {
            renderer: self.renderer,
            scene: Arc::clone(&self.scene),
            camera: Arc::clone(&self.camera),
        }
    }
}

/// Constructs the passes and resources the lifecycle attaches to a composer.
pub trait PassFactory: Backend {
    /// Lookup data the anti-aliasing effect is built from.
    type AntialiasResource: 'static;
    /// Shared handle to the normal buffer written by the normal pass.
    ///
    /// The handle outlives individual normal passes so effects built against
    /// it stay valid across rebuilds.
    type NormalBuffer: Clone + 'static;

    /// Builds the pass that renders the scene into the composer input buffer.
    fn create_render_pass(
        &self,
        binding: &Binding<Self>,
        options: &ComposerOptions,
    ) -> Result<Box<dyn Pass<Self>>>;

    /// Allocates an (unsized) normal buffer handle.
    fn create_normal_buffer(&self) -> Self::NormalBuffer;

    /// Builds a pass that renders scene normals into `buffer`.
    fn create_normal_pass(
        &self,
        binding: &Binding<Self>,
        buffer: &Self::NormalBuffer,
    ) -> Result<Box<dyn Pass<Self>>>;

    /// Loads the anti-aliasing lookup resource.
    fn load_antialias_resource(&self) -> Result<Self::AntialiasResource>;

    /// Builds the anti-aliasing effect with the given edge-detection threshold.
    fn create_antialias_effect(
        &self,
        resource: &Self::AntialiasResource,
        edge_detection: f32,
    ) -> Result<Box<dyn Effect<Self>>>;
}
