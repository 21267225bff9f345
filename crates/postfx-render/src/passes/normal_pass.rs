//! Renders view-space normals into a buffer shared with normal-aware effects.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use postfx_core::{Pass, PassKind, Result, Size};

use super::{draw_scene, read_lock, SceneBinding};
use crate::backend::{create_scene_pipeline, WgpuBackend, WgpuFrame};
use crate::camera::Camera;
use crate::scene::{Scene, SceneGeometry};
use crate::target::{DepthTarget, RenderTarget};

/// Format of the normal buffer; normals are stored as `n * 0.5 + 0.5`.
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Shared handle to the texture written by the current [`NormalPass`].
///
/// The handle stays the same across chain rebuilds; each new normal pass
/// replaces the texture behind it.
#[derive(Clone, Default)]
pub struct NormalBuffer(Arc<RwLock<Option<RenderTarget>>>);

impl NormalBuffer {
    /// The current texture, if a normal pass has been sized.
    pub fn target(&self) -> Option<RenderTarget> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn size(&self) -> Option<Size> {
        self.target().map(|target| target.size)
    }

    /// Returns true if both handles refer to the same buffer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn replace(&self, target: Option<RenderTarget>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = target;
    }
}

/// Draws scene normals into a [`NormalBuffer`]. Does not touch the composer buffers.
pub struct NormalPass {
    scene: Arc<RwLock<Scene>>,
    camera: Arc<RwLock<Camera>>,
    buffer: NormalBuffer,
    geometry: SceneGeometry,
    binding: SceneBinding,
    pipeline: Option<wgpu::RenderPipeline>,
    depth: Option<DepthTarget>,
    render_to_screen: bool,
}

impl NormalPass {
    pub fn new(
        backend: &WgpuBackend,
        scene: Arc<RwLock<Scene>>,
        camera: Arc<RwLock<Camera>>,
        buffer: NormalBuffer,
    ) -> Self {
        Self {
            scene,
            camera,
            buffer,
            geometry: SceneGeometry::default(),
            binding: SceneBinding::new(backend, "Normal Pass Uniforms"),
            pipeline: None,
            depth: None,
            render_to_screen: false,
        }
    }

    pub fn buffer(&self) -> &NormalBuffer {
        &self.buffer
    }
}

impl Pass<WgpuBackend> for NormalPass {
    fn name(&self) -> &str {
        "NormalPass"
    }

    fn kind(&self) -> PassKind {
        PassKind::Normal
    }

    fn needs_swap(&self) -> bool {
        false
    }

    fn render_to_screen(&self) -> bool {
        self.render_to_screen
    }

    fn set_render_to_screen(&mut self, render_to_screen: bool) {
        self.render_to_screen = render_to_screen;
    }

    fn set_size(&mut self, backend: &WgpuBackend, size: Size) -> Result<()> {
        self.buffer.replace(Some(RenderTarget::new(
            &backend.device,
            "Normal Buffer",
            size,
            NORMAL_FORMAT,
        )));
        self.depth = Some(DepthTarget::new(&backend.device, "Normal Pass Depth", size));
        Ok(())
    }

    fn render(
        &mut self,
        backend: &WgpuBackend,
        frame: &mut WgpuFrame,
        _input: &RenderTarget,
        _output: &RenderTarget,
        _delta: f32,
    ) -> Result<()> {
        let (Some(target), Some(depth)) = (self.buffer.target(), self.depth.as_ref()) else {
            log::warn!("normal pass rendered before it was sized");
            return Ok(());
        };

        let scene = read_lock(&*self.scene, "scene")?;
        let camera = read_lock(&*self.camera, "camera")?;
        self.geometry.sync(&backend.device, &scene);
        backend.queue.write_buffer(
            &self.binding.buffer,
            0,
            bytemuck::cast_slice(&[scene.uniforms(&camera)]),
        );

        let pipeline = self.pipeline.get_or_insert_with(|| {
            create_scene_pipeline(backend, "Normal Pass Pipeline", "fs_normal", NORMAL_FORMAT, true)
        });

        draw_scene(
            &mut frame.encoder,
            "Normal Pass",
            &target.view,
            Some(&depth.view),
            wgpu::Color {
                r: 0.5,
                g: 0.5,
                b: 1.0,
                a: 0.0,
            },
            pipeline,
            &self.binding,
            &self.geometry,
        );
        Ok(())
    }

    fn dispose(&mut self) {
        self.depth = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
