//! Renders the scene into the composer input buffer.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use postfx_core::{Backend, Pass, PassKind, Result, Size};

use super::{draw_scene, read_lock, SceneBinding};
use crate::backend::{create_scene_pipeline, WgpuBackend, WgpuFrame};
use crate::camera::Camera;
use crate::error::RenderError;
use crate::scene::{Scene, SceneGeometry};
use crate::target::{DepthTarget, RenderTarget};

/// The first pass of every chain: draws the scene into the input buffer.
///
/// Does not swap buffers, so the next pass reads what this one wrote.
pub struct RenderPass {
    scene: Arc<RwLock<Scene>>,
    camera: Arc<RwLock<Camera>>,
    geometry: SceneGeometry,
    binding: SceneBinding,
    pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
    depth: Option<DepthTarget>,
    use_depth: bool,
    enabled: bool,
    render_to_screen: bool,
}

impl RenderPass {
    pub fn new(
        backend: &WgpuBackend,
        scene: Arc<RwLock<Scene>>,
        camera: Arc<RwLock<Camera>>,
        use_depth: bool,
    ) -> Self {
        Self {
            scene,
            camera,
            geometry: SceneGeometry::default(),
            binding: SceneBinding::new(backend, "Render Pass Uniforms"),
            pipelines: HashMap::new(),
            depth: None,
            use_depth,
            enabled: true,
            render_to_screen: false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn uses_depth(&self) -> bool {
        self.use_depth
    }
}

impl Pass<WgpuBackend> for RenderPass {
    fn name(&self) -> &str {
        "RenderPass"
    }

    fn kind(&self) -> PassKind {
        PassKind::Render
    }

    fn is_enabled(&self) -> bool {
        self.enabled
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
        if self.use_depth {
            self.depth = Some(DepthTarget::new(&backend.device, "Render Pass Depth", size));
        }
        let mut camera = self
            .camera
            .write()
            .map_err(|_| RenderError::LockPoisoned("camera"))?;
        camera.set_aspect_ratio(size.aspect_ratio());
        Ok(())
    }

    fn render(
        &mut self,
        backend: &WgpuBackend,
        frame: &mut WgpuFrame,
        input: &RenderTarget,
        _output: &RenderTarget,
        _delta: f32,
    ) -> Result<()> {
        let scene = read_lock(&*self.scene, "scene")?;
        let camera = read_lock(&*self.camera, "camera")?;

        self.geometry.sync(&backend.device, &scene);
        backend.queue.write_buffer(
            &self.binding.buffer,
            0,
            bytemuck::cast_slice(&[scene.uniforms(&camera)]),
        );

        if self.use_depth && self.depth.as_ref().map(|d| d.size) != Some(input.size) {
            self.depth = Some(DepthTarget::new(&backend.device, "Render Pass Depth", input.size));
        }
        let use_depth = self.use_depth;
        let pipeline = self.pipelines.entry(input.format).or_insert_with(|| {
            create_scene_pipeline(backend, "Render Pass Pipeline", "fs_color", input.format, use_depth)
        });

        draw_scene(
            &mut frame.encoder,
            "Render Pass",
            &input.view,
            self.depth.as_ref().map(|d| &d.view),
            scene.clear_color(),
            pipeline,
            &self.binding,
            &self.geometry,
        );
        drop(camera);
        drop(scene);

        if self.render_to_screen {
            backend.copy_target(frame, input, None)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
