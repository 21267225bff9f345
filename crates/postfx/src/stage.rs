//! A backend, its scene and camera, and the composer lifecycle bound to them.

use std::sync::{Arc, RwLock};

use postfx_core::{
    Binding, ComposerContext, ComposerError, ComposerLifecycle, ComposerOptions, Effect,
    FrameScheduler, LifecycleState, Result,
};
use postfx_render::{Camera, RenderError, Scene, WgpuBackend, WgpuFrame};

/// Something that opens, submits and drops frames around a scheduler tick.
pub trait FrameHost {
    /// Opens a frame. Returns false when there is nothing to draw into.
    fn begin_frame(&mut self) -> Result<bool>;
    /// Submits the open frame.
    fn finish_frame(&mut self);
    /// Drops the open frame without submitting it.
    fn abandon_frame(&mut self);
}

/// Runs one scheduler tick inside a frame opened on `host`.
///
/// Returns `Ok(false)` without ticking when the host cannot open a frame.
/// A failing callback abandons the frame and its error is returned.
pub fn drive_frame<H: FrameHost>(
    host: &mut H,
    scheduler: &mut FrameScheduler<H>,
    delta: f32,
) -> Result<bool> {
    if !host.begin_frame()? {
        log::debug!("frame skipped, surface unavailable");
        return Ok(false);
    }
    match scheduler.tick(host, delta) {
        Ok(()) => {
            host.finish_frame();
            Ok(true)
        }
        Err(err) => {
            host.abandon_frame();
            Err(err)
        }
    }
}

/// Everything a frame callback can touch.
///
/// A `Stage` is the context type of the [`FrameScheduler`](postfx_core::FrameScheduler)
/// that drives it: [`Stage::render_composer`] is subscribed at the composer's
/// priority and renders into the frame opened by [`Stage::begin_frame`].
pub struct Stage {
    lifecycle: ComposerLifecycle<WgpuBackend>,
    scene: Arc<RwLock<Scene>>,
    camera: Arc<RwLock<Camera>>,
    frame: Option<WgpuFrame>,
    backend: WgpuBackend,
}

impl Stage {
    /// Creates an unmounted stage with an empty scene and a default camera.
    pub fn new(backend: WgpuBackend, options: ComposerOptions) -> Result<Self> {
        let mut camera = Camera::default();
        camera.set_aspect_ratio(backend.size().aspect_ratio());
        Ok(Self {
            lifecycle: ComposerLifecycle::new(options)?,
            scene: Arc::new(RwLock::new(Scene::default())),
            camera: Arc::new(RwLock::new(camera)),
            frame: None,
            backend,
        })
    }

    pub fn backend(&self) -> &WgpuBackend {
        &self.backend
    }

    pub fn lifecycle(&self) -> &ComposerLifecycle<WgpuBackend> {
        &self.lifecycle
    }

    /// Shared scene handle; edits are picked up on the next frame.
    pub fn scene(&self) -> &Arc<RwLock<Scene>> {
        &self.scene
    }

    /// Shared camera handle.
    pub fn camera(&self) -> &Arc<RwLock<Camera>> {
        &self.camera
    }

    fn binding(&self) -> Binding<WgpuBackend> {
        Binding::new(
            &self.backend,
            Arc::clone(&self.scene),
            Arc::clone(&self.camera),
        )
    }

    /// Mounts the composer at the current surface size.
    pub fn mount(&mut self) -> Result<()> {
        let binding = self.binding();
        self.lifecycle
            .mount(&self.backend, binding, self.backend.size())
    }

    /// Replaces the camera; the composer is rebuilt for the new camera.
    pub fn set_camera(&mut self, camera: Arc<RwLock<Camera>>) -> Result<bool> {
        self.camera = camera;
        if !self.lifecycle.is_mounted() {
            return Ok(false);
        }
        let binding = self.binding();
        self.lifecycle.rebind(&self.backend, binding)
    }

    /// Replaces the scene; the composer is rebuilt for the new scene.
    pub fn set_scene(&mut self, scene: Arc<RwLock<Scene>>) -> Result<bool> {
        self.scene = scene;
        if !self.lifecycle.is_mounted() {
            return Ok(false);
        }
        let binding = self.binding();
        self.lifecycle.rebind(&self.backend, binding)
    }

    /// Rebuilds the effect chain from effects created by `build`.
    ///
    /// `build` receives the composer context so normal-aware effects can
    /// capture the normal buffer.
    pub fn set_effects_with<F>(&mut self, build: F) -> Result<()>
    where
        F: FnOnce(
            &WgpuBackend,
            &ComposerContext<'_, WgpuBackend>,
        ) -> Vec<Box<dyn Effect<WgpuBackend>>>,
    {
        let effects = {
            let ctx = self.lifecycle.context().ok_or(ComposerError::NotMounted)?;
            build(&self.backend, &ctx)
        };
        self.lifecycle.set_effects(&self.backend, effects)
    }

    pub fn set_effects(&mut self, effects: Vec<Box<dyn Effect<WgpuBackend>>>) -> Result<()> {
        self.lifecycle.set_effects(&self.backend, effects)
    }

    pub fn set_edge_detection(&mut self, edge_detection: f32) -> Result<()> {
        self.lifecycle.set_edge_detection(edge_detection)
    }

    /// Resizes the surface and, when mounted, the composer.
    ///
    /// Fails without resizing anything if the camera lock is poisoned.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let mut camera = self
            .camera
            .write()
            .map_err(|_| RenderError::LockPoisoned("camera"))?;
        self.backend.resize(width, height);
        let size = self.backend.size();
        camera.set_aspect_ratio(size.aspect_ratio());
        drop(camera);
        match self.lifecycle.state() {
            LifecycleState::Created | LifecycleState::Disposed => Ok(()),
            LifecycleState::Sized | LifecycleState::Composed => {
                self.lifecycle.resize(&self.backend, size)
            }
        }
    }

    /// Opens a frame. Returns false when the surface is temporarily unavailable.
    pub fn begin_frame(&mut self) -> Result<bool> {
        match self.backend.begin_frame() {
            Ok(frame) => {
                self.frame = Some(frame);
                Ok(true)
            }
            Err(RenderError::SurfaceLost | RenderError::SurfaceOutdated) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Frame callback rendering the composer into the open frame.
    pub fn render_composer(&mut self, delta: f32) -> Result<()> {
        let Some(frame) = self.frame.as_mut() else {
            return Err(ComposerError::Render("no frame in progress".to_string()));
        };
        self.lifecycle.render_frame(&self.backend, frame, delta)
    }

    /// Submits and presents the open frame, if any.
    pub fn finish_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.backend.finish_frame(frame);
        }
    }

    /// Drops the open frame without submitting it.
    pub fn abandon_frame(&mut self) {
        self.frame = None;
    }

    pub fn capture_frame(&self) -> Result<Vec<u8>> {
        Ok(self.backend.capture_frame()?)
    }

    pub fn unmount(&mut self) {
        self.frame = None;
        self.lifecycle.unmount();
    }
}

impl FrameHost for Stage {
    fn begin_frame(&mut self) -> Result<bool> {
        Stage::begin_frame(self)
    }

    fn finish_frame(&mut self) {
        Stage::finish_frame(self);
    }

    fn abandon_frame(&mut self) {
        Stage::abandon_frame(self);
    }
}
