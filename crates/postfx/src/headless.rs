//! Headless rendering: drive the composer through a frame scheduler and read
//! the result back.

use std::path::Path;
use std::sync::{Arc, RwLock};

use pollster::FutureExt;
use postfx_core::{
    ComposerContext, ComposerOptions, Effect, FrameScheduler, Result, SubscriptionId,
};
use postfx_render::{save_image, Camera, Scene, ScreenshotOptions, WgpuBackend};

use crate::stage::{drive_frame, Stage};

/// A composer rendering into an offscreen surface.
///
/// Frames are driven by an internal [`FrameScheduler`]; the composer itself is
/// one subscriber, registered at the configured render priority. Other
/// callbacks (animation, camera motion) can be subscribed around it.
pub struct HeadlessComposer {
    stage: Stage,
    scheduler: FrameScheduler<Stage>,
    composer_subscription: SubscriptionId,
}

impl HeadlessComposer {
    /// Creates a headless GPU context of the given size. Does not mount.
    pub fn new(width: u32, height: u32, options: ComposerOptions) -> Result<Self> {
        let backend = WgpuBackend::new_headless(width, height).block_on()?;
        Self::with_backend(backend, options)
    }

    pub fn with_backend(backend: WgpuBackend, options: ComposerOptions) -> Result<Self> {
        let priority = options.render_priority;
        let stage = Stage::new(backend, options)?;
        let mut scheduler = FrameScheduler::new();
        let composer_subscription =
            scheduler.subscribe(priority, |stage: &mut Stage, delta| stage.render_composer(delta));
        Ok(Self {
            stage,
            scheduler,
            composer_subscription,
        })
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn scene(&self) -> &Arc<RwLock<Scene>> {
        self.stage.scene()
    }

    pub fn camera(&self) -> &Arc<RwLock<Camera>> {
        self.stage.camera()
    }

    pub fn scheduler(&self) -> &FrameScheduler<Stage> {
        &self.scheduler
    }

    /// Subscription of the composer's own render callback.
    pub fn composer_subscription(&self) -> SubscriptionId {
        self.composer_subscription
    }

    pub fn mount(&mut self) -> Result<()> {
        self.stage.mount()
    }

    pub fn set_effects_with<F>(&mut self, build: F) -> Result<()>
    where
        F: FnOnce(
            &WgpuBackend,
            &ComposerContext<'_, WgpuBackend>,
        ) -> Vec<Box<dyn Effect<WgpuBackend>>>,
    {
        self.stage.set_effects_with(build)
    }

    /// Registers a per-frame callback. Lower priorities run first.
    pub fn subscribe<F>(&mut self, priority: i32, callback: F) -> SubscriptionId
    where
        F: FnMut(&mut Stage, f32) -> Result<()> + 'static,
    {
        self.scheduler.subscribe(priority, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.scheduler.unsubscribe(id)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.stage.resize(width, height)
    }

    /// Runs one scheduler tick inside a frame and submits it.
    ///
    /// A failing callback aborts the frame; nothing is submitted. When no
    /// frame can be opened the tick is skipped.
    pub fn render_frame(&mut self, delta: f32) -> Result<()> {
        drive_frame(&mut self.stage, &mut self.scheduler, delta)?;
        Ok(())
    }

    /// Renders one frame and returns it as tightly packed RGBA8 rows.
    pub fn render_to_image(&mut self) -> Result<Vec<u8>> {
        self.render_frame(0.0)?;
        self.stage.capture_frame()
    }

    /// Renders one frame and saves it as PNG or JPEG, chosen by extension.
    pub fn render_to_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let data = self.render_to_image()?;
        let size = self.stage.backend().size();
        save_image(
            path,
            &data,
            size.width,
            size.height,
            &ScreenshotOptions::default(),
        )?;
        Ok(())
    }

    pub fn unmount(&mut self) {
        self.stage.unmount();
    }
}

/// Renders `scene` once through a freshly mounted composer with no declared
/// effects and returns the RGBA8 pixels.
///
/// The camera is framed on the scene bounds.
pub fn render_to_image(
    scene: Scene,
    width: u32,
    height: u32,
    options: ComposerOptions,
) -> Result<Vec<u8>> {
    let mut composer = HeadlessComposer::new(width, height, options)?;
    composer.stage_mut().set_scene(Arc::new(RwLock::new(scene)))?;
    frame_scene(&composer);
    composer.mount()?;
    composer.render_to_image()
}

/// Renders `scene` once and saves it to `path`.
pub fn render_to_file(
    scene: Scene,
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
    options: ComposerOptions,
) -> Result<()> {
    let data = render_to_image(scene, width, height, options)?;
    save_image(path, &data, width, height, &ScreenshotOptions::default())?;
    Ok(())
}

fn frame_scene(composer: &HeadlessComposer) {
    let bounds = composer.scene().read().ok().and_then(|scene| scene.bounds());
    if let (Some((min, max)), Ok(mut camera)) = (bounds, composer.camera().write()) {
        camera.look_at_box(min, max);
    }
}
