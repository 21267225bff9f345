//! Interactive viewer: an orbiting scene with switchable effect chains.
//!
//! Run with: cargo run --example viewer
//!
//! Keys: 1-4 select an effect chain, A toggles auto-orbit, Escape quits.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use pollster::FutureExt;
use postfx::*;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

type Effects = Vec<Box<dyn Effect<WgpuBackend>>>;

fn effect_chain(preset: u8, backend: &WgpuBackend, ctx: &ComposerContext<'_, WgpuBackend>) -> Effects {
    match preset {
        1 => vec![Box::new(OutlineEffect::new(backend, ctx.normal_buffer.clone()))],
        2 => vec![Box::new(ToneMappingEffect::new(backend).with_exposure(1.5))],
        3 => vec![
            Box::new(OutlineEffect::new(backend, ctx.normal_buffer.clone())),
            Box::new(ToneMappingEffect::new(backend).with_exposure(1.2)),
            Box::new(VignetteEffect::new(backend).with_darkness(0.7)),
        ],
        _ => Vec::new(),
    }
}

struct Viewer {
    window: Option<Arc<Window>>,
    stage: Option<Stage>,
    scheduler: FrameScheduler<Stage>,
    clock: FrameClock,
    auto_orbit: Rc<Cell<bool>>,
}

impl Viewer {
    fn new() -> Self {
        let auto_orbit = Rc::new(Cell::new(true));
        let mut scheduler = FrameScheduler::new();
        let orbit = Rc::clone(&auto_orbit);
        scheduler.subscribe(0, move |stage: &mut Stage, delta| {
            if orbit.get() {
                if let Ok(mut camera) = stage.camera().write() {
                    camera.orbit(delta * 0.5, 0.0);
                }
            }
            Ok(())
        });
        Self {
            window: None,
            stage: None,
            scheduler,
            clock: FrameClock::default(),
            auto_orbit,
        }
    }

    fn create_stage(window: Arc<Window>) -> Result<Stage> {
        let backend = WgpuBackend::new_windowed(window).block_on()?;
        let options = ComposerOptions::default();
        let priority = options.render_priority;
        let mut stage = Stage::new(backend, options)?;
        if let Ok(mut scene) = stage.scene().write() {
            scene.set_background(Vec4::new(0.1, 0.11, 0.14, 1.0));
            scene.add_mesh(Mesh::plane(6.0).with_color(Vec3::new(0.5, 0.5, 0.48)));
            scene.add_mesh(
                Mesh::cube(1.0)
                    .with_color(Vec3::new(0.85, 0.35, 0.2))
                    .with_transform(Mat4::from_translation(Vec3::new(-0.9, 0.5, 0.0))),
            );
            scene.add_mesh(
                Mesh::uv_sphere(0.6, 32, 16)
                    .with_color(Vec3::new(0.25, 0.5, 0.9))
                    .with_transform(Mat4::from_translation(Vec3::new(0.9, 0.6, 0.3))),
            );
        }
        if let Ok(mut camera) = stage.camera().write() {
            let aspect = stage.backend().size().aspect_ratio();
            *camera = Camera::new(aspect).looking_at(Vec3::new(2.5, 2.2, 3.5), Vec3::new(0.0, 0.4, 0.0));
        }
        stage.mount()?;
        stage.set_effects_with(|backend, ctx| effect_chain(3, backend, ctx))?;
        log::info!("viewer ready, composer priority {priority}");
        Ok(stage)
    }

    fn subscribe_composer(&mut self, priority: i32) {
        self.scheduler
            .subscribe(priority, |stage: &mut Stage, delta| stage.render_composer(delta));
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(stage) = self.stage.as_mut() else {
            return Ok(());
        };
        let delta = self.clock.tick();
        drive_frame(stage, &mut self.scheduler, delta)?;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, event_loop: &ActiveEventLoop) {
        let preset = match key {
            KeyCode::Escape => {
                event_loop.exit();
                return;
            }
            KeyCode::KeyA => {
                self.auto_orbit.set(!self.auto_orbit.get());
                return;
            }
            KeyCode::Digit1 => 0,
            KeyCode::Digit2 => 1,
            KeyCode::Digit3 => 2,
            KeyCode::Digit4 => 3,
            _ => return,
        };
        if let Some(stage) = self.stage.as_mut() {
            if let Err(e) = stage.set_effects_with(|backend, ctx| effect_chain(preset, backend, ctx)) {
                log::error!("failed to rebuild effect chain: {e}");
            }
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("postfx viewer")
            .with_inner_size(LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match Self::create_stage(Arc::clone(&window)) {
            Ok(stage) => {
                let priority = stage.lifecycle().priority();
                self.stage = Some(stage);
                self.subscribe_composer(priority);
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                log::error!("failed to create renderer: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(stage) = self.stage.as_mut() {
                    stage.unmount();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(stage) = self.stage.as_mut() {
                    if let Err(e) = stage.resize(size.width, size.height) {
                        log::error!("resize failed: {e}");
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    log::error!("frame failed: {e}");
                    event_loop.exit();
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.handle_key(key, event_loop),
            _ => {}
        }
    }
}

fn main() {
    init_logging();
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            eprintln!("failed to create event loop: {e}");
            return;
        }
    };
    let mut viewer = Viewer::new();
    if let Err(e) = event_loop.run_app(&mut viewer) {
        eprintln!("event loop error: {e}");
    }
}
