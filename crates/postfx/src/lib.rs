//! postfx: a post-processing effect composer for wgpu scenes.
//!
//! The composer runs a fixed chain once per frame: the scene render pass, a
//! normal pass, and one composite pass holding the declared effects (with
//! anti-aliasing appended when enabled). [`ComposerLifecycle`] builds that
//! chain on mount, keeps it sized to the surface, rebuilds it when the effect
//! list changes and tears it down on unmount.
//!
//! # Quick Start
//!
//! ```no_run
//! use postfx::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let mut composer = HeadlessComposer::new(640, 480, ComposerOptions::default())?;
//!     composer.scene().write().unwrap().add_mesh(Mesh::cube(1.0));
//!     composer.mount()?;
//!     composer.set_effects_with(|backend, ctx| {
//!         let effects: Vec<Box<dyn Effect<WgpuBackend>>> = vec![
//!             Box::new(OutlineEffect::new(backend, ctx.normal_buffer.clone())),
//!             Box::new(VignetteEffect::new(backend)),
//!         ];
//!         effects
//!     })?;
//!     composer.render_to_file("frame.png")?;
//!     Ok(())
//! }
//! ```

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

mod headless;
mod stage;

pub use headless::{render_to_file, render_to_image, HeadlessComposer};
pub use stage::{drive_frame, FrameHost, Stage};

// Re-export core types
pub use postfx_core::{
    Backend, Binding, ComposerContext, ComposerError, ComposerLifecycle, ComposerOptions, Effect,
    EffectComposer, EffectContext, EffectPass, FrameBufferType, FrameClock, FrameScheduler,
    LifecycleState, Pass, PassFactory, PassId, PassKind, Result, Size, SubscriptionId,
};

// Re-export the wgpu backend
pub use postfx_render::{
    save_image, save_to_buffer, Camera, Mesh, NormalBuffer, OutlineEffect,
    RenderError, RenderTarget, Scene, ScreenshotOptions, SmaaEffect, SmaaImages,
    ToneMappingEffect, VignetteEffect, WgpuBackend, WgpuFrame,
};

// Re-export math types
pub use glam::{Mat4, Vec3, Vec4};

// Re-export the GPU and windowing crates
pub use wgpu;
pub use winit;

/// Initializes logging from `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    if env_logger::try_init().is_ok() {
        log::debug!("postfx logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
    }
}
