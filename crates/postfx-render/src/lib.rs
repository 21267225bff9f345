//! wgpu rendering backend for postfx.
//!
//! This crate provides the GPU half of the post-processing stack:
//! - [`WgpuBackend`], implementing the composer backend and pass factory
//! - Scene and normal passes drawing a simple mesh [`Scene`]
//! - Built-in effects: anti-aliasing, tone mapping, vignette and outlines
//! - Frame capture and screenshot helpers

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
// Pixel math converts between integer sizes and float coordinates
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod backend;
pub mod camera;
pub mod effects;
pub mod error;
mod fullscreen;
pub mod passes;
pub mod scene;
pub mod screenshot;
pub mod smaa_images;
pub mod target;

pub use backend::{WgpuBackend, WgpuFrame, HEADLESS_FORMAT};
pub use camera::Camera;
pub use effects::{
    OutlineEffect, OutlineUniforms, SmaaEffect, SmaaUniforms, ToneMappingEffect,
    ToneMappingUniforms, VignetteEffect, VignetteUniforms,
};
pub use error::{RenderError, RenderResult};
pub use passes::{NormalBuffer, NormalPass, RenderPass, NORMAL_FORMAT};
pub use scene::{Mesh, Scene, SceneUniforms, Vertex};
pub use screenshot::{save_image, save_to_buffer, ScreenshotError, ScreenshotOptions};
pub use smaa_images::SmaaImages;
pub use target::{color_format, DepthTarget, RenderTarget};
