//! Vignette effect.

use std::any::Any;

use postfx_core::{Effect, EffectContext, Result};

use super::{single_input_bind_group, single_input_layout, uniform_buffer};
use crate::backend::WgpuBackend;
use crate::fullscreen::{linear_sampler, FullscreenEffect};
use crate::target::RenderTarget;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VignetteUniforms {
    pub offset: f32,
    pub darkness: f32,
    _padding: [f32; 2],
}

impl Default for VignetteUniforms {
    fn default() -> Self {
        Self {
            offset: 1.0,
            darkness: 0.5,
            _padding: [0.0; 2],
        }
    }
}

/// Darkens the image towards its corners.
pub struct VignetteEffect {
    uniforms: VignetteUniforms,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    fullscreen: FullscreenEffect,
}

impl VignetteEffect {
    pub fn new(backend: &WgpuBackend) -> Self {
        let device = &backend.device;
        let uniforms = VignetteUniforms::default();
        Self {
            uniforms,
            uniform_buffer: uniform_buffer(device, "Vignette Uniforms", &uniforms),
            sampler: linear_sampler(device, "Vignette Sampler"),
            fullscreen: FullscreenEffect::new(
                device,
                "Vignette",
                include_str!("../shaders/vignette.wgsl"),
                &single_input_layout(),
            ),
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.uniforms.offset = offset.max(0.0);
        self
    }

    #[must_use]
    pub fn with_darkness(mut self, darkness: f32) -> Self {
        self.uniforms.darkness = darkness.clamp(0.0, 1.0);
        self
    }

    pub fn uniforms(&self) -> VignetteUniforms {
        self.uniforms
    }
}

impl Effect<WgpuBackend> for VignetteEffect {
    fn name(&self) -> &str {
        "Vignette"
    }

    fn apply(
        &mut self,
        ctx: &mut EffectContext<'_, WgpuBackend>,
        input: &RenderTarget,
        output: Option<&RenderTarget>,
    ) -> Result<()> {
        let backend = ctx.backend;
        backend
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let (encoder, view, format) = ctx.frame.attachment(output);
        self.fullscreen.prepare(&backend.device, format);
        let bind_group = single_input_bind_group(
            &self.fullscreen,
            &backend.device,
            &input.view,
            &self.sampler,
            &self.uniform_buffer,
        );
        self.fullscreen.draw(encoder, view, format, &bind_group)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
