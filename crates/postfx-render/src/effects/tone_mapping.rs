//! Tone mapping effect.

use std::any::Any;

use postfx_core::{Effect, EffectContext, Result};

use super::{single_input_bind_group, single_input_layout, uniform_buffer};
use crate::backend::WgpuBackend;
use crate::fullscreen::{linear_sampler, FullscreenEffect};
use crate::target::RenderTarget;

/// GPU representation of tone mapping uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ToneMappingUniforms {
    pub exposure: f32,
    pub white_level: f32,
    pub gamma: f32,
    _padding: f32,
}

impl Default for ToneMappingUniforms {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            white_level: 1.0,
            gamma: 2.2,
            _padding: 0.0,
        }
    }
}

/// Maps HDR color into displayable range (extended Reinhard, then gamma).
pub struct ToneMappingEffect {
    uniforms: ToneMappingUniforms,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    fullscreen: FullscreenEffect,
}

impl ToneMappingEffect {
    pub fn new(backend: &WgpuBackend) -> Self {
        let device = &backend.device;
        let uniforms = ToneMappingUniforms::default();
        Self {
            uniforms,
            uniform_buffer: uniform_buffer(device, "Tone Mapping Uniforms", &uniforms),
            sampler: linear_sampler(device, "Tone Mapping Sampler"),
            fullscreen: FullscreenEffect::new(
                device,
                "Tone Mapping",
                include_str!("../shaders/tone_mapping.wgsl"),
                &single_input_layout(),
            ),
        }
    }

    #[must_use]
    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.set_exposure(exposure);
        self
    }

    #[must_use]
    pub fn with_white_level(mut self, white_level: f32) -> Self {
        self.uniforms.white_level = white_level.max(1e-2);
        self
    }

    #[must_use]
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.uniforms.gamma = gamma.max(1e-2);
        self
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.uniforms.exposure = exposure.max(0.0);
    }

    pub fn uniforms(&self) -> ToneMappingUniforms {
        self.uniforms
    }
}

impl Effect<WgpuBackend> for ToneMappingEffect {
    fn name(&self) -> &str {
        "ToneMapping"
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
