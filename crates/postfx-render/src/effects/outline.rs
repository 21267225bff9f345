//! Normal-based outline effect.

use std::any::Any;

use glam::Vec4;
use postfx_core::{Backend, Effect, EffectContext, Result, Size};

use super::{texel_size, uniform_buffer};
use crate::backend::WgpuBackend;
use crate::fullscreen::{nearest_sampler, sampler_entry, texture_entry, uniform_entry, FullscreenEffect};
use crate::passes::NormalBuffer;
use crate::target::RenderTarget;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OutlineUniforms {
    pub color: [f32; 4],
    pub texel: [f32; 2],
    pub thickness: f32,
    pub threshold: f32,
}

impl Default for OutlineUniforms {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            texel: [1.0, 1.0],
            thickness: 1.0,
            threshold: 0.2,
        }
    }
}

/// Draws lines where the normal buffer changes sharply.
///
/// Reads the texture behind a [`NormalBuffer`], usually the one published by
/// the composer context. Frames rendered before the normal pass has been sized
/// pass the input through unchanged.
pub struct OutlineEffect {
    normals: NormalBuffer,
    uniforms: OutlineUniforms,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    fullscreen: FullscreenEffect,
}

impl OutlineEffect {
    pub fn new(backend: &WgpuBackend, normals: NormalBuffer) -> Self {
        let device = &backend.device;
        let uniforms = OutlineUniforms {
            texel: texel_size(backend.size()),
            ..OutlineUniforms::default()
        };
        Self {
            normals,
            uniforms,
            uniform_buffer: uniform_buffer(device, "Outline Uniforms", &uniforms),
            sampler: nearest_sampler(device, "Outline Sampler"),
            fullscreen: FullscreenEffect::new(
                device,
                "Outline",
                include_str!("../shaders/outline.wgsl"),
                &[
                    texture_entry(0),
                    texture_entry(1),
                    sampler_entry(2),
                    uniform_entry(3),
                ],
            ),
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.uniforms.color = color.to_array();
        self
    }

    #[must_use]
    pub fn with_thickness(mut self, thickness: f32) -> Self {
        self.uniforms.thickness = thickness.max(0.0);
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.uniforms.threshold = threshold.max(0.0);
        self
    }

    pub fn normals(&self) -> &NormalBuffer {
        &self.normals
    }

    pub fn uniforms(&self) -> OutlineUniforms {
        self.uniforms
    }
}

impl Effect<WgpuBackend> for OutlineEffect {
    fn name(&self) -> &str {
        "Outline"
    }

    fn set_size(&mut self, _backend: &WgpuBackend, size: Size) -> Result<()> {
        self.uniforms.texel = texel_size(size);
        Ok(())
    }

    fn apply(
        &mut self,
        ctx: &mut EffectContext<'_, WgpuBackend>,
        input: &RenderTarget,
        output: Option<&RenderTarget>,
    ) -> Result<()> {
        let backend = ctx.backend;
        let Some(normals) = self.normals.target() else {
            log::trace!("normal buffer not ready, skipping outline");
            return backend.copy_target(ctx.frame, input, output);
        };
        backend
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let bind_group = self.fullscreen.bind_group(
            &backend.device,
            &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&normals.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        );
        let (encoder, view, format) = ctx.frame.attachment(output);
        self.fullscreen.prepare(&backend.device, format);
        self.fullscreen.draw(encoder, view, format, &bind_group)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
