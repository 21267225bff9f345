//! Post-processing effects for the wgpu backend.

mod outline;
mod smaa;
mod tone_mapping;
mod vignette;

pub use outline::{OutlineEffect, OutlineUniforms};
pub use smaa::{SmaaEffect, SmaaUniforms};
pub use tone_mapping::{ToneMappingEffect, ToneMappingUniforms};
pub use vignette::{VignetteEffect, VignetteUniforms};

use wgpu::util::DeviceExt;

use crate::fullscreen::{sampler_entry, texture_entry, uniform_entry, FullscreenEffect};

/// Layout of single-input effects: texture, sampler, uniforms.
fn single_input_layout() -> [wgpu::BindGroupLayoutEntry; 3] {
    [texture_entry(0), sampler_entry(1), uniform_entry(2)]
}

fn single_input_bind_group(
    effect: &FullscreenEffect,
    device: &wgpu::Device,
    input: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    uniforms: &wgpu::Buffer,
) -> wgpu::BindGroup {
    effect.bind_group(
        device,
        &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(input),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniforms.as_entire_binding(),
            },
        ],
    )
}

fn uniform_buffer<T: bytemuck::Pod>(device: &wgpu::Device, label: &str, uniforms: &T) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(uniforms),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

#[allow(clippy::cast_precision_loss)]
fn texel_size(size: postfx_core::Size) -> [f32; 2] {
    let size = size.clamped();
    [1.0 / size.width as f32, 1.0 / size.height as f32]
}
