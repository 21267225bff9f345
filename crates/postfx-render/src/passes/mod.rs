//! Scene-dependent passes attached by the composer lifecycle.

mod normal_pass;
mod render_pass;

use std::sync::{RwLock, RwLockReadGuard};

pub use normal_pass::{NormalBuffer, NormalPass, NORMAL_FORMAT};
pub use render_pass::RenderPass;

use crate::error::{RenderError, RenderResult};
use crate::scene::SceneGeometry;

pub(crate) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    name: &'static str,
) -> RenderResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| RenderError::LockPoisoned(name))
}

/// Uniform buffer and bind group holding [`SceneUniforms`](crate::scene::SceneUniforms).
pub(crate) struct SceneBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl SceneBinding {
    pub fn new(backend: &crate::WgpuBackend, label: &str) -> Self {
        let buffer = backend.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<crate::scene::SceneUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = backend
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &backend.scene_bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
        Self { buffer, bind_group }
    }
}

/// Records one scene draw into `color` (and `depth`, if any).
#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_scene(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    color: &wgpu::TextureView,
    depth: Option<&wgpu::TextureView>,
    clear: wgpu::Color,
    pipeline: &wgpu::RenderPipeline,
    binding: &SceneBinding,
    geometry: &SceneGeometry,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Discard,
            }),
            stencil_ops: None,
        }),
        ..Default::default()
    });

    render_pass.set_pipeline(pipeline);
    render_pass.set_bind_group(0, &binding.bind_group, &[]);
    geometry.draw(&mut render_pass);
}
