//! Subpixel morphological anti-aliasing.
//!
//! Three full-screen passes: luma edge detection, blending weight calculation
//! against the area/search lookup images, and neighborhood blending.

use std::any::Any;

use postfx_core::{ComposerError, Effect, EffectContext, Result, Size};

use super::{texel_size, uniform_buffer};
use crate::backend::WgpuBackend;
use crate::fullscreen::{
    nearest_sampler, sampler_entry, texture_entry, uniform_entry, FullscreenEffect,
};
use crate::smaa_images::{SmaaImages, AREA_MAX_DISTANCE};
use crate::target::RenderTarget;

const EDGES_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const WEIGHTS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SmaaUniforms {
    pub texel: [f32; 2],
    pub threshold: f32,
    pub max_search_steps: f32,
}

struct SmaaTargets {
    edges: RenderTarget,
    weights: RenderTarget,
}

/// Anti-aliasing effect appended to the end of the chain.
pub struct SmaaEffect {
    uniforms: SmaaUniforms,
    uniform_buffer: wgpu::Buffer,
    area: RenderTarget,
    search: RenderTarget,
    point_sampler: wgpu::Sampler,
    edges: FullscreenEffect,
    weights: FullscreenEffect,
    blend: FullscreenEffect,
    targets: Option<SmaaTargets>,
}

impl SmaaEffect {
    /// Uploads the lookup images and compiles the three stages.
    ///
    /// `threshold` is the luma difference above which an edge is detected.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(backend: &WgpuBackend, images: &SmaaImages, threshold: f32) -> Self {
        let device = &backend.device;
        let uniforms = SmaaUniforms {
            texel: texel_size(backend.size()),
            threshold: threshold.max(0.0),
            max_search_steps: AREA_MAX_DISTANCE as f32,
        };

        let (area_width, area_height) = images.area.dimensions();
        let area = RenderTarget::new(
            device,
            "SMAA Area",
            Size::new(area_width, area_height),
            wgpu::TextureFormat::Rgba8Unorm,
        );
        area.write(&backend.queue, images.area.as_raw(), 4);

        let (search_width, search_height) = images.search.dimensions();
        let search = RenderTarget::new(
            device,
            "SMAA Search",
            Size::new(search_width, search_height),
            wgpu::TextureFormat::R8Unorm,
        );
        search.write(&backend.queue, images.search.as_raw(), 1);

        let mut edges = FullscreenEffect::new(
            device,
            "SMAA Edges",
            include_str!("../shaders/smaa_edges.wgsl"),
            &[texture_entry(0), sampler_entry(1), uniform_entry(2)],
        );
        edges.prepare(device, EDGES_FORMAT);

        let mut weights = FullscreenEffect::new(
            device,
            "SMAA Weights",
            include_str!("../shaders/smaa_weights.wgsl"),
            &[
                texture_entry(0),
                texture_entry(1),
                texture_entry(2),
                sampler_entry(3),
                uniform_entry(4),
            ],
        );
        weights.prepare(device, WEIGHTS_FORMAT);

        let blend = FullscreenEffect::new(
            device,
            "SMAA Blend",
            include_str!("../shaders/smaa_blend.wgsl"),
            &[
                texture_entry(0),
                texture_entry(1),
                sampler_entry(2),
                uniform_entry(3),
            ],
        );

        Self {
            uniforms,
            uniform_buffer: uniform_buffer(device, "SMAA Uniforms", &uniforms),
            area,
            search,
            point_sampler: nearest_sampler(device, "SMAA Point Sampler"),
            edges,
            weights,
            blend,
            targets: None,
        }
    }

    /// Edge detection threshold.
    pub fn threshold(&self) -> f32 {
        self.uniforms.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.uniforms.threshold = threshold.max(0.0);
    }

    pub fn uniforms(&self) -> SmaaUniforms {
        self.uniforms
    }

    /// Size of the intermediate edge and weight buffers, once sized.
    pub fn size(&self) -> Option<Size> {
        self.targets.as_ref().map(|targets| targets.edges.size)
    }
}

impl Effect<WgpuBackend> for SmaaEffect {
    fn name(&self) -> &str {
        "SMAA"
    }

    fn set_size(&mut self, backend: &WgpuBackend, size: Size) -> Result<()> {
        let device = &backend.device;
        self.targets = Some(SmaaTargets {
            edges: RenderTarget::new(device, "SMAA Edges Target", size, EDGES_FORMAT),
            weights: RenderTarget::new(device, "SMAA Weights Target", size, WEIGHTS_FORMAT),
        });
        self.uniforms.texel = texel_size(size);
        Ok(())
    }

    fn apply(
        &mut self,
        ctx: &mut EffectContext<'_, WgpuBackend>,
        input: &RenderTarget,
        output: Option<&RenderTarget>,
    ) -> Result<()> {
        let Some(targets) = &self.targets else {
            return Err(ComposerError::Render(
                "SMAA applied before set_size".to_string(),
            ));
        };
        let backend = ctx.backend;
        let device = &backend.device;
        backend
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let edges_group = self.edges.bind_group(
            device,
            &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.point_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        );
        self.edges.draw(
            &mut ctx.frame.encoder,
            &targets.edges.view,
            EDGES_FORMAT,
            &edges_group,
        )?;

        let weights_group = self.weights.bind_group(
            device,
            &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.edges.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&self.area.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&self.search.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.point_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        );
        self.weights.draw(
            &mut ctx.frame.encoder,
            &targets.weights.view,
            WEIGHTS_FORMAT,
            &weights_group,
        )?;

        let blend_group = self.blend.bind_group(
            device,
            &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.weights.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.point_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        );
        let (encoder, view, format) = ctx.frame.attachment(output);
        self.blend.prepare(device, format);
        self.blend.draw(encoder, view, format, &blend_group)?;
        Ok(())
    }

    fn dispose(&mut self) {
        self.targets = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
