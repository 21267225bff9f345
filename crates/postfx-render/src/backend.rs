//! The wgpu implementation of the composer backend.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use postfx_core::{
    Backend, Binding, ComposerOptions, Effect, FrameBufferType, Pass, PassFactory, Result, Size,
};

use crate::camera::Camera;
use crate::effects::SmaaEffect;
use crate::error::{RenderError, RenderResult};
use crate::fullscreen::Blitter;
use crate::passes::{NormalBuffer, NormalPass, RenderPass};
use crate::scene::{Scene, Vertex};
use crate::smaa_images::SmaaImages;
use crate::target::{color_format, RenderTarget};

static NEXT_RENDERER_ID: AtomicU64 = AtomicU64::new(1);

/// Format of the offscreen surface used by headless backends.
pub const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Per-frame recording state: a command encoder and the view presented at the end.
pub struct WgpuFrame {
    pub encoder: wgpu::CommandEncoder,
    pub screen_view: wgpu::TextureView,
    pub screen_format: wgpu::TextureFormat,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl WgpuFrame {
    /// Splits the frame into its encoder and the attachment for `output`,
    /// falling back to the visible surface when `output` is `None`.
    pub fn attachment<'a>(
        &'a mut self,
        output: Option<&'a RenderTarget>,
    ) -> (
        &'a mut wgpu::CommandEncoder,
        &'a wgpu::TextureView,
        wgpu::TextureFormat,
    ) {
        match output {
            Some(target) => (&mut self.encoder, &target.view, target.format),
            None => (&mut self.encoder, &self.screen_view, self.screen_format),
        }
    }
}

enum Screen {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen(RenderTarget),
}

/// Device, queue and presentation target shared by every pass and effect.
pub struct WgpuBackend {
    id: u64,
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    screen: Screen,
    size: Size,
    blitter: Blitter,
    pub(crate) scene_shader: wgpu::ShaderModule,
    pub(crate) scene_bind_group_layout: wgpu::BindGroupLayout,
    pub(crate) scene_pipeline_layout: wgpu::PipelineLayout,
    smaa_image_paths: Option<(PathBuf, PathBuf)>,
}

impl WgpuBackend {
    /// Creates a backend that renders into an offscreen texture.
    pub async fn new_headless(width: u32, height: u32) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = Self::request_device(&adapter, "postfx device (headless)").await?;
        let size = Size::new(width, height).clamped();
        let screen = Screen::Offscreen(RenderTarget::new(
            &device,
            "Headless Screen",
            size,
            HEADLESS_FORMAT,
        ));
        Ok(Self::with_screen(device, queue, screen, size))
    }

    /// Creates a backend presenting to `window`.
    pub async fn new_windowed(window: Arc<winit::window::Window>) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = Self::request_device(&adapter, "postfx device").await?;

        let inner = window.inner_size();
        let size = Size::new(inner.width, inner.height).clamped();

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::SurfaceConfigurationFailed)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self::with_screen(
            device,
            queue,
            Screen::Surface { surface, config },
            size,
        ))
    }

    async fn request_device(
        adapter: &wgpu::Adapter,
        label: &str,
    ) -> RenderResult<(wgpu::Device, wgpu::Queue)> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;
        Ok((device, queue))
    }

    fn with_screen(device: wgpu::Device, queue: wgpu::Queue, screen: Screen, size: Size) -> Self {
        let screen_format = match &screen {
            Screen::Surface { config, .. } => config.format,
            Screen::Offscreen(target) => target.format,
        };
        let blitter = Blitter::new(
            &device,
            &[
                color_format(FrameBufferType::UnsignedByte),
                color_format(FrameBufferType::HalfFloat),
                screen_format,
            ],
        );

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });
        let scene_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let scene_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&scene_bind_group_layout],
            push_constant_ranges: &[],
        });

        let id = NEXT_RENDERER_ID.fetch_add(1, Ordering::Relaxed);
        log::info!("wgpu backend #{id} ready at {size} ({screen_format:?})");
        Self {
            id,
            device,
            queue,
            screen,
            size,
            blitter,
            scene_shader,
            scene_bind_group_layout,
            scene_pipeline_layout,
            smaa_image_paths: None,
        }
    }

    /// Loads the anti-aliasing lookup images from files instead of generating them.
    #[must_use]
    pub fn with_smaa_images(mut self, area: impl Into<PathBuf>, search: impl Into<PathBuf>) -> Self {
        self.smaa_image_paths = Some((area.into(), search.into()));
        self
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Current presentation size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Format of the visible surface.
    pub fn screen_format(&self) -> wgpu::TextureFormat {
        match &self.screen {
            Screen::Surface { config, .. } => config.format,
            Screen::Offscreen(target) => target.format,
        }
    }

    pub fn is_headless(&self) -> bool {
        matches!(self.screen, Screen::Offscreen(_))
    }

    /// Resizes the visible surface. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let size = Size::new(width, height);
        match &mut self.screen {
            Screen::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            Screen::Offscreen(target) => {
                *target = RenderTarget::new(&self.device, "Headless Screen", size, HEADLESS_FORMAT);
            }
        }
        self.size = size;
    }

    /// Starts recording a frame.
    ///
    /// Lost or outdated surfaces are reconfigured and reported so the caller
    /// can skip the frame.
    pub fn begin_frame(&self) -> RenderResult<WgpuFrame> {
        let (screen_view, screen_format, surface_texture) = match &self.screen {
            Screen::Surface { surface, config } => {
                let texture = match surface.get_current_texture() {
                    Ok(texture) => texture,
                    Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                        log::warn!("surface unavailable ({err}), reconfiguring");
                        surface.configure(&self.device, config);
                        return Err(err.into());
                    }
                    Err(err) => return Err(err.into()),
                };
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                (view, config.format, Some(texture))
            }
            Screen::Offscreen(target) => (target.view.clone(), target.format, None),
        };

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("postfx frame encoder"),
            });
        Ok(WgpuFrame {
            encoder,
            screen_view,
            screen_format,
            surface_texture,
        })
    }

    /// Submits the recorded commands and presents the surface.
    pub fn finish_frame(&self, frame: WgpuFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        if let Some(texture) = frame.surface_texture {
            texture.present();
        }
    }

    /// Calculates bytes per row with proper alignment for wgpu buffer copies.
    fn aligned_bytes_per_row(width: u32) -> u32 {
        let bytes_per_pixel = 4u32; // RGBA8
        let unaligned = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        unaligned.div_ceil(align) * align
    }

    /// Reads back the headless surface as tightly packed RGBA8 rows.
    pub fn capture_frame(&self) -> RenderResult<Vec<u8>> {
        let Screen::Offscreen(target) = &self.screen else {
            return Err(RenderError::CaptureUnavailable);
        };
        let Size { width, height } = target.size;
        let bytes_per_row = Self::aligned_bytes_per_row(width);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("capture buffer"),
            size: u64::from(bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("capture copy encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            crate::target::extent(target.size),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
        rx.recv()
            .map_err(|_| RenderError::BufferMapFailed)?
            .map_err(|_| RenderError::BufferMapFailed)?;

        // Copy data, removing row padding
        let data = buffer_slice.get_mapped_range();
        let row_bytes = (width * 4) as usize;
        let mut result = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height {
            let start = (row * bytes_per_row) as usize;
            result.extend_from_slice(&data[start..start + row_bytes]);
        }
        drop(data);
        buffer.unmap();

        Ok(result)
    }

    fn load_smaa_images(&self) -> RenderResult<SmaaImages> {
        match &self.smaa_image_paths {
            Some((area, search)) => SmaaImages::load(area, search),
            None => Ok(SmaaImages::generate()),
        }
    }
}

impl Backend for WgpuBackend {
    type Target = RenderTarget;
    type Frame = WgpuFrame;
    type Scene = RwLock<Scene>;
    type Camera = RwLock<Camera>;

    fn renderer_id(&self) -> u64 {
        self.id
    }

    fn create_target(
        &self,
        label: &str,
        size: Size,
        frame_buffer_type: FrameBufferType,
    ) -> Result<RenderTarget> {
        Ok(RenderTarget::new(
            &self.device,
            label,
            size,
            color_format(frame_buffer_type),
        ))
    }

    fn copy_target(
        &self,
        frame: &mut WgpuFrame,
        source: &RenderTarget,
        destination: Option<&RenderTarget>,
    ) -> Result<()> {
        let (encoder, view, format) = frame.attachment(destination);
        self.blitter
            .blit(&self.device, encoder, &source.view, view, format)?;
        Ok(())
    }
}

impl PassFactory for WgpuBackend {
    type AntialiasResource = SmaaImages;
    type NormalBuffer = NormalBuffer;

    fn create_render_pass(
        &self,
        binding: &Binding<Self>,
        options: &ComposerOptions,
    ) -> Result<Box<dyn Pass<Self>>> {
        Ok(Box::new(RenderPass::new(
            self,
            Arc::clone(&binding.scene),
            Arc::clone(&binding.camera),
            options.depth_buffer,
        )))
    }

    fn create_normal_buffer(&self) -> NormalBuffer {
        NormalBuffer::default()
    }

    fn create_normal_pass(
        &self,
        binding: &Binding<Self>,
        buffer: &NormalBuffer,
    ) -> Result<Box<dyn Pass<Self>>> {
        Ok(Box::new(NormalPass::new(
            self,
            Arc::clone(&binding.scene),
            Arc::clone(&binding.camera),
            buffer.clone(),
        )))
    }

    fn load_antialias_resource(&self) -> Result<SmaaImages> {
        let images = self.load_smaa_images()?;
        log::debug!("anti-aliasing lookup images ready");
        Ok(images)
    }

    fn create_antialias_effect(
        &self,
        resource: &SmaaImages,
        edge_detection: f32,
    ) -> Result<Box<dyn Effect<Self>>> {
        Ok(Box::new(SmaaEffect::new(self, resource, edge_detection)))
    }
}

/// Scene pipeline for one fragment entry point, created per output format.
pub(crate) fn create_scene_pipeline(
    backend: &WgpuBackend,
    label: &str,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
    depth: bool,
) -> wgpu::RenderPipeline {
    backend
        .device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&backend.scene_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &backend.scene_shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &backend.scene_shader,
                entry_point: Some(fragment_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: depth.then(|| wgpu::DepthStencilState {
                format: crate::target::DepthTarget::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a headless backend, or `None` when no adapter is available.
    fn headless(width: u32, height: u32) -> Option<WgpuBackend> {
        match pollster::block_on(WgpuBackend::new_headless(width, height)) {
            Ok(backend) => Some(backend),
            Err(e) => {
                eprintln!("Skipping GPU test: {e}");
                None
            }
        }
    }

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(WgpuBackend::aligned_bytes_per_row(1), 256);
        assert_eq!(WgpuBackend::aligned_bytes_per_row(64), 256);
        assert_eq!(WgpuBackend::aligned_bytes_per_row(65), 512);
    }

    #[test]
    fn test_headless_capture_size() {
        let Some(backend) = headless(40, 30) else {
            return;
        };
        assert!(backend.is_headless());
        assert_eq!(backend.screen_format(), HEADLESS_FORMAT);

        let frame = backend.begin_frame().unwrap();
        backend.finish_frame(frame);
        let pixels = backend.capture_frame().unwrap();
        assert_eq!(pixels.len(), 40 * 30 * 4);
    }

    #[test]
    fn test_renderer_ids_are_unique() {
        let (Some(a), Some(b)) = (headless(8, 8), headless(8, 8)) else {
            return;
        };
        assert_ne!(a.renderer_id(), b.renderer_id());
    }

    #[test]
    fn test_copy_target_to_screen() {
        let Some(backend) = headless(4, 4) else {
            return;
        };
        let target = backend
            .create_target("red", Size::new(4, 4), FrameBufferType::UnsignedByte)
            .unwrap();
        let red: Vec<u8> = [255, 0, 0, 255].repeat(16);
        target.write(&backend.queue, &red, 4);

        let mut frame = backend.begin_frame().unwrap();
        backend.copy_target(&mut frame, &target, None).unwrap();
        backend.finish_frame(frame);

        let pixels = backend.capture_frame().unwrap();
        assert!(pixels.chunks(4).all(|px| px == [255, 0, 0, 255]));
    }

    #[test]
    fn test_resize_ignores_zero() {
        let Some(mut backend) = headless(16, 16) else {
            return;
        };
        backend.resize(0, 10);
        assert_eq!(backend.size(), Size::new(16, 16));
        backend.resize(32, 8);
        assert_eq!(backend.size(), Size::new(32, 8));
        assert_eq!(backend.capture_frame().unwrap().len(), 32 * 8 * 4);
    }
}
