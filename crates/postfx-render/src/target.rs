//! Offscreen color buffers.

use postfx_core::{FrameBufferType, Size};

/// Returns the texture format used for a frame buffer precision.
pub fn color_format(frame_buffer_type: FrameBufferType) -> wgpu::TextureFormat {
    match frame_buffer_type {
        FrameBufferType::UnsignedByte => wgpu::TextureFormat::Rgba8Unorm,
        FrameBufferType::HalfFloat => wgpu::TextureFormat::Rgba16Float,
    }
}

/// A sampled, renderable 2D color texture.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: Size,
    pub format: wgpu::TextureFormat,
}

impl RenderTarget {
    /// Allocates a target usable as render attachment, sampled texture and copy source.
    ///
    /// Zero dimensions are clamped to 1.
    pub fn new(device: &wgpu::Device, label: &str, size: Size, format: wgpu::TextureFormat) -> Self {
        let size = size.clamped();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
            format,
        }
    }

    /// Uploads tightly packed texel data.
    pub fn write(&self, queue: &wgpu::Queue, data: &[u8], bytes_per_pixel: u32) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.size.width * bytes_per_pixel),
                rows_per_image: Some(self.size.height),
            },
            extent(self.size),
        );
    }
}

/// A depth attachment matching a color target.
#[derive(Debug)]
pub struct DepthTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: Size,
}

impl DepthTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(device: &wgpu::Device, label: &str, size: Size) -> Self {
        let size = size.clamped();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }
}

pub(crate) fn extent(size: Size) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_format() {
        assert_eq!(
            color_format(FrameBufferType::HalfFloat),
            wgpu::TextureFormat::Rgba16Float
        );
        assert_eq!(
            color_format(FrameBufferType::UnsignedByte),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }

    #[test]
    fn test_extent() {
        let e = extent(Size::new(3, 7));
        assert_eq!((e.width, e.height, e.depth_or_array_layers), (3, 7, 1));
    }
}
