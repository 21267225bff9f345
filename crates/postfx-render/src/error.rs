//! Rendering error types.

use postfx_core::ComposerError;
use thiserror::Error;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create surface.
    #[error("failed to create surface: {0}")]
    SurfaceCreationFailed(#[from] wgpu::CreateSurfaceError),

    /// The surface reported no supported formats.
    #[error("surface configuration failed")]
    SurfaceConfigurationFailed,

    /// Surface lost.
    #[error("surface lost")]
    SurfaceLost,

    /// Surface outdated.
    #[error("surface outdated")]
    SurfaceOutdated,

    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,

    /// Timeout waiting for GPU.
    #[error("timeout waiting for GPU")]
    Timeout,

    /// No pipeline was prepared for a color format.
    #[error("no {pipeline} pipeline for format {format:?}")]
    MissingPipeline {
        pipeline: &'static str,
        format: wgpu::TextureFormat,
    },

    /// Shared scene or camera state was poisoned by a panicking writer.
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    /// Frame readback was requested from a windowed backend.
    #[error("frame capture is only available on headless backends")]
    CaptureUnavailable,

    /// Mapping a readback buffer failed.
    #[error("GPU buffer mapping failed")]
    BufferMapFailed,

    /// Failed to load or decode an image.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// An image had unexpected dimensions.
    #[error("{name} image is {actual_width}x{actual_height}, expected {width}x{height}")]
    ImageSize {
        name: &'static str,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(err: wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost => Self::SurfaceLost,
            wgpu::SurfaceError::OutOfMemory => Self::OutOfMemory,
            wgpu::SurfaceError::Timeout => Self::Timeout,
            _ => Self::SurfaceOutdated,
        }
    }
}

impl From<RenderError> for ComposerError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Image(_) | RenderError::ImageSize { .. } => {
                ComposerError::ResourceLoad(err.to_string())
            }
            other => ComposerError::Render(other.to_string()),
        }
    }
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
