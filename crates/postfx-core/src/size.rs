//! Surface dimensions and frame buffer precision.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pixel dimensions of a rendering surface or buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Creates a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns this size with both dimensions raised to at least 1.
    ///
    /// GPU textures cannot have zero extent.
    pub fn clamped(self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
        }
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height, using the clamped size.
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(self) -> f32 {
        let size = self.clamped();
        size.width as f32 / size.height as f32
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Storage precision of the composer's frame buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrameBufferType {
    /// 8 bits per channel, normalized.
    UnsignedByte,
    /// 16-bit floating point per channel (HDR).
    #[default]
    HalfFloat,
}

impl FrameBufferType {
    /// Bytes per RGBA pixel.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            FrameBufferType::UnsignedByte => 4,
            FrameBufferType::HalfFloat => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_clamped() {
        assert_eq!(Size::new(0, 0).clamped(), Size::new(1, 1));
        assert_eq!(Size::new(640, 0).clamped(), Size::new(640, 1));
        assert!(Size::new(0, 10).is_empty());
        assert!(!Size::new(1, 1).is_empty());
    }

    #[test]
    fn test_size_aspect_ratio() {
        assert!((Size::new(1920, 1080).aspect_ratio() - 16.0 / 9.0).abs() < 1e-6);
        // Degenerate heights never divide by zero
        assert!(Size::new(10, 0).aspect_ratio().is_finite());
    }

    #[test]
    fn test_frame_buffer_type_default() {
        assert_eq!(FrameBufferType::default(), FrameBufferType::HalfFloat);
        assert_eq!(FrameBufferType::HalfFloat.bytes_per_pixel(), 8);
        assert_eq!(FrameBufferType::UnsignedByte.bytes_per_pixel(), 4);
    }
}
