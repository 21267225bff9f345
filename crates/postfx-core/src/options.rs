//! Configuration options for the effect composer.

use serde::{Deserialize, Serialize};

use crate::error::{ComposerError, Result};
use crate::size::FrameBufferType;

/// Declared configuration of an effect composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerOptions {
    /// Whether the anti-aliasing effect is appended to the effect chain.
    pub smaa: bool,

    /// Edge-detection sensitivity of the anti-aliasing effect.
    pub edge_detection: f32,

    /// Priority of the per-frame render callback (lower runs first).
    pub render_priority: i32,

    /// Precision of the composer's frame buffers.
    pub frame_buffer_type: FrameBufferType,

    /// Whether the scene render pass uses a depth buffer.
    pub depth_buffer: bool,
}

impl Default for ComposerOptions {
    fn default() -> Self {
        Self {
            smaa: true,
            edge_detection: 0.1,
            render_priority: 1,
            frame_buffer_type: FrameBufferType::HalfFloat,
            depth_buffer: true,
        }
    }
}

impl ComposerOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates options from JSON.
    ///
    /// Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Serializes these options to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        validate_edge_detection(self.edge_detection)
    }

    /// Enables or disables anti-aliasing.
    pub fn with_smaa(mut self, smaa: bool) -> Self {
        self.smaa = smaa;
        self
    }

    /// Sets the edge-detection sensitivity.
    pub fn with_edge_detection(mut self, edge_detection: f32) -> Self {
        self.edge_detection = edge_detection;
        self
    }

    /// Sets the frame callback priority.
    pub fn with_render_priority(mut self, render_priority: i32) -> Self {
        self.render_priority = render_priority;
        self
    }

    /// Sets the frame buffer precision.
    pub fn with_frame_buffer_type(mut self, frame_buffer_type: FrameBufferType) -> Self {
        self.frame_buffer_type = frame_buffer_type;
        self
    }

    /// Enables or disables the scene depth buffer.
    pub fn with_depth_buffer(mut self, depth_buffer: bool) -> Self {
        self.depth_buffer = depth_buffer;
        self
    }
}

pub(crate) fn validate_edge_detection(value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ComposerError::InvalidOption {
            name: "edge_detection",
            reason: format!("expected a finite non-negative threshold, got {value}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = ComposerOptions::default();
        assert!(options.smaa);
        assert_eq!(options.edge_detection, 0.1);
        assert_eq!(options.render_priority, 1);
        assert_eq!(options.frame_buffer_type, FrameBufferType::HalfFloat);
        assert!(options.depth_buffer);
    }

    #[test]
    fn test_options_builder() {
        let options = ComposerOptions::new()
            .with_smaa(false)
            .with_edge_detection(0.05)
            .with_render_priority(3);
        assert!(!options.smaa);
        assert_eq!(options.edge_detection, 0.05);
        assert_eq!(options.render_priority, 3);
    }

    #[test]
    fn test_options_from_partial_json() {
        let options = ComposerOptions::from_json(r#"{ "smaa": false, "render_priority": 2 }"#)
            .expect("valid json");
        assert!(!options.smaa);
        assert_eq!(options.render_priority, 2);
        assert_eq!(options.edge_detection, 0.1);
    }

    #[test]
    fn test_options_json_roundtrip() {
        let options = ComposerOptions::new().with_frame_buffer_type(FrameBufferType::UnsignedByte);
        let json = options.to_json().unwrap();
        assert_eq!(ComposerOptions::from_json(&json).unwrap(), options);
    }

    #[test]
    fn test_options_rejects_bad_threshold() {
        let err = ComposerOptions::new()
            .with_edge_detection(-1.0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ComposerError::InvalidOption {
                name: "edge_detection",
                ..
            }
        ));
        assert!(ComposerOptions::new()
            .with_edge_detection(f32::NAN)
            .validate()
            .is_err());
        assert!(matches!(
            ComposerOptions::from_json("{ not json"),
            Err(ComposerError::Json(_))
        ));
    }
}
