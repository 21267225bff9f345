//! Configuration surface tests; no GPU required.

use postfx::*;
use proptest::prelude::*;

#[test]
fn test_defaults() {
    let options = ComposerOptions::default();
    assert!(options.smaa);
    assert!((options.edge_detection - 0.1).abs() < f32::EPSILON);
    assert_eq!(options.render_priority, 1);
    assert_eq!(options.frame_buffer_type, FrameBufferType::HalfFloat);
    assert!(options.depth_buffer);
}

#[test]
fn test_partial_json_uses_defaults() {
    let options = ComposerOptions::from_json(r#"{ "smaa": false, "render_priority": 3 }"#).unwrap();
    assert!(!options.smaa);
    assert_eq!(options.render_priority, 3);
    assert_eq!(options.frame_buffer_type, FrameBufferType::HalfFloat);
}

#[test]
fn test_json_rejects_negative_edge_detection() {
    let result = ComposerOptions::from_json(r#"{ "edge_detection": -0.5 }"#);
    assert!(matches!(
        result,
        Err(ComposerError::InvalidOption {
            name: "edge_detection",
            ..
        })
    ));
}

#[test]
fn test_malformed_json() {
    assert!(matches!(
        ComposerOptions::from_json("{ smaa: "),
        Err(ComposerError::Json(_))
    ));
}

#[test]
fn test_lifecycle_rejects_invalid_options() {
    let options = ComposerOptions::default().with_edge_detection(f32::NAN);
    assert!(ComposerLifecycle::<WgpuBackend>::new(options).is_err());
}

#[test]
fn test_unmounted_lifecycle() {
    let mut lifecycle = ComposerLifecycle::<WgpuBackend>::new(ComposerOptions::default()).unwrap();
    assert_eq!(lifecycle.state(), LifecycleState::Created);
    assert_eq!(lifecycle.priority(), 1);
    assert_eq!(lifecycle.pass_count(), 0);
    assert!(lifecycle.context().is_none());
    lifecycle.unmount();
    assert_eq!(lifecycle.state(), LifecycleState::Created);
}

proptest! {
    #[test]
    fn prop_json_roundtrip_preserves_options(
        smaa in any::<bool>(),
        edge_detection in 0.0f32..1.0,
        render_priority in -100i32..100,
        half_float in any::<bool>(),
    ) {
        let frame_buffer_type = if half_float {
            FrameBufferType::HalfFloat
        } else {
            FrameBufferType::UnsignedByte
        };
        let options = ComposerOptions::default()
            .with_smaa(smaa)
            .with_edge_detection(edge_detection)
            .with_render_priority(render_priority)
            .with_frame_buffer_type(frame_buffer_type);
        let parsed = ComposerOptions::from_json(&options.to_json().unwrap()).unwrap();
        prop_assert_eq!(parsed, options);
    }
}
