//! Headless rendering integration tests.
//!
//! These tests need a GPU adapter (real or software fallback). Without one,
//! composer creation fails and each test returns early.

use std::cell::Cell;
use std::rc::Rc;

use postfx::*;

/// Creates a headless composer, or `None` when no adapter is available.
fn composer(width: u32, height: u32, options: ComposerOptions) -> Option<HeadlessComposer> {
    init_logging();
    match HeadlessComposer::new(width, height, options) {
        Ok(composer) => Some(composer),
        Err(e) => {
            eprintln!("Skipping headless test: no GPU adapter available ({e})");
            None
        }
    }
}

/// Adds a cube and frames the camera on it.
fn add_cube(composer: &HeadlessComposer) {
    let mut scene = composer.scene().write().unwrap();
    scene.add_mesh(Mesh::cube(1.0).with_color(Vec3::new(0.8, 0.3, 0.2)));
    let (min, max) = scene.bounds().unwrap();
    composer.camera().write().unwrap().look_at_box(min, max);
}

fn has_nontrivial_content(pixels: &[u8], width: u32, height: u32) -> bool {
    let total = (width * height) as usize;
    assert_eq!(pixels.len(), total * 4, "pixel buffer size mismatch");

    let all_black = pixels.chunks(4).all(|px| px[0] == 0 && px[1] == 0 && px[2] == 0);
    let first = &pixels[0..4];
    let all_uniform = pixels.chunks(4).all(|px| px == first);

    !all_black && !all_uniform
}

#[test]
fn headless_empty_scene_is_uniform() {
    let Some(mut composer) = composer(64, 48, ComposerOptions::default()) else {
        return;
    };
    composer.mount().unwrap();

    let pixels = composer.render_to_image().unwrap();
    assert_eq!(pixels.len(), 64 * 48 * 4);
    let first = &pixels[0..4];
    assert!(
        pixels.chunks(4).all(|px| px == first),
        "empty scene should be uniform background color"
    );
}

#[test]
fn headless_chain_order_after_mount() {
    let Some(mut composer) = composer(32, 32, ComposerOptions::default()) else {
        return;
    };
    composer.mount().unwrap();

    let lifecycle = composer.stage().lifecycle();
    assert_eq!(lifecycle.state(), LifecycleState::Composed);
    let chain = lifecycle.composer().unwrap();
    assert_eq!(
        chain.pass_kinds(),
        vec![PassKind::Render, PassKind::Normal, PassKind::Effect]
    );
    assert_eq!(chain.screen_passes(), vec![chain.terminal_pass().unwrap()]);
    assert_eq!(lifecycle.effect_pass().unwrap().effect_names(), vec!["SMAA"]);
}

#[test]
fn headless_mesh_with_effects() {
    let Some(mut composer) = composer(160, 120, ComposerOptions::default()) else {
        return;
    };
    add_cube(&composer);
    composer.mount().unwrap();
    composer
        .set_effects_with(|backend, ctx| {
            let effects: Vec<Box<dyn Effect<WgpuBackend>>> = vec![
                Box::new(OutlineEffect::new(backend, ctx.normal_buffer.clone())),
                Box::new(ToneMappingEffect::new(backend).with_exposure(1.2)),
                Box::new(VignetteEffect::new(backend)),
            ];
            effects
        })
        .unwrap();

    let effect_pass = composer.stage().lifecycle().effect_pass().unwrap();
    assert_eq!(
        effect_pass.effect_names(),
        vec!["Outline", "ToneMapping", "Vignette", "SMAA"]
    );

    let pixels = composer.render_to_image().unwrap();
    assert!(
        has_nontrivial_content(&pixels, 160, 120),
        "cube with effects should produce non-trivial output"
    );
}

#[test]
fn headless_without_smaa_keeps_declared_effects() {
    let options = ComposerOptions::default().with_smaa(false);
    let Some(mut composer) = composer(64, 64, options) else {
        return;
    };
    add_cube(&composer);
    composer.mount().unwrap();
    composer
        .set_effects_with(|backend, _| {
            let effects: Vec<Box<dyn Effect<WgpuBackend>>> = vec![
                Box::new(VignetteEffect::new(backend).with_darkness(0.8)),
                Box::new(ToneMappingEffect::new(backend)),
            ];
            effects
        })
        .unwrap();

    let lifecycle = composer.stage().lifecycle();
    assert_eq!(lifecycle.effect_pass().unwrap().effect_count(), 2);
    let chain = lifecycle.composer().unwrap();
    assert_eq!(chain.terminal_pass(), lifecycle.effect_pass_id());

    let pixels = composer.render_to_image().unwrap();
    assert!(has_nontrivial_content(&pixels, 64, 64));
}

#[test]
fn headless_rebuilds_do_not_grow_chain() {
    let Some(mut composer) = composer(48, 48, ComposerOptions::default()) else {
        return;
    };
    composer.mount().unwrap();
    for _ in 0..3 {
        composer
            .set_effects_with(|backend, _| {
                let effects: Vec<Box<dyn Effect<WgpuBackend>>> =
                    vec![Box::new(VignetteEffect::new(backend))];
                effects
            })
            .unwrap();
        composer.render_frame(0.016).unwrap();
    }
    let lifecycle = composer.stage().lifecycle();
    assert_eq!(lifecycle.pass_count(), 3);
    assert_eq!(lifecycle.rebuilds(), 4);
}

#[test]
fn headless_resize_keeps_passes() {
    let Some(mut composer) = composer(64, 48, ComposerOptions::default()) else {
        return;
    };
    add_cube(&composer);
    composer.mount().unwrap();
    let before = composer.stage().lifecycle().composer().unwrap().pass_ids();

    composer.resize(100, 80).unwrap();
    let chain = composer.stage().lifecycle().composer().unwrap();
    assert_eq!(chain.pass_ids(), before);
    assert_eq!(chain.size(), Size::new(100, 80));

    let pixels = composer.render_to_image().unwrap();
    assert_eq!(pixels.len(), 100 * 80 * 4);
}

#[test]
fn headless_resize_reports_poisoned_camera() {
    let Some(mut composer) = composer(64, 48, ComposerOptions::default()) else {
        return;
    };
    composer.mount().unwrap();

    let camera = std::sync::Arc::clone(composer.camera());
    let writer = std::thread::spawn(move || {
        let _guard = camera.write().unwrap();
        panic!("camera writer panicked");
    });
    assert!(writer.join().is_err());

    match composer.resize(100, 80) {
        Err(ComposerError::Render(message)) => assert!(message.contains("camera")),
        other => panic!("expected a poisoned lock error, got {other:?}"),
    }
    let chain = composer.stage().lifecycle().composer().unwrap();
    assert_eq!(chain.size(), Size::new(64, 48));
}

#[test]
fn headless_scheduler_runs_callbacks_in_priority_order() {
    let Some(mut composer) = composer(32, 32, ComposerOptions::default()) else {
        return;
    };
    composer.mount().unwrap();

    let orbits = Rc::new(Cell::new(0));
    let seen = Rc::clone(&orbits);
    composer.subscribe(0, move |stage, delta| {
        stage.camera().write().unwrap().orbit(delta, 0.0);
        seen.set(seen.get() + 1);
        Ok(())
    });
    assert_eq!(composer.scheduler().priorities(), vec![0, 1]);

    for _ in 0..3 {
        composer.render_frame(0.016).unwrap();
    }
    assert_eq!(orbits.get(), 3);
    assert_eq!(composer.scheduler().ticks(), 3);
    let frames = composer
        .stage()
        .lifecycle()
        .composer()
        .unwrap()
        .frames_rendered();
    assert_eq!(frames, 3);
}

#[test]
fn headless_failing_callback_aborts_frame() {
    let Some(mut composer) = composer(32, 32, ComposerOptions::default()) else {
        return;
    };
    composer.mount().unwrap();
    composer.subscribe(0, |_, _| Err(ComposerError::Render("boom".to_string())));

    assert!(composer.render_frame(0.016).is_err());
    let frames = composer
        .stage()
        .lifecycle()
        .composer()
        .unwrap()
        .frames_rendered();
    assert_eq!(frames, 0);
}

#[test]
fn headless_camera_change_rebuilds_composer() {
    let Some(mut composer) = composer(32, 32, ComposerOptions::default()) else {
        return;
    };
    composer.mount().unwrap();
    composer
        .set_effects_with(|backend, _| {
            let effects: Vec<Box<dyn Effect<WgpuBackend>>> =
                vec![Box::new(VignetteEffect::new(backend))];
            effects
        })
        .unwrap();

    let camera = std::sync::Arc::new(std::sync::RwLock::new(Camera::default()));
    assert!(composer.stage_mut().set_camera(camera).unwrap());
    let effect_pass = composer.stage().lifecycle().effect_pass().unwrap();
    assert_eq!(effect_pass.effect_names(), vec!["Vignette", "SMAA"]);
    composer.render_frame(0.016).unwrap();
}

#[test]
fn headless_unmount_disposes() {
    let Some(mut composer) = composer(32, 32, ComposerOptions::default()) else {
        return;
    };
    composer.mount().unwrap();
    composer.render_frame(0.016).unwrap();

    composer.unmount();
    composer.unmount();
    let lifecycle = composer.stage().lifecycle();
    assert_eq!(lifecycle.pass_count(), 0);
    assert_eq!(lifecycle.state(), LifecycleState::Disposed);
    assert!(matches!(
        composer.render_frame(0.016),
        Err(ComposerError::Disposed)
    ));
}

#[test]
fn headless_render_to_file() {
    let mut scene = Scene::new();
    scene.add_mesh(Mesh::uv_sphere(0.5, 16, 8));
    let path = std::env::temp_dir().join(format!("postfx_headless_{}.png", std::process::id()));
    match render_to_file(scene, &path, 80, 60, ComposerOptions::default()) {
        Ok(()) => {
            let image = image_dimensions(&path);
            assert_eq!(image, (80, 60));
            let _ = std::fs::remove_file(&path);
        }
        Err(ComposerError::Render(e)) => {
            eprintln!("Skipping headless test: {e}");
        }
        Err(e) => panic!("unexpected error: {e}"),
    }
}

fn image_dimensions(path: &std::path::Path) -> (u32, u32) {
    let bytes = std::fs::read(path).unwrap();
    // PNG IHDR: width and height are big-endian u32s at byte 16.
    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    (width, height)
}
