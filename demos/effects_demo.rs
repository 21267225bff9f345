#![allow(clippy::cast_precision_loss)]
//! Renders a small scene through several effect chains and saves each frame.
//!
//! Run with: cargo run --example effects_demo
//!
//! Outputs PNG files to target/postfx-demo/

use std::path::Path;

use postfx::*;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const OUT_DIR: &str = "target/postfx-demo";

type Effects = Vec<Box<dyn Effect<WgpuBackend>>>;

fn build_scene(scene: &mut Scene) {
    scene.set_background(Vec4::new(0.12, 0.13, 0.16, 1.0));
    scene.add_mesh(Mesh::plane(6.0).with_color(Vec3::new(0.55, 0.55, 0.5)));
    scene.add_mesh(
        Mesh::cube(1.0)
            .with_color(Vec3::new(0.85, 0.35, 0.2))
            .with_transform(Mat4::from_translation(Vec3::new(-0.9, 0.5, 0.0))),
    );
    scene.add_mesh(
        Mesh::uv_sphere(0.6, 32, 16)
            .with_color(Vec3::new(0.25, 0.5, 0.9))
            .with_transform(Mat4::from_translation(Vec3::new(0.9, 0.6, 0.3))),
    );
}

fn render(
    composer: &mut HeadlessComposer,
    name: &str,
    build: impl FnOnce(&WgpuBackend, &ComposerContext<'_, WgpuBackend>) -> Effects,
) -> Result<()> {
    composer.set_effects_with(build)?;
    let names = composer
        .stage()
        .lifecycle()
        .effect_pass()
        .map(|pass| pass.effect_names().join(" -> "))
        .unwrap_or_default();
    let path = Path::new(OUT_DIR).join(format!("{name}.png"));
    composer.render_to_file(&path)?;
    println!("  {name:<12} [{names}] -> {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    std::fs::create_dir_all(OUT_DIR).map_err(|e| ComposerError::Render(e.to_string()))?;

    let mut composer = HeadlessComposer::new(WIDTH, HEIGHT, ComposerOptions::default())?;
    {
        let mut scene = composer
            .scene()
            .write()
            .map_err(|_| ComposerError::Render("scene lock poisoned".into()))?;
        build_scene(&mut scene);
    }
    if let Ok(mut camera) = composer.camera().write() {
        *camera = Camera::new(WIDTH as f32 / HEIGHT as f32)
            .looking_at(Vec3::new(2.5, 2.2, 3.5), Vec3::new(0.0, 0.4, 0.0));
    }
    composer.mount()?;

    println!("Rendering {WIDTH}x{HEIGHT} frames:");
    render(&mut composer, "plain", |_, _| Vec::new())?;
    render(&mut composer, "outline", |backend, ctx| {
        vec![Box::new(
            OutlineEffect::new(backend, ctx.normal_buffer.clone())
                .with_color(Vec4::new(0.05, 0.05, 0.05, 1.0))
                .with_thickness(1.5),
        )]
    })?;
    render(&mut composer, "tone_mapped", |backend, _| {
        vec![Box::new(
            ToneMappingEffect::new(backend)
                .with_exposure(1.6)
                .with_white_level(2.0),
        )]
    })?;
    render(&mut composer, "stacked", |backend, ctx| {
        vec![
            Box::new(OutlineEffect::new(backend, ctx.normal_buffer.clone())),
            Box::new(ToneMappingEffect::new(backend).with_exposure(1.2)),
            Box::new(VignetteEffect::new(backend).with_darkness(0.7)),
        ]
    })?;

    composer.stage_mut().set_edge_detection(0.05)?;
    render(&mut composer, "sharp_aa", |backend, _| {
        vec![Box::new(VignetteEffect::new(backend))]
    })?;

    composer.unmount();
    println!("Done.");
    Ok(())
}
