//! White furnace demo.
//!
//! Renders the inside of a uniformly emitting diffuse sphere holding a
//! Lambertian ball of the same albedo and a rough Oren-Nayar box. Every
//! pixel on the Lambertian surfaces tends to `L / (1 - ρ)`, so the ball
//! fades into the background as samples accumulate. Writes `furnace.png`.
//!
//! Usage: `cargo run --example furnace [config.json] [output.png]`

use std::time::Instant;

use anyhow::{Context, Result};
use lumen_core::{Mesh, ObjectDesc, OrenNayar, Scene, Transform};
use lumen_engine::{load_scene, Compositor, PinholeCamera, RadianceBuffer, RenderConfig, RenderEngine};
use lumen_math::{Quat, Vec3};

const ALBEDO: f32 = 0.7;
const RADIANCE: f32 = 1.0;
const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const FRAMES: u32 = 16;
const SAMPLES_PER_FRAME: u32 = 4;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            RenderConfig::from_json(&json)?
        }
        None => RenderConfig::default(),
    };
    let output = args.next().unwrap_or_else(|| "furnace.png".to_string());

    let scene = build_scene();
    let (path_space, lights) = load_scene(&scene, config.layout);

    let camera = PinholeCamera::new()
        .with_position(Vec3::new(0.0, 1.0, 6.0), Vec3::ZERO, Vec3::Y)
        .with_lens(55.0, WIDTH as f32 / HEIGHT as f32);

    let mut engine = RenderEngine::new(&config)?;
    let mut radiance = RadianceBuffer::new(WIDTH, HEIGHT);

    println!(
        "Rendering {}x{} with {} ({} threads)...",
        WIDTH,
        HEIGHT,
        config.integrator,
        engine.num_threads()
    );
    let start = Instant::now();
    for _ in 0..FRAMES {
        engine.render(path_space.as_ref(), &lights, &camera, SAMPLES_PER_FRAME, &mut radiance);
    }
    println!("Rendered {} spp in {:?}", engine.sample_count(), start.elapsed());

    let mean = radiance.average();
    println!(
        "Mean radiance {:.3} {:.3} {:.3}, closed form {:.3}",
        mean.x,
        mean.y,
        mean.z,
        RADIANCE / (1.0 - ALBEDO)
    );

    // Preview scaled so the closed-form value maps to mid grey.
    let scale = 0.25 * (1.0 - ALBEDO) / RADIANCE;
    let mut preview = RadianceBuffer::new(WIDTH, HEIGHT);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            preview.set(x, y, radiance.get(x, y) * scale);
        }
    }
    image::save_buffer(&output, &preview.to_rgba8(), WIDTH, HEIGHT, image::ColorType::Rgba8)
        .with_context(|| format!("writing {output}"))?;
    println!("Saved to {}", output);
    Ok(())
}

fn build_scene() -> Scene {
    let mut scene = Scene::new();
    let grey = || OrenNayar::new(Vec3::splat(ALBEDO), 0.0);

    scene.add_object(
        ObjectDesc::new("furnace", Mesh::uv_sphere(Vec3::ZERO, 20.0, 48, true))
            .with_material(grey())
            .with_emission(Vec3::splat(RADIANCE)),
    );
    scene.add_object(
        ObjectDesc::new("ball", Mesh::uv_sphere(Vec3::new(-1.2, 0.0, 0.0), 1.0, 32, false))
            .with_material(grey()),
    );

    let cube = unit_cube();
    let transform = Transform {
        translation: Vec3::new(1.3, -0.2, 0.5),
        rotation: Quat::from_rotation_y(0.6),
        scale: Vec3::splat(1.2),
    };
    scene.add_object(
        ObjectDesc::new("box", cube)
            .with_material(OrenNayar::new(Vec3::splat(ALBEDO), 0.8))
            .with_transform(transform),
    );
    scene
}

/// Axis-aligned cube of side 1 around the origin, faces pointing out.
fn unit_cube() -> Mesh {
    let faces = [
        (Vec3::new(-0.5, -0.5, 0.5), Vec3::X, Vec3::Y),
        (Vec3::new(0.5, -0.5, -0.5), Vec3::NEG_X, Vec3::Y),
        (Vec3::new(0.5, -0.5, 0.5), Vec3::NEG_Z, Vec3::Y),
        (Vec3::new(-0.5, -0.5, -0.5), Vec3::Z, Vec3::Y),
        (Vec3::new(-0.5, 0.5, 0.5), Vec3::X, Vec3::NEG_Z),
        (Vec3::new(-0.5, -0.5, -0.5), Vec3::X, Vec3::Z),
    ];
    let mut positions = Vec::new();
    let mut triangles = Vec::new();
    for (corner, u, v) in faces {
        let quad = Mesh::quad(corner, u, v);
        let base = positions.len() as u32;
        positions.extend_from_slice(&quad.positions);
        triangles.extend(quad.triangles.iter().map(|t| t.map(|i| i + base)));
    }
    // No vertex is shared between faces, so the derived normals stay flat.
    Mesh::new(positions, triangles, None)
}
