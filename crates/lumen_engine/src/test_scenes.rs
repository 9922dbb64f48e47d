//! Shared fixtures for engine tests.

use lumen_core::{Mesh, ObjectDesc, OrenNayar, Scene, SceneObject};
use lumen_math::{Ray, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::light_sources::LightSources;
use crate::path_space::PathSpace;

/// `n` random triangles inside `[-5, 5]³`, split into objects of 50.
pub fn triangle_soup(n: usize, seed: u64) -> Scene {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = Scene::new();
    let mut positions = Vec::new();
    let mut triangles = Vec::new();

    let flush = |positions: &mut Vec<Vec3>, triangles: &mut Vec<[u32; 3]>, scene: &mut Scene| {
        if triangles.is_empty() {
            return;
        }
        let mesh = Mesh::new(std::mem::take(positions), std::mem::take(triangles), None);
        let name = format!("soup_{}", scene.object_count());
        scene.add_object(ObjectDesc::new(name, mesh));
    };

    for i in 0..n {
        let center = Vec3::new(
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
        );
        let base = positions.len() as u32;
        for _ in 0..3 {
            let offset = Vec3::new(
                rng.gen_range(-0.8..0.8),
                rng.gen_range(-0.8..0.8),
                rng.gen_range(-0.8..0.8),
            );
            positions.push(center + offset);
        }
        triangles.push([base, base + 1, base + 2]);

        if (i + 1) % 50 == 0 {
            flush(&mut positions, &mut triangles, &mut scene);
        }
    }
    flush(&mut positions, &mut triangles, &mut scene);
    scene
}

/// Load every object with its own transform and commit.
pub fn load_all<P: PathSpace + ?Sized>(path_space: &mut P, scene: &Scene) {
    for object in &scene.objects {
        path_space.load(object, &object.transform.to_matrix());
    }
    path_space.commit();
}

/// Light sources for every emitter in `scene`, bounded by `path_space`.
pub fn lights_for<P: PathSpace + ?Sized>(path_space: &P, scene: &Scene) -> LightSources {
    let mut lights = LightSources::new();
    for object in &scene.objects {
        lights.load_object(object, &object.transform.to_matrix());
    }
    for light in &scene.lights {
        lights.load(light.id, &light.light, &lumen_math::Mat4::IDENTITY);
    }
    lights.set_scene_boundary(&path_space.bound());
    lights.commit();
    lights
}

/// A ray starting on a sphere of `radius` and aimed into the middle of the scene.
pub fn random_ray(rng: &mut StdRng, radius: f32) -> Ray {
    let origin = random_unit(rng) * radius;
    let target = Vec3::new(
        rng.gen_range(-3.0..3.0),
        rng.gen_range(-3.0..3.0),
        rng.gen_range(-3.0..3.0),
    );
    Ray::new(origin, (target - origin).normalize())
}

/// Uniform direction on the unit sphere.
pub fn random_unit(rng: &mut StdRng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let len2 = v.length_squared();
        if len2 > 1e-4 && len2 <= 1.0 {
            return v / len2.sqrt();
        }
    }
}

/// Inward-facing diffuse sphere of albedo `albedo` that also emits `radiance`
/// over its whole surface.
pub fn furnace(albedo: f32, radiance: f32) -> Scene {
    let mut scene = Scene::new();
    let sphere = Mesh::uv_sphere(Vec3::ZERO, 10.0, 30, true);
    scene.add_object(
        ObjectDesc::new("furnace", sphere)
            .with_material(OrenNayar::new(Vec3::splat(albedo), 0.0))
            .with_emission(Vec3::splat(radiance)),
    );
    scene
}

/// A unit floor at y = 0 facing up, a small emitter at y = 4 facing down and
/// a triangle at y = 2 that blocks the floor's centre from the light.
pub fn occluded_floor() -> Scene {
    let mut scene = Scene::new();
    let floor = Mesh::quad(Vec3::new(-1.0, 0.0, 1.0), Vec3::X * 2.0, Vec3::NEG_Z * 2.0);
    scene.add_object(ObjectDesc::new("floor", floor).with_material(OrenNayar::new(Vec3::splat(0.5), 0.0)));

    let lamp = Mesh::quad(Vec3::new(-0.25, 4.0, -0.25), Vec3::X * 0.5, Vec3::Z * 0.5);
    scene.add_object(ObjectDesc::new("lamp", lamp).with_emission(Vec3::splat(10.0)));

    let blocker = Mesh::triangle(
        Vec3::new(-3.0, 2.0, -3.0),
        Vec3::new(3.0, 2.0, -3.0),
        Vec3::new(0.0, 2.0, 4.0),
    );
    scene.add_object(ObjectDesc::new("blocker", blocker));
    scene
}

/// Object called `name`.
pub fn object<'a>(scene: &'a Scene, name: &str) -> &'a SceneObject {
    scene
        .objects
        .iter()
        .find(|o| o.name == name)
        .unwrap_or_else(|| panic!("no object named {name}"))
}
