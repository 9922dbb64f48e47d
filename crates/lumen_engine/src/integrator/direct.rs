//! Next-event estimation and the direct-lighting integrator.

use lumen_core::Light;
use lumen_math::{Color, Ray, Vec3};
use rand::RngCore;

use super::{first_hit, Integrator};
use crate::intersection::Intersection;
use crate::light_sources::LightSources;
use crate::path_space::PathSpace;

/// Offsets applied to shadow rays at either end.
pub(crate) const SHADOW_EPSILON_NEAR: f32 = 1e-4;
pub(crate) const SHADOW_EPSILON_FAR: f32 = 1e-3;

/// Radiance reflected toward `outgoing` at `target` from a point on `light`.
///
/// Zero when the light faces away, the target faces away or the segment is
/// occluded.
pub(crate) fn transport_illum_source(
    light: &Light,
    light_point: Vec3,
    light_normal: Vec3,
    target: &Intersection<'_>,
    outgoing: Vec3,
    path_space: &dyn PathSpace,
) -> Color {
    let to_target = target.vertex - light_point;
    let illum = light.eval(to_target, light_normal, target.normal);
    if illum == Color::ZERO {
        return Color::ZERO;
    }

    let distance = to_target.length();
    let incoming = -to_target / distance;
    let shadow = Ray::new(target.vertex, incoming);
    if path_space.has_intersect(&shadow, SHADOW_EPSILON_NEAR, distance - SHADOW_EPSILON_FAR) {
        return Color::ZERO;
    }
    illum * target.brdf(outgoing, incoming)
}

/// Average of `samples` light-sampled estimates of direct illumination at
/// `target`, seen along `outgoing`.
pub(crate) fn estimate_direct(
    rng: &mut dyn RngCore,
    outgoing: Vec3,
    target: &Intersection<'_>,
    path_space: &dyn PathSpace,
    light_sources: &LightSources,
    samples: u32,
) -> Color {
    if light_sources.is_empty() || samples == 0 {
        return Color::ZERO;
    }

    let mut rad = Color::ZERO;
    for _ in 0..samples {
        let (light, p_select) = light_sources.sample_light(rng);
        let surface = light.sample_surface(rng);
        let density = surface.density * p_select;
        if density <= 0.0 {
            continue;
        }
        rad += transport_illum_source(light, surface.point, surface.normal, target, outgoing, path_space)
            / density;
    }
    rad / samples as f32
}

/// Emission of the hit surface itself toward the viewer.
#[inline]
pub(crate) fn emitted(hit: &Intersection<'_>, outgoing: Vec3) -> Color {
    hit.light
        .map_or(Color::ZERO, |light| light.radiance(outgoing, hit.normal))
}

/// Single-bounce lighting: light sampling at the first hit plus its own
/// emission.
#[derive(Debug, Clone)]
pub struct DirectIntegrator {
    pub multi_light_samples: u32,
}

impl DirectIntegrator {
    pub fn new(multi_light_samples: u32) -> Self {
        Self {
            multi_light_samples: multi_light_samples.max(1),
        }
    }
}

impl Integrator for DirectIntegrator {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn radiance(
        &self,
        rng: &mut dyn RngCore,
        ray: &Ray,
        path_space: &dyn PathSpace,
        light_sources: &LightSources,
    ) -> Color {
        let Some(hit) = first_hit(path_space, ray) else {
            return Color::ZERO;
        };
        let outgoing = -ray.direction;
        estimate_direct(rng, outgoing, &hit, path_space, light_sources, self.multi_light_samples)
            + emitted(&hit, outgoing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_space::{BvhPathSpace, PathSpace};
    use crate::test_scenes;
    use lumen_core::{Mesh, ObjectDesc, OrenNayar, Scene};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_occluded_point_gets_exactly_zero() {
        let scene = test_scenes::occluded_floor();
        let mut ps = BvhPathSpace::new();
        test_scenes::load_all(&mut ps, &scene);
        let lights = test_scenes::lights_for(&ps, &scene);

        // Straight down onto the floor centre, starting below the blocker.
        let ray = Ray::new(Vec3::new(0.1, 1.0, 0.05), Vec3::NEG_Y);
        let hit = ps.intersect(&ray).unwrap();
        assert!(hit.vertex.y.abs() < 1e-4);

        let shadow_dir = (Vec3::new(0.0, 4.0, 0.0) - hit.vertex).normalize();
        assert!(ps.has_intersect(&Ray::new(hit.vertex, shadow_dir), 1e-4, 3.9));

        let direct = DirectIntegrator::new(1);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..64 {
            assert_eq!(direct.radiance(&mut rng, &ray, &ps, &lights), Color::ZERO);
        }
    }

    #[test]
    fn test_unoccluded_point_is_lit() {
        let mut scene = test_scenes::occluded_floor();
        let blocker = test_scenes::object(&scene, "blocker").id;
        scene.remove(blocker);

        let mut ps = BvhPathSpace::new();
        test_scenes::load_all(&mut ps, &scene);
        let lights = test_scenes::lights_for(&ps, &scene);

        let ray = Ray::new(Vec3::new(0.1, 1.0, 0.05), Vec3::NEG_Y);
        let direct = DirectIntegrator::new(4);
        let mut rng = StdRng::seed_from_u64(3);
        let rad = direct.radiance(&mut rng, &ray, &ps, &lights);
        assert!(rad.x > 0.0 && rad.y > 0.0 && rad.z > 0.0);

        // Irradiance from a small lamp at height 4: E ≈ L·A/d² and Lambert
        // reflects ρ/π of it.
        let expected = 0.5 / std::f32::consts::PI * 10.0 * 0.25 / 16.0;
        assert!((rad.x - expected).abs() < 0.1 * expected, "{} vs {}", rad.x, expected);
    }

    #[test]
    fn test_visible_emitter_adds_its_radiance() {
        let mut scene = Scene::new();
        let lamp = Mesh::quad(Vec3::new(-1.0, 1.0, -1.0), Vec3::X * 2.0, Vec3::Z * 2.0);
        scene.add_object(
            ObjectDesc::new("lamp", lamp)
                .with_material(OrenNayar::new(Vec3::ZERO, 0.0))
                .with_emission(Vec3::new(1.0, 2.0, 3.0)),
        );
        let mut ps = BvhPathSpace::new();
        test_scenes::load_all(&mut ps, &scene);
        let lights = test_scenes::lights_for(&ps, &scene);

        let direct = DirectIntegrator::new(1);
        let mut rng = StdRng::seed_from_u64(1);
        let rad = direct.radiance(&mut rng, &Ray::new(Vec3::new(0.1, 0.0, 0.2), Vec3::Y), &ps, &lights);
        assert_eq!(rad, Vec3::new(1.0, 2.0, 3.0));
    }
}
