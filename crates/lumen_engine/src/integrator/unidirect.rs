//! Unidirectional path tracing with next-event estimation.

use lumen_math::{Color, Ray, Vec3};
use rand::RngCore;

use super::direct::{emitted, estimate_direct};
use super::pathlet::survive;
use super::{first_hit, Integrator, MAX_RECURSION_DEPTH};
use crate::intersection::Intersection;
use crate::light_sources::LightSources;
use crate::path_space::PathSpace;

/// Depth from which paths are randomly terminated.
const ROULETTE_DEPTH: u32 = 2;
const P_SURVIVE: f32 = 0.5;

/// Direct lighting at every vertex plus BRDF-sampled indirect bounces,
/// terminated by Russian roulette.
#[derive(Debug, Clone)]
pub struct UnidirectIntegrator {
    pub multi_light_samples: u32,
    /// Indirect samples at the first vertex; deeper vertices take one.
    pub multi_indirect_samples: u32,
}

impl UnidirectIntegrator {
    pub fn new(multi_light_samples: u32, multi_indirect_samples: u32) -> Self {
        Self {
            multi_light_samples: multi_light_samples.max(1),
            multi_indirect_samples: multi_indirect_samples.max(1),
        }
    }

    fn sample_indirect(
        &self,
        rng: &mut dyn RngCore,
        outgoing: Vec3,
        vert: &Intersection<'_>,
        path_space: &dyn PathSpace,
        light_sources: &LightSources,
        depth: u32,
    ) -> Color {
        if depth >= MAX_RECURSION_DEPTH {
            return Color::ZERO;
        }
        let p_survive = if depth >= ROULETTE_DEPTH {
            match survive(rng, P_SURVIVE) {
                Some(p) => p,
                None => return Color::ZERO,
            }
        } else {
            1.0
        };
        let indirect_samples = if depth >= 1 { 1 } else { self.multi_indirect_samples };

        let direct = estimate_direct(rng, outgoing, vert, path_space, light_sources, self.multi_light_samples);

        let mut indirect = Color::ZERO;
        for _ in 0..indirect_samples {
            let sample = vert.material.sample(rng, vert.uv, vert.normal, outgoing);
            if sample.density <= 0.0 {
                continue;
            }
            let cos = vert.normal.dot(sample.direction);
            if cos <= 0.0 {
                continue;
            }
            let ray = Ray::new(vert.vertex, sample.direction);
            let Some(next) = path_space.intersect(&ray) else {
                continue;
            };
            if !next.faces(sample.direction) {
                continue;
            }

            let incoming = self.sample_indirect(rng, -sample.direction, &next, path_space, light_sources, depth + 1);
            indirect += incoming * vert.brdf(outgoing, sample.direction) * (cos / sample.density);
        }

        (direct + indirect / indirect_samples as f32) / p_survive
    }
}

impl Integrator for UnidirectIntegrator {
    fn name(&self) -> &'static str {
        "unidirect"
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
        self.sample_indirect(rng, outgoing, &hit, path_space, light_sources, 0) + emitted(&hit, outgoing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_space::BvhPathSpace;
    use crate::test_scenes;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_furnace_converges_to_closed_form() {
        let (albedo, radiance) = (0.7, 1.0);
        let scene = test_scenes::furnace(albedo, radiance);
        let mut ps = BvhPathSpace::new();
        test_scenes::load_all(&mut ps, &scene);
        let lights = test_scenes::lights_for(&ps, &scene);

        let integrator = UnidirectIntegrator::new(1, 1);
        let mut rng = StdRng::seed_from_u64(13);
        // Three channels of L / (1 - ρ).
        let expected = 3.0 * radiance / (1.0 - albedo);

        let directions = 10;
        let samples = 256;
        let mut total = 0.0;
        for _ in 0..directions {
            let dir = test_scenes::random_unit(&mut rng);
            let ray = Ray::new(Vec3::ZERO, dir);
            for _ in 0..samples {
                let rad = integrator.radiance(&mut rng, &ray, &ps, &lights);
                assert!(rad.min_element() > 0.0);
                total += rad.x + rad.y + rad.z;
            }
        }
        let mean = total / (directions * samples) as f32;
        assert!((mean - expected).abs() < 1.0, "furnace mean {mean}, expected {expected}");
    }

    #[test]
    fn test_empty_light_set_renders_black() {
        let scene = test_scenes::occluded_floor();
        let mut ps = BvhPathSpace::new();
        test_scenes::load_all(&mut ps, &scene);
        let lights = LightSources::new();

        let integrator = UnidirectIntegrator::new(1, 2);
        let mut rng = StdRng::seed_from_u64(2);
        let ray = Ray::new(Vec3::new(0.1, 1.0, 0.05), Vec3::NEG_Y);
        assert_eq!(integrator.radiance(&mut rng, &ray, &ps, &lights), Color::ZERO);
    }
}
