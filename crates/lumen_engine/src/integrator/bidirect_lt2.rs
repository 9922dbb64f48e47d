//! Bidirectional tracing with light paths of at most two vertices.
//!
//! Every camera vertex averages two estimates of the light reaching it:
//! plain light sampling, and a one-bounce light path joined to the vertex
//! by a shadow-tested segment.

use lumen_math::{Color, Ray, Vec3};
use rand::RngCore;

use super::direct::{emitted, estimate_direct, SHADOW_EPSILON_FAR, SHADOW_EPSILON_NEAR};
use super::pathlet::survive;
use super::{first_hit, Integrator, MAX_RECURSION_DEPTH};
use crate::intersection::Intersection;
use crate::light_sources::LightSources;
use crate::path_space::PathSpace;

const ROULETTE_DEPTH: u32 = 1;
const P_SURVIVE: f32 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct BidirectLt2Integrator;

impl BidirectLt2Integrator {
    pub fn new() -> Self {
        Self
    }

    /// Light-path join at `poi`; `None` when the light path escapes or the
    /// segment cannot carry light.
    fn join_light_path(
        rng: &mut dyn RngCore,
        outgoing: Vec3,
        poi: &Intersection<'_>,
        path_space: &dyn PathSpace,
        light_sources: &LightSources,
    ) -> Option<Color> {
        let (light, p_select) = light_sources.sample_light(rng);
        let emission = light.sample_emission(rng);
        let density = p_select * emission.surface.density * emission.direction_density;
        if density <= 0.0 {
            return None;
        }

        let light_ray = Ray::new(emission.surface.point, emission.direction);
        let bounce = path_space.intersect(&light_ray)?;
        let illum = light.projected_radiance(emission.direction, emission.surface.normal) / density;

        let arrival = -emission.direction;
        let join = poi.vertex - bounce.vertex;
        let distance = join.length();
        if distance <= SHADOW_EPSILON_FAR {
            return None;
        }
        let join = join / distance;

        let cos_arrival = bounce.normal.dot(arrival);
        let cos_wo = bounce.normal.dot(join);
        let cos_wi = poi.normal.dot(-join);
        if cos_arrival <= 0.0 || cos_wo <= 0.0 || cos_wi <= 0.0 {
            return None;
        }
        let join_ray = Ray::new(bounce.vertex, join);
        if path_space.has_intersect(&join_ray, SHADOW_EPSILON_NEAR, distance - SHADOW_EPSILON_FAR) {
            return None;
        }

        // `cos_arrival` only gates: the solid-angle density of the light
        // direction already carries the bounce's area measure.
        let at_bounce = illum * bounce.brdf(join, arrival);
        Some(at_bounce * poi.brdf(outgoing, -join) * (cos_wo * cos_wi / (distance * distance)))
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

        let mut rad = Color::ZERO;
        if !light_sources.is_empty() {
            let direct = estimate_direct(rng, outgoing, vert, path_space, light_sources, 1);
            rad += match Self::join_light_path(rng, outgoing, vert, path_space, light_sources) {
                Some(joined) => 0.5 * (direct + joined),
                None => direct,
            };
        }

        let sample = vert.material.sample(rng, vert.uv, vert.normal, outgoing);
        let cos = vert.normal.dot(sample.direction);
        if sample.density > 0.0 && cos > 0.0 {
            let ray = Ray::new(vert.vertex, sample.direction);
            if let Some(next) = path_space.intersect(&ray).filter(|next| next.faces(sample.direction)) {
                let incoming = self.sample_indirect(rng, -sample.direction, &next, path_space, light_sources, depth + 1);
                rad += incoming * vert.brdf(outgoing, sample.direction) * (cos / sample.density);
            }
        }

        rad / p_survive
    }
}

impl Integrator for BidirectLt2Integrator {
    fn name(&self) -> &'static str {
        "bidirect_lt2"
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
