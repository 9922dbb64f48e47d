//! Bidirectional path tracing over every camera/light prefix pairing.
//!
//! One camera path and one light path are sampled per ray. For each total
//! path length, the contributions of every pairing that produces that
//! length are summed and divided by the number of pairings counted.

use lumen_core::{EmissionSample, Light};
use lumen_math::{Color, Ray};
use rand::RngCore;

use super::direct::{emitted, transport_illum_source, SHADOW_EPSILON_FAR, SHADOW_EPSILON_NEAR};
use super::pathlet::{extend_path, start_path, Pathlet, SubpathTransport, TransportDirection};
use super::{sanitize, Integrator};
use crate::light_sources::LightSources;
use crate::path_space::PathSpace;

#[derive(Debug, Clone)]
pub struct BidirectMisIntegrator {
    /// Upper bound on vertices in either subpath.
    pub max_path_len: usize,
}

/// Per-call buffers, reused across the rays of one batch.
#[derive(Default)]
struct Scratch<'a> {
    cam: Vec<Pathlet<'a>>,
    light: Vec<Pathlet<'a>>,
    cam_transport: SubpathTransport,
    light_transport: SubpathTransport,
}

/// The sampled light end of the light subpath.
struct LightOrigin<'l> {
    light: &'l Light,
    emission: EmissionSample,
    /// Selection probability times area density of the light point.
    point_density: f32,
}

impl BidirectMisIntegrator {
    pub fn new(max_path_len: usize) -> Self {
        Self {
            max_path_len: max_path_len.max(1),
        }
    }

    fn estimate<'a>(
        &self,
        rng: &mut dyn RngCore,
        ray: &Ray,
        path_space: &'a dyn PathSpace,
        light_sources: &LightSources,
        scratch: &mut Scratch<'a>,
    ) -> Color {
        start_path(&mut scratch.cam, ray, 1.0, path_space, self.max_path_len);
        let Some(first) = scratch.cam.first().copied() else {
            return Color::ZERO;
        };
        if light_sources.is_empty() {
            return emitted(&first.hit, first.towards_prev());
        }

        let (light, p_select) = light_sources.sample_light(rng);
        let emission = light.sample_emission(rng);
        let origin = LightOrigin {
            light,
            emission,
            point_density: p_select * emission.surface.density,
        };
        let light_ray = Ray::new(emission.surface.point, emission.direction);

        extend_path(rng, &mut scratch.cam, path_space, self.max_path_len);
        start_path(&mut scratch.light, &light_ray, emission.direction_density, path_space, self.max_path_len);
        extend_path(rng, &mut scratch.light, path_space, self.max_path_len);

        scratch.cam_transport.rebuild(&scratch.cam, TransportDirection::Radiance);
        scratch.light_transport.rebuild(&scratch.light, TransportDirection::Importance);

        self.combine(&origin, scratch, path_space)
    }

    /// Sum the per-length averages over all prefix pairings.
    fn combine(&self, origin: &LightOrigin<'_>, s: &Scratch<'_>, path_space: &dyn PathSpace) -> Color {
        let cam_len = s.cam.len();
        let light_len = s.light.len();
        let mut rad = Color::ZERO;

        for plen in 1..=cam_len + light_len + 1 {
            let mut cam_plen = (plen - 1).min(cam_len);
            let mut light_plen = plen - 1 - cam_plen;
            let mut sum = Color::ZERO;
            let mut strategies = 0u32;

            while light_plen <= light_len {
                if cam_plen == 0 && light_plen == 0 {
                    let first = &s.cam[0];
                    sum += emitted(&first.hit, first.towards_prev());
                    strategies += 1;
                } else if light_plen == 0 {
                    sum += self.light_to_camera(origin, s, cam_plen, path_space);
                    strategies += 1;
                } else if cam_plen > 0 {
                    sum += self.join(origin, s, cam_plen, light_plen, path_space);
                    strategies += 1;
                }

                if cam_plen == 0 {
                    break;
                }
                cam_plen -= 1;
                light_plen += 1;
            }

            if strategies > 0 {
                rad += sum / strategies as f32;
            }
        }
        rad
    }

    /// The light point connected straight to camera vertex `cam_plen - 1`.
    fn light_to_camera(
        &self,
        origin: &LightOrigin<'_>,
        s: &Scratch<'_>,
        cam_plen: usize,
        path_space: &dyn PathSpace,
    ) -> Color {
        if origin.point_density <= 0.0 {
            return Color::ZERO;
        }
        let vert = &s.cam[cam_plen - 1];
        let surface = &origin.emission.surface;
        let illum = transport_illum_source(
            origin.light,
            surface.point,
            surface.normal,
            &vert.hit,
            vert.towards_prev(),
            path_space,
        ) / origin.point_density;
        illum * s.cam_transport.transport(cam_plen - 1) / s.cam[0].density
    }

    /// Light vertex `light_plen - 1` joined to camera vertex `cam_plen - 1`.
    fn join(
        &self,
        origin: &LightOrigin<'_>,
        s: &Scratch<'_>,
        cam_plen: usize,
        light_plen: usize,
        path_space: &dyn PathSpace,
    ) -> Color {
        if origin.point_density <= 0.0 {
            return Color::ZERO;
        }
        let cam_vert = &s.cam[cam_plen - 1];
        let light_vert = &s.light[light_plen - 1];

        let join = cam_vert.hit.vertex - light_vert.hit.vertex;
        let distance = join.length();
        if distance <= SHADOW_EPSILON_FAR {
            return Color::ZERO;
        }
        let join = join / distance;

        let cos_wo = light_vert.hit.normal.dot(join);
        let cos_wi = cam_vert.hit.normal.dot(-join);
        if cos_wo <= 0.0 || cos_wi <= 0.0 {
            return Color::ZERO;
        }
        let join_ray = Ray::new(light_vert.hit.vertex, join);
        if path_space.has_intersect(&join_ray, SHADOW_EPSILON_NEAR, distance - SHADOW_EPSILON_FAR) {
            return Color::ZERO;
        }

        let first = &s.light[0];
        let surface = &origin.emission.surface;
        let emission = origin.light.projected_radiance(first.towards(), surface.normal)
            / (first.density * origin.point_density);

        let light_side = emission
            * s.light_transport.transport(light_plen - 1)
            * light_vert.hit.brdf(join, light_vert.towards_prev());
        let cam_side = cam_vert.hit.brdf(cam_vert.towards_prev(), -join)
            * s.cam_transport.transport(cam_plen - 1)
            / s.cam[0].density;

        light_side * cam_side * (cos_wo * cos_wi / (distance * distance))
    }
}

impl Integrator for BidirectMisIntegrator {
    fn name(&self) -> &'static str {
        "bidirect_mis"
    }

    fn radiance(
        &self,
        rng: &mut dyn RngCore,
        ray: &Ray,
        path_space: &dyn PathSpace,
        light_sources: &LightSources,
    ) -> Color {
        let mut scratch = Scratch::default();
        self.estimate(rng, ray, path_space, light_sources, &mut scratch)
    }

    fn accumulate(
        &self,
        rng: &mut dyn RngCore,
        rays: &[Ray],
        path_space: &dyn PathSpace,
        light_sources: &LightSources,
        out: &mut [Color],
    ) {
        debug_assert_eq!(rays.len(), out.len());
        let mut scratch = Scratch::default();
        for (ray, acc) in rays.iter().zip(out.iter_mut()) {
            *acc += sanitize(self.estimate(rng, ray, path_space, light_sources, &mut scratch));
        }
    }
}
