//! Sampled path vertices and prefix light transport over them.

use lumen_core::sampling::gen_f32;
use lumen_math::{Color, Ray, Vec3};
use rand::RngCore;

use crate::intersection::Intersection;
use crate::path_space::PathSpace;

/// One step of a sampled path.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pathlet<'a> {
    /// Unit direction the step travelled to reach `hit`.
    pub arrival: Vec3,
    pub hit: Intersection<'a>,
    /// Density of this step conditioned on every previous step.
    pub density: f32,
}

impl<'a> Pathlet<'a> {
    /// Direction from this vertex back to the previous one.
    #[inline]
    pub fn towards_prev(&self) -> Vec3 {
        -self.arrival
    }

    /// Direction from the previous vertex to this one.
    #[inline]
    pub fn towards(&self) -> Vec3 {
        self.arrival
    }
}

/// Trace `ray` and start a path at its first front-facing hit.
///
/// Leaves `path` empty when the ray misses, hits a back face, or
/// `max_len` is zero.
pub(crate) fn start_path<'a>(
    path: &mut Vec<Pathlet<'a>>,
    ray: &Ray,
    density: f32,
    path_space: &'a dyn PathSpace,
    max_len: usize,
) {
    path.clear();
    if max_len == 0 || density <= 0.0 {
        return;
    }
    if let Some(hit) = path_space.intersect(ray) {
        if hit.faces(ray.direction) {
            path.push(Pathlet {
                arrival: ray.direction,
                hit,
                density,
            });
        }
    }
}

/// Grow `path` by BRDF importance sampling until it reaches `max_len`,
/// escapes, hits a back face or draws a zero-density direction.
pub(crate) fn extend_path<'a>(
    rng: &mut dyn RngCore,
    path: &mut Vec<Pathlet<'a>>,
    path_space: &'a dyn PathSpace,
    max_len: usize,
) {
    while let Some(last) = path.last().copied() {
        if path.len() >= max_len {
            return;
        }
        let vert = last.hit;
        let sample = vert
            .material
            .sample(rng, vert.uv, vert.normal, last.towards_prev());
        if sample.density <= 0.0 {
            return;
        }
        let ray = Ray::new(vert.vertex, sample.direction);
        match path_space.intersect(&ray) {
            Some(next) if next.faces(sample.direction) => path.push(Pathlet {
                arrival: sample.direction,
                hit: next,
                density: sample.density,
            }),
            _ => return,
        }
    }
}

/// Which end of a subpath carries the known quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransportDirection {
    /// Radiance flows toward the first vertex (camera subpaths).
    Radiance,
    /// Importance flows away from the first vertex (light subpaths).
    Importance,
}

/// Throughput of every prefix of a path.
///
/// `transport(k)` is the product over the first `k` steps of
/// `brdf · cos / density`, so any prefix costs one lookup.
#[derive(Debug, Default)]
pub(crate) struct SubpathTransport {
    prefix: Vec<Color>,
}

impl SubpathTransport {
    pub fn rebuild(&mut self, path: &[Pathlet<'_>], direction: TransportDirection) {
        self.prefix.clear();
        if path.is_empty() {
            return;
        }
        let mut transport = Color::ONE;
        self.prefix.push(transport);
        for pair in path.windows(2) {
            let (here, next) = (&pair[0], &pair[1]);
            let brdf = match direction {
                TransportDirection::Radiance => here.hit.brdf(here.towards_prev(), next.towards()),
                TransportDirection::Importance => here.hit.brdf(next.towards(), here.towards_prev()),
            };
            let cos = here.hit.normal.dot(next.towards());
            transport *= brdf * (cos / next.density);
            self.prefix.push(transport);
        }
    }

    /// Throughput across the first `steps` bounces.
    #[inline]
    pub fn transport(&self, steps: usize) -> Color {
        self.prefix[steps]
    }
}

/// Russian roulette: `Some(p_survive)` when the path continues.
#[inline]
pub(crate) fn survive(rng: &mut dyn RngCore, p_survive: f32) -> Option<f32> {
    (gen_f32(rng) < p_survive).then_some(p_survive)
}
