//! Visualizers that show geometry instead of light transport.

use lumen_math::{Color, Ray, Vec3};
use rand::RngCore;

use super::{first_hit, Integrator};
use crate::light_sources::LightSources;
use crate::path_space::PathSpace;

/// Hit position mapped into the scene bound, as RGB.
#[derive(Debug, Clone, Default)]
pub struct PositionIntegrator;

impl Integrator for PositionIntegrator {
    fn name(&self) -> &'static str {
        "position"
    }

    fn radiance(
        &self,
        _rng: &mut dyn RngCore,
        ray: &Ray,
        path_space: &dyn PathSpace,
        _light_sources: &LightSources,
    ) -> Color {
        let bound = path_space.bound();
        match first_hit(path_space, ray) {
            Some(hit) if !bound.is_empty() => {
                let range = bound.extent().max(Vec3::splat(f32::EPSILON));
                ((hit.vertex - bound.min()) / range).clamp(Vec3::ZERO, Vec3::ONE)
            }
            _ => Color::ZERO,
        }
    }
}

/// Hit normal remapped from `[-1, 1]` to `[0, 1]`.
#[derive(Debug, Clone, Default)]
pub struct NormalIntegrator;

impl Integrator for NormalIntegrator {
    fn name(&self) -> &'static str {
        "normal"
    }

    fn radiance(
        &self,
        _rng: &mut dyn RngCore,
        ray: &Ray,
        path_space: &dyn PathSpace,
        _light_sources: &LightSources,
    ) -> Color {
        first_hit(path_space, ray).map_or(Color::ZERO, |hit| (hit.normal + 1.0) * 0.5)
    }
}
