//! Light-transport estimators.
//!
//! Every integrator turns a batch of camera rays into one radiance estimate
//! per ray. Integrators hold no scene state; the only mutable input is the
//! caller's random stream, so each tile owns one instance plus its own RNG.

mod bidirect_lt2;
mod bidirect_mis;
mod debug;
mod direct;
mod pathlet;
mod unidirect;

use std::fmt;
use std::str::FromStr;

use lumen_math::{Color, Ray};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::intersection::Intersection;
use crate::light_sources::LightSources;
use crate::path_space::PathSpace;

pub use bidirect_lt2::BidirectLt2Integrator;
pub use bidirect_mis::BidirectMisIntegrator;
pub use debug::{NormalIntegrator, PositionIntegrator};
pub use direct::DirectIntegrator;
pub use unidirect::UnidirectIntegrator;

/// Hard stop for recursive estimators; roulette ends paths long before.
pub(crate) const MAX_RECURSION_DEPTH: u32 = 64;

pub trait Integrator: Send + Sync {
    fn name(&self) -> &'static str;

    /// One radiance estimate along `ray`.
    fn radiance(
        &self,
        rng: &mut dyn RngCore,
        ray: &Ray,
        path_space: &dyn PathSpace,
        light_sources: &LightSources,
    ) -> Color;

    /// Add one estimate per ray into `out`.
    fn accumulate(
        &self,
        rng: &mut dyn RngCore,
        rays: &[Ray],
        path_space: &dyn PathSpace,
        light_sources: &LightSources,
        out: &mut [Color],
    ) {
        debug_assert_eq!(rays.len(), out.len());
        for (ray, acc) in rays.iter().zip(out.iter_mut()) {
            *acc += sanitize(self.radiance(rng, ray, path_space, light_sources));
        }
    }

    /// One estimate per ray.
    fn sample(
        &self,
        rng: &mut dyn RngCore,
        rays: &[Ray],
        path_space: &dyn PathSpace,
        light_sources: &LightSources,
    ) -> Vec<Color> {
        let mut out = vec![Color::ZERO; rays.len()];
        self.accumulate(rng, rays, path_space, light_sources, &mut out);
        out
    }
}

/// Nearest hit along a camera ray; back faces count as misses.
pub(crate) fn first_hit<'a>(path_space: &'a dyn PathSpace, ray: &Ray) -> Option<Intersection<'a>> {
    path_space.intersect(ray).filter(|hit| hit.faces(ray.direction))
}

/// Replace NaN, infinite and negative channels with zero.
pub(crate) fn sanitize(c: Color) -> Color {
    let fix = |v: f32| if v.is_finite() && v > 0.0 { v } else { 0.0 };
    Color::new(fix(c.x), fix(c.y), fix(c.z))
}

/// Knobs shared by the integrator constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegratorOptions {
    pub max_path_len: usize,
    pub multi_light_samples: u32,
    pub multi_indirect_samples: u32,
}

impl Default for IntegratorOptions {
    fn default() -> Self {
        Self {
            max_path_len: 4,
            multi_light_samples: 1,
            multi_indirect_samples: 1,
        }
    }
}

/// Selectable integrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    Position,
    Normal,
    Direct,
    #[default]
    Unidirect,
    BidirectLt2,
    BidirectMis,
}

impl IntegratorKind {
    pub const ALL: [IntegratorKind; 6] = [
        IntegratorKind::Position,
        IntegratorKind::Normal,
        IntegratorKind::Direct,
        IntegratorKind::Unidirect,
        IntegratorKind::BidirectLt2,
        IntegratorKind::BidirectMis,
    ];

    pub fn create(self, options: &IntegratorOptions) -> Box<dyn Integrator> {
        match self {
            IntegratorKind::Position => Box::new(PositionIntegrator),
            IntegratorKind::Normal => Box::new(NormalIntegrator),
            IntegratorKind::Direct => Box::new(DirectIntegrator::new(options.multi_light_samples)),
            IntegratorKind::Unidirect => Box::new(UnidirectIntegrator::new(
                options.multi_light_samples,
                options.multi_indirect_samples,
            )),
            IntegratorKind::BidirectLt2 => Box::new(BidirectLt2Integrator::new()),
            IntegratorKind::BidirectMis => Box::new(BidirectMisIntegrator::new(options.max_path_len)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntegratorKind::Position => "position",
            IntegratorKind::Normal => "normal",
            IntegratorKind::Direct => "direct",
            IntegratorKind::Unidirect => "unidirect",
            IntegratorKind::BidirectLt2 => "bidirect_lt2",
            IntegratorKind::BidirectMis => "bidirect_mis",
        }
    }

    /// Whether repeated samples of the same ray always agree.
    pub fn is_deterministic(self) -> bool {
        matches!(self, IntegratorKind::Position | IntegratorKind::Normal)
    }
}

impl FromStr for IntegratorKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntegratorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EngineError::not_implemented(format!("integrator '{s}'")))
    }
}

impl fmt::Display for IntegratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_space::{BvhPathSpace, PathSpaceLayout};
    use crate::test_scenes;
    use lumen_core::{CookTorrance, Mixture, ObjectDesc, OrenNayar, SkyLight};
    use lumen_math::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in IntegratorKind::ALL {
            assert_eq!(kind.as_str().parse::<IntegratorKind>().unwrap(), kind);
            assert_eq!(kind.create(&IntegratorOptions::default()).name(), kind.as_str());
        }
        let err = "metropolis".parse::<IntegratorKind>().unwrap_err();
        assert!(matches!(err, EngineError::NotImplemented { .. }));
    }

    #[test]
    fn test_sanitize_clamps_bad_channels() {
        let c = sanitize(Color::new(f32::NAN, -1.0, 2.0));
        assert_eq!(c, Color::new(0.0, 0.0, 2.0));
        assert_eq!(sanitize(Color::splat(f32::INFINITY)), Color::ZERO);
    }

    #[test]
    fn test_every_integrator_is_finite_and_non_negative() {
        let mut scene = test_scenes::occluded_floor();
        let glossy = CookTorrance::new(Vec3::new(0.9, 0.6, 0.3), 0.3, 1.5, 2.0);
        let mixed = Mixture::new(OrenNayar::new(Vec3::splat(0.4), 0.5).into(), glossy.clone().into(), 0.5);
        let wall = lumen_core::Mesh::quad(Vec3::new(-2.0, 0.0, -1.5), Vec3::X * 4.0, Vec3::Y * 3.0);
        scene.add_object(ObjectDesc::new("wall", wall).with_material(mixed));
        let ball = lumen_core::Mesh::uv_sphere(Vec3::new(0.8, 0.5, 0.5), 0.4, 12, false);
        scene.add_object(ObjectDesc::new("ball", ball).with_material(glossy));
        scene.add_light("sky", SkyLight::new(Vec3::new(0.2, 0.3, 0.5)));

        for layout in [PathSpaceLayout::Linear, PathSpaceLayout::Bvh] {
            let mut ps = layout.create();
            test_scenes::load_all(ps.as_mut(), &scene);
            let lights = test_scenes::lights_for(ps.as_ref(), &scene);

            let mut rng = StdRng::seed_from_u64(17);
            let rays: Vec<Ray> = (0..64)
                .map(|_| {
                    let origin = Vec3::new(0.0, 1.5, 3.0);
                    let target = Vec3::new(0.0, 0.5, 0.0) + test_scenes::random_unit(&mut rng);
                    Ray::new(origin, (target - origin).normalize())
                })
                .collect();

            // Raw estimates, bypassing the clamp in `accumulate`.
            for kind in IntegratorKind::ALL {
                let integrator = kind.create(&IntegratorOptions::default());
                for _ in 0..8 {
                    for (i, ray) in rays.iter().enumerate() {
                        let rad = integrator.radiance(&mut rng, ray, ps.as_ref(), &lights);
                        assert!(rad.is_finite(), "{kind} ray {i}: {rad}");
                        assert!(rad.min_element() >= 0.0, "{kind} ray {i}: {rad}");
                    }
                }
                assert_eq!(integrator.sample(&mut rng, &rays, ps.as_ref(), &lights).len(), rays.len());
            }
        }
    }

    #[test]
    fn test_back_facing_first_hit_is_a_miss() {
        let scene = test_scenes::occluded_floor();
        let mut ps = BvhPathSpace::new();
        test_scenes::load_all(&mut ps, &scene);
        let lights = test_scenes::lights_for(&ps, &scene);

        // From below the floor looking up at its back face.
        let ray = Ray::new(Vec3::new(0.1, -1.0, 0.05), Vec3::Y);
        let mut rng = StdRng::seed_from_u64(0);
        for kind in IntegratorKind::ALL {
            let integrator = kind.create(&IntegratorOptions::default());
            assert_eq!(integrator.radiance(&mut rng, &ray, &ps, &lights), Color::ZERO, "{kind}");
        }
    }
}
