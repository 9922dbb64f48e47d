//! Light emitters.
//!
//! `Light` is a closed set of emitter kinds. Each offers position sampling
//! (with an area density), direction sampling conditioned on that position,
//! evaluation of the radiance it delivers to a target point, and its total
//! power for importance-weighted selection.

use std::f32::consts::{FRAC_1_PI, PI};
use std::sync::Arc;

use lumen_math::{Aabb, Color, Mat4, Vec3};
use rand::RngCore;

use crate::mesh::{Mesh, SurfaceSample};
use crate::sampling::cosine_hemisphere;

/// A sampled emission ray: a point on the light plus a direction leaving it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionSample {
    pub surface: SurfaceSample,
    pub direction: Vec3,
    /// Solid-angle density of `direction` given the surface point.
    pub direction_density: f32,
}

#[derive(Debug, Clone)]
pub enum Light {
    Area(AreaLight),
    Sky(SkyLight),
}

impl Light {
    /// Draw a point on the emitter.
    pub fn sample_surface(&self, rng: &mut dyn RngCore) -> SurfaceSample {
        match self {
            Light::Area(light) => light.mesh.sample(rng),
            Light::Sky(sky) => sky.sample_surface(rng),
        }
    }

    /// Draw a direction leaving `surface`. Returns the direction and its
    /// solid-angle density.
    pub fn sample_direction(&self, rng: &mut dyn RngCore, surface: &SurfaceSample) -> (Vec3, f32) {
        match self {
            Light::Area(_) => cosine_hemisphere(rng, surface.normal),
            // The sky emits along the sampled inward normal only.
            Light::Sky(_) => (surface.normal, 1.0),
        }
    }

    pub fn sample_emission(&self, rng: &mut dyn RngCore) -> EmissionSample {
        let surface = self.sample_surface(rng);
        let (direction, direction_density) = self.sample_direction(rng, &surface);
        EmissionSample {
            surface,
            direction,
            direction_density,
        }
    }

    /// Radiance delivered to a receiver, including the geometric coupling.
    ///
    /// `to_target` runs from the point on the light to the receiver;
    /// `light_normal` and `target_normal` are the surface normals at either end.
    pub fn eval(&self, to_target: Vec3, light_normal: Vec3, target_normal: Vec3) -> Color {
        let dist2 = to_target.length_squared();
        if dist2 <= 0.0 {
            return Color::ZERO;
        }
        let dir = to_target / dist2.sqrt();
        let cos_o = light_normal.dot(dir);
        let cos_i = -target_normal.dot(dir);

        match self {
            Light::Area(light) => {
                if cos_o <= 0.0 || cos_i <= 0.0 {
                    return Color::ZERO;
                }
                light.radiance * (cos_i * cos_o / dist2)
            }
            Light::Sky(sky) => sky.radiance * (cos_o.max(0.0) * cos_i.max(0.0)),
        }
    }

    /// Radiance emitted toward `w` from a point with normal `n`.
    pub fn radiance(&self, w: Vec3, n: Vec3) -> Color {
        if n.dot(w) > 0.0 {
            self.emitted()
        } else {
            Color::ZERO
        }
    }

    /// Emitted radiance toward `w` weighted by the emission cosine.
    pub fn projected_radiance(&self, w: Vec3, n: Vec3) -> Color {
        let cos = n.dot(w);
        if cos > 0.0 {
            self.emitted() * cos
        } else {
            Color::ZERO
        }
    }

    fn emitted(&self) -> Color {
        match self {
            Light::Area(light) => light.radiance,
            Light::Sky(sky) => sky.radiance,
        }
    }

    /// Spectral power.
    pub fn power(&self) -> Color {
        match self {
            Light::Area(light) => light.radiance * (PI * light.mesh.surface_area()),
            Light::Sky(sky) => sky.radiance * (PI * sky.radius * sky.radius),
        }
    }

    /// Scalar power used for light selection (norm of the spectral power).
    pub fn total_power(&self) -> f32 {
        self.power().length()
    }

    /// World-space bound of the emitter, `None` for lights at infinity.
    pub fn bounds(&self) -> Option<Aabb> {
        match self {
            Light::Area(light) => Some(light.mesh.bounds()),
            Light::Sky(_) => None,
        }
    }

    /// Copy with the emitter geometry baked by `transform`.
    pub fn transformed(&self, transform: &Mat4) -> Light {
        match self {
            Light::Area(light) => Light::Area(AreaLight {
                mesh: Arc::new(light.mesh.transformed(transform)),
                radiance: light.radiance,
            }),
            Light::Sky(sky) => Light::Sky(SkyLight {
                up: transform.transform_vector3(sky.up).try_normalize().unwrap_or(sky.up),
                ..sky.clone()
            }),
        }
    }

    /// Inform lights at infinity about the extent of the scene.
    pub fn set_scene_boundary(&mut self, bound: &Aabb) {
        if let Light::Sky(sky) = self {
            if bound.is_empty() {
                log::warn!("Sky light given an empty scene boundary");
                return;
            }
            sky.center = bound.centroid();
            sky.radius = bound.enclosing_radius();
        }
    }
}

/// Uniform emitter over the surface of a mesh, emitting from the side its
/// normals face.
#[derive(Debug, Clone)]
pub struct AreaLight {
    pub mesh: Arc<Mesh>,
    pub radiance: Color,
}

impl AreaLight {
    pub fn new(mesh: Arc<Mesh>, radiance: Color) -> Self {
        Self { mesh, radiance }
    }
}

/// Constant radiance arriving from the hemisphere around `up`.
///
/// Positions are drawn on a virtual sphere of twice the scene's enclosing
/// radius, so the scene boundary must be set before sampling.
#[derive(Debug, Clone)]
pub struct SkyLight {
    pub radiance: Color,
    pub up: Vec3,
    center: Vec3,
    radius: f32,
}

impl SkyLight {
    pub fn new(radiance: Color) -> Self {
        Self {
            radiance,
            up: Vec3::Y,
            center: Vec3::ZERO,
            radius: 0.0,
        }
    }

    pub fn with_up(mut self, up: Vec3) -> Self {
        self.up = up.try_normalize().unwrap_or(Vec3::Y);
        self
    }

    /// The density is the solid-angle density of the sampled sky direction,
    /// which `Light::eval` pairs with an unattenuated geometry term.
    fn sample_surface(&self, rng: &mut dyn RngCore) -> SurfaceSample {
        let (u, _) = cosine_hemisphere(rng, self.up);
        SurfaceSample {
            point: self.center + u * (2.0 * self.radius),
            normal: -u,
            density: self.up.dot(u).max(0.0) * FRAC_1_PI,
        }
    }
}

impl From<AreaLight> for Light {
    fn from(light: AreaLight) -> Self {
        Light::Area(light)
    }
}

impl From<SkyLight> for Light {
    fn from(light: SkyLight) -> Self {
        Light::Sky(light)
    }
}
