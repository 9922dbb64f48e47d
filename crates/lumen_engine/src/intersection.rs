//! Nearest-hit query results.

use lumen_core::{Light, Material};
use lumen_math::{Vec2, Vec3};

/// Surface record for a ray's nearest hit.
///
/// Borrowed from the path space that produced it; a fresh value per query.
/// A query that finds nothing yields `None` instead.
#[derive(Debug, Clone, Copy)]
pub struct Intersection<'a> {
    /// Ray parameter of the hit.
    pub t: f32,
    /// World-space hit position.
    pub vertex: Vec3,
    /// Interpolated unit shading normal.
    pub normal: Vec3,
    pub uv: Vec2,
    /// Bound material, or the fail-safe material for bare geometry.
    pub material: &'a Material,
    /// Emitter attached to the hit geometry.
    pub light: Option<&'a Light>,
}

impl<'a> Intersection<'a> {
    /// BRDF at this vertex; both directions point away from the surface.
    pub fn brdf(&self, outgoing: Vec3, incoming: Vec3) -> lumen_math::Color {
        self.material.eval(self.uv, self.normal, outgoing, incoming)
    }

    /// True when the surface faces a viewer looking along `direction`.
    pub fn faces(&self, direction: Vec3) -> bool {
        self.normal.dot(-direction) > 0.0
    }
}
