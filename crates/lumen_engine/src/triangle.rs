//! Ray-triangle intersection (Möller-Trumbore).

use lumen_math::{Interval, Ray, Vec3};

/// Intersect `ray` with triangle `(v0, v1, v2)`.
///
/// Returns `(t, barycentrics)` where the barycentrics weight `v0, v1, v2`.
/// A hit requires all weights non-negative and `t` strictly inside `ray_t`.
/// Zero-area triangles never report a hit.
#[inline]
pub fn intersect_triangle(ray: &Ray, [v0, v1, v2]: [Vec3; 3], ray_t: Interval) -> Option<(f32, Vec3)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Parallel to the plane, or degenerate.
    if a.abs() < 1e-12 {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if u < 0.0 || u > 1.0 {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if !ray_t.surrounds(t) {
        return None;
    }

    Some((t, Vec3::new(1.0 - u - v, u, v)))
}
