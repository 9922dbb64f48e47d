//! Random-variate helpers shared by materials, lights and integrators.

use std::f32::consts::{FRAC_1_PI, PI};

use lumen_math::Vec3;
use rand::{Rng, RngCore};

/// Uniform variate in `[0, 1)`.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Orthonormal tangent frame `(t, b)` around unit vector `n`.
pub fn tangent_frame(n: Vec3) -> (Vec3, Vec3) {
    // Frisvad/Duff et al. branchless construction.
    let sign = 1.0_f32.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let t = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bt = Vec3::new(b, sign + n.y * n.y * a, -n.y);
    (t, bt)
}

/// Express a direction given in the local `(t, b, n)` frame in world space.
#[inline]
pub fn to_world(local: Vec3, n: Vec3) -> Vec3 {
    let (t, b) = tangent_frame(n);
    t * local.x + b * local.y + n * local.z
}

/// Cosine-weighted direction about `n`. Returns `(direction, density)` with the
/// density in solid angle (`cos / π`).
pub fn cosine_hemisphere(rng: &mut dyn RngCore, n: Vec3) -> (Vec3, f32) {
    let u1 = gen_f32(rng);
    let u2 = gen_f32(rng);
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    let z = (1.0 - u1).max(0.0).sqrt();
    let w = to_world(Vec3::new(r * phi.cos(), r * phi.sin(), z), n).normalize();
    (w, z * FRAC_1_PI)
}

/// Uniform barycentric coordinates over a triangle from two variates.
pub fn uniform_triangle(u1: f32, u2: f32) -> Vec3 {
    let r = u1.sqrt();
    let b0 = 1.0 - r;
    let b1 = r * u2;
    Vec3::new(b0, b1, 1.0 - b0 - b1)
}
