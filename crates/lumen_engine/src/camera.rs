//! Primary-ray generation.

use lumen_math::{Mat4, Ray, Vec3};
use rand::RngCore;

/// Source of primary rays for the renderer.
pub trait Camera: Send + Sync {
    /// Ray through pixel `(x, y)` of a `width × height` image, with the
    /// density it was drawn with.
    fn sample(&self, rng: &mut dyn RngCore, x: u32, y: u32, width: u32, height: u32) -> (Ray, f32);

    /// View-projection matrix. The renderer regenerates its cached rays
    /// whenever this changes.
    fn projection(&self) -> Mat4;
}

const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 1000.0;

/// Pinhole camera shooting one ray through each pixel center.
#[derive(Debug, Clone, PartialEq)]
pub struct PinholeCamera {
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,
    /// Vertical field of view in degrees
    vfov: f32,
    aspect: f32,
}

impl PinholeCamera {
    pub fn new() -> Self {
        Self {
            look_from: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            vup: Vec3::Y,
            vfov: 90.0,
            aspect: 1.0,
        }
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set vertical field of view (degrees) and width/height aspect ratio.
    pub fn with_lens(mut self, vfov: f32, aspect: f32) -> Self {
        self.vfov = vfov;
        self.aspect = aspect;
        self
    }

    pub fn look_from(&self) -> Vec3 {
        self.look_from
    }

    /// Orthonormal camera basis `(u, v, w)`; `w` points backwards.
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let w = (self.look_from - self.look_at).normalize_or_zero();
        let u = self.vup.cross(w).normalize_or_zero();
        let v = w.cross(u);
        (u, v, w)
    }
}

impl Default for PinholeCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for PinholeCamera {
    fn sample(&self, _rng: &mut dyn RngCore, x: u32, y: u32, width: u32, height: u32) -> (Ray, f32) {
        let (u, v, w) = self.basis();
        let h = (self.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * self.aspect;

        // Pixel centers in [-0.5, 0.5], y running downwards.
        let sx = (x as f32 + 0.5) / width.max(1) as f32 - 0.5;
        let sy = (y as f32 + 0.5) / height.max(1) as f32 - 0.5;
        let direction = -w + u * (sx * viewport_width) - v * (sy * viewport_height);

        (Ray::new(self.look_from, direction.normalize()), 1.0)
    }

    fn projection(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.look_from, self.look_at, self.vup);
        let proj = Mat4::perspective_rh(self.vfov.to_radians(), self.aspect, NEAR_PLANE, FAR_PLANE);
        proj * view
    }
}
