//! Transform utilities for `Mat4`.
//!
//! glam already provides `transform_point3` and `transform_vector3`; this
//! adds the pieces needed when baking object transforms into geometry.

use crate::{Aabb, Mat4, Vec3};

/// Extension trait for Mat4 with geometry-baking helpers.
pub trait Mat4Ext {
    /// Transform a surface normal by the inverse transpose and renormalize.
    fn transform_normal(&self, normal: Vec3) -> Vec3;

    /// Bound of the 8 transformed corners of `aabb`.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn transform_normal(&self, normal: Vec3) -> Vec3 {
        self.inverse()
            .transpose()
            .transform_vector3(normal)
            .normalize_or_zero()
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }
        let (lo, hi) = (aabb.min(), aabb.max());
        (0..8).fold(Aabb::EMPTY, |acc, corner| {
            let p = Vec3::new(
                if corner & 1 == 0 { lo.x } else { hi.x },
                if corner & 2 == 0 { lo.y } else { hi.y },
                if corner & 4 == 0 { lo.z } else { hi.z },
            );
            acc.include_point(self.transform_point3(p))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_normal_nonuniform_scale() {
        // A plane tilted 45 degrees, squashed along X.
        let mat = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = Vec3::new(1.0, 1.0, 0.0).normalize();
        let tangent = Vec3::new(1.0, -1.0, 0.0);

        let tn = mat.transform_normal(n);
        let tt = mat.transform_vector3(tangent);

        assert!((tn.length() - 1.0).abs() < 0.001);
        assert!(tn.dot(tt).abs() < 0.001);
    }

    #[test]
    fn test_transform_aabb_rotation() {
        use std::f32::consts::FRAC_PI_4;

        let mat = Mat4::from_rotation_z(FRAC_PI_4);
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let rotated = mat.transform_aabb(&aabb);

        let half_diag = 2.0_f32.sqrt();
        assert!((rotated.x.max - half_diag).abs() < 0.001);
        assert!((rotated.y.min + half_diag).abs() < 0.001);
        assert!((rotated.z.max - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_transform_aabb_translation() {
        let mat = Mat4::from_translation(Vec3::new(5.0, 5.0, 5.0));
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let moved = mat.transform_aabb(&aabb);

        assert!((moved.min() - Vec3::splat(5.0)).length() < 0.001);
        assert!((moved.max() - Vec3::splat(6.0)).length() < 0.001);
    }
}
