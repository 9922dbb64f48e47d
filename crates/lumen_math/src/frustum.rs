//! View-frustum culling for preview queries.
//!
//! Extracts frustum planes from a view-projection matrix and tests
//! axis-aligned bounding boxes for visibility.

use crate::{Aabb, Mat4, Vec3, Vec4};

/// A view frustum defined by 6 planes (left, right, bottom, top, near, far).
///
/// Each plane is stored as a Vec4 where (x, y, z) is the normal and w is the distance.
/// A point P is on the positive side of the plane if: dot(normal, P) + w >= 0
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extract planes from a glam view-projection matrix (depth range 0..1).
    pub fn from_view_projection(vp: Mat4) -> Self {
        let row = |i: usize| vp.row(i);
        let mut planes = [
            row(3) + row(0),
            row(3) - row(0),
            row(3) + row(1),
            row(3) - row(1),
            row(2),
            row(3) - row(2),
        ];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > 0.0 {
                *plane /= length;
            }
        }

        Self { planes }
    }

    /// True if the AABB is at least partially inside the frustum.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        if aabb.is_empty() {
            return false;
        }
        let (min, max) = (aabb.min(), aabb.max());

        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            // Corner furthest along the plane normal.
            let p_vertex = Vec3::select(normal.cmpge(Vec3::ZERO), max, min);
            normal.dot(p_vertex) + plane.w >= 0.0
        })
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(point) + plane.w >= 0.0)
    }
}

impl Default for Frustum {
    /// Frustum accepting everything.
    fn default() -> Self {
        Self {
            planes: [
                Vec4::new(1.0, 0.0, 0.0, f32::MAX),
                Vec4::new(-1.0, 0.0, 0.0, f32::MAX),
                Vec4::new(0.0, 1.0, 0.0, f32::MAX),
                Vec4::new(0.0, -1.0, 0.0, f32::MAX),
                Vec4::new(0.0, 0.0, 1.0, f32::MAX),
                Vec4::new(0.0, 0.0, -1.0, f32::MAX),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_neg_z() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 100.0);
        Frustum::from_view_projection(proj * view)
    }

    #[test]
    fn test_frustum_default_accepts_all() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(Frustum::default().intersects_aabb(&aabb));
    }

    #[test]
    fn test_frustum_culls_boxes() {
        let frustum = looking_down_neg_z();

        let visible = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let behind = Aabb::from_points(Vec3::new(-1.0, -1.0, 20.0), Vec3::new(1.0, 1.0, 22.0));
        let left = Aabb::from_points(Vec3::new(-100.0, -1.0, -1.0), Vec3::new(-90.0, 1.0, 1.0));

        assert!(frustum.intersects_aabb(&visible));
        assert!(!frustum.intersects_aabb(&behind));
        assert!(!frustum.intersects_aabb(&left));
        assert!(!frustum.intersects_aabb(&Aabb::EMPTY));
    }

    #[test]
    fn test_frustum_contains_point() {
        let frustum = looking_down_neg_z();
        assert!(frustum.contains_point(Vec3::ZERO));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 20.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -200.0)));
    }
}
