//! Math value types shared by the lumen crates.
//!
//! Re-exports glam so downstream crates agree on one vector type.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod frustum;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use frustum::Frustum;
pub use interval::Interval;
pub use ray::{Ray, T_MAX, T_MIN};
pub use transform::Mat4Ext;

/// Linear RGB radiance / reflectance triple.
pub type Color = Vec3;
