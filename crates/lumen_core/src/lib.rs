//! Lumen Core - scene value types consumed by the light-transport engine.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` with a cumulative-area table for area sampling
//! - **Materials**: `Material` (fail-safe, Oren-Nayar, Cook-Torrance, mixture)
//! - **Lights**: `Light` (area, sky)
//! - **Scene**: `Scene`, `SceneObject` and their `ObjectId`s
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::{Mesh, ObjectDesc, OrenNayar, Scene, Vec3};
//!
//! let mut scene = Scene::new();
//! let floor = Mesh::quad(Vec3::ZERO, Vec3::X, Vec3::Z);
//! scene.add_object(ObjectDesc::new("floor", floor).with_material(OrenNayar::new(Vec3::splat(0.5), 0.2)));
//! ```

pub mod light;
pub mod material;
pub mod mesh;
pub mod sampling;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use light::{AreaLight, EmissionSample, Light, SkyLight};
pub use lumen_math::{Color, Vec2, Vec3};
pub use material::{CookTorrance, FailSafe, Material, MaterialSample, Mixture, OrenNayar, FAIL_SAFE};
pub use mesh::{Mesh, SurfaceSample};
pub use scene::{ObjectDesc, ObjectId, Scene, SceneLight, SceneObject, Transform};
pub use texture::{Texture, TextureError, TextureResult};
