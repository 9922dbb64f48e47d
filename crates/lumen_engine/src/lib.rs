//! Lumen Engine - Monte Carlo light transport.
//!
//! This crate provides:
//!
//! - **Path spaces**: `LinearPathSpace` and the SAH-built `BvhPathSpace`
//! - **Light sources**: power-weighted emitter selection
//! - **Integrators**: position/normal visualizers, direct, unidirectional,
//!   and two bidirectional estimators
//! - **Renderer**: `RenderEngine`, a tile-parallel progressive accumulator
//!
//! # Example
//!
//! ```ignore
//! use lumen_engine::{load_scene, PinholeCamera, RadianceBuffer, RenderConfig, RenderEngine};
//!
//! let config = RenderConfig::default();
//! let (path_space, lights) = load_scene(&scene, config.layout);
//! let mut engine = RenderEngine::new(&config)?;
//! let mut image = RadianceBuffer::new(640, 480);
//! engine.render(path_space.as_ref(), &lights, &camera, 16, &mut image);
//! ```

pub mod camera;
pub mod compositor;
pub mod config;
pub mod error;
pub mod integrator;
pub mod intersection;
pub mod light_sources;
pub mod path_space;
pub mod renderer;
pub mod tile;
mod triangle;

#[cfg(test)]
mod test_scenes;

pub use camera::{Camera, PinholeCamera};
pub use compositor::{Compositor, RadianceBuffer};
pub use config::RenderConfig;
pub use error::{EngineError, EngineResult};
pub use integrator::{Integrator, IntegratorKind, IntegratorOptions};
pub use intersection::Intersection;
pub use light_sources::LightSources;
pub use path_space::{BvhPathSpace, BvhStats, LinearPathSpace, PathSpace, PathSpaceLayout};
pub use renderer::{RenderEngine, RenderStats};

use lumen_core::Scene;

/// Load every object and light of `scene` into a fresh path space of
/// `layout` and a light set, bound lights at infinity by the geometry, and
/// commit both.
pub fn load_scene(scene: &Scene, layout: PathSpaceLayout) -> (Box<dyn PathSpace>, LightSources) {
    let mut path_space = layout.create();
    let mut lights = LightSources::new();

    for object in &scene.objects {
        let transform = object.transform.to_matrix();
        path_space.load(object, &transform);
        lights.load_object(object, &transform);
    }
    for light in &scene.lights {
        lights.load(light.id, &light.light, &lumen_math::Mat4::IDENTITY);
    }

    path_space.commit();
    lights.set_scene_boundary(&path_space.bound());
    lights.commit();

    log::info!(
        "Loaded scene: {} objects, {} triangles, {} lights ({} layout)",
        scene.object_count(),
        path_space.primitive_count(),
        lights.len(),
        layout
    );
    (path_space, lights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::{Ray, Vec3};

    #[test]
    fn test_load_scene_commits_both_sets() {
        let scene = test_scenes::occluded_floor();
        for layout in [PathSpaceLayout::Linear, PathSpaceLayout::Bvh] {
            let (ps, lights) = load_scene(&scene, layout);
            assert_eq!(ps.primitive_count(), 5);
            assert_eq!(lights.len(), 1);
            assert!(lights.total_power() > 0.0);
            assert!(ps.intersect(&Ray::new(Vec3::new(0.1, 1.0, 0.05), Vec3::NEG_Y)).is_some());
        }
    }
}
