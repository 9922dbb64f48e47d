//! Path space: the engine's world-space copy of the scene geometry.
//!
//! A path space owns transformed copies of (geometry, material, light)
//! bindings and answers nearest-hit and any-hit ray queries. Two layouts
//! share the binding storage below: a brute-force [`LinearPathSpace`] and an
//! SAH-built [`BvhPathSpace`].
//!
//! Protocol: any sequence of `load`/`unload` must be followed by `commit()`
//! before queries observe it.

mod bvh;
mod linear;

pub use bvh::{BvhPathSpace, BvhStats, FlatNode, FlatNodeKind};
pub use linear::LinearPathSpace;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use lumen_core::{Light, Material, Mesh, ObjectId, SceneObject, FAIL_SAFE};
use lumen_math::{Aabb, Frustum, Interval, Mat4, Ray, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::intersection::Intersection;
use crate::triangle::intersect_triangle;

/// Spatial query interface implemented by every layout.
pub trait PathSpace: Send + Sync {
    /// Store a copy of `object` baked by `transform` and grow the scene bound.
    fn load(&mut self, object: &SceneObject, transform: &Mat4);

    /// Remove a binding. Returns false when `id` was not loaded.
    fn unload(&mut self, id: ObjectId) -> bool;

    /// Rebuild derived structures so queries see the loaded bindings.
    fn commit(&mut self);

    /// Nearest hit with `t` in `(T_MIN, T_MAX)`.
    fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>>;

    /// Any hit with `t` in `(t_min, t_max)`.
    fn has_intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> bool;

    /// Bound of all loaded geometry.
    fn bound(&self) -> Aabb;

    /// Committed bindings whose world bound overlaps `frustum`.
    fn relevant_geometries(&self, frustum: &Frustum) -> Vec<&Binding>;

    /// Number of committed triangles.
    fn primitive_count(&self) -> usize;
}

/// Available path-space layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSpaceLayout {
    Linear,
    #[default]
    Bvh,
}

impl PathSpaceLayout {
    pub fn create(self) -> Box<dyn PathSpace> {
        match self {
            PathSpaceLayout::Linear => Box::new(LinearPathSpace::new()),
            PathSpaceLayout::Bvh => Box::new(BvhPathSpace::new()),
        }
    }
}

impl FromStr for PathSpaceLayout {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(PathSpaceLayout::Linear),
            "bvh" => Ok(PathSpaceLayout::Bvh),
            other => Err(EngineError::not_implemented(format!("path space layout '{other}'"))),
        }
    }
}

impl fmt::Display for PathSpaceLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSpaceLayout::Linear => f.write_str("linear"),
            PathSpaceLayout::Bvh => f.write_str("bvh"),
        }
    }
}

/// A scene object baked into world space.
#[derive(Debug)]
pub struct Binding {
    pub id: ObjectId,
    pub name: String,
    pub mesh: Arc<Mesh>,
    pub material: Option<Arc<Material>>,
    pub light: Option<Light>,
}

impl Binding {
    fn bake(object: &SceneObject, transform: &Mat4) -> Self {
        let mesh = Arc::new(object.mesh.transformed(transform));
        let light = object.light.as_deref().map(|light| match light {
            // An emitter over the object's own surface keeps sharing it.
            Light::Area(area) if Arc::ptr_eq(&area.mesh, &object.mesh) => {
                Light::Area(lumen_core::AreaLight::new(Arc::clone(&mesh), area.radiance))
            }
            other => other.transformed(transform),
        });
        Self {
            id: object.id,
            name: object.name.clone(),
            mesh,
            material: object.material.clone(),
            light,
        }
    }

    /// Bound material, or the fail-safe one.
    pub fn material(&self) -> &Material {
        self.material.as_deref().unwrap_or(&FAIL_SAFE)
    }
}

/// Binding table shared by both layouts.
#[derive(Debug, Default)]
pub(crate) struct BindingStore {
    bindings: BTreeMap<ObjectId, Arc<Binding>>,
    bound: Aabb,
    dirty: bool,
}

impl BindingStore {
    pub(crate) fn load(&mut self, object: &SceneObject, transform: &Mat4) {
        let binding = Binding::bake(object, transform);
        self.bound = Aabb::surrounding(&self.bound, &binding.mesh.bounds());
        log::debug!(
            "Loaded '{}' {} ({} triangles)",
            binding.name,
            binding.id,
            binding.mesh.triangle_count()
        );
        if self.bindings.insert(object.id, Arc::new(binding)).is_some() {
            log::warn!("Object {} was already loaded, replaced", object.id);
        }
        self.dirty = true;
    }

    pub(crate) fn unload(&mut self, id: ObjectId) -> bool {
        let removed = self.bindings.remove(&id).is_some();
        self.dirty |= removed;
        removed
    }

    /// Snapshot the current bindings and flatten their triangles.
    pub(crate) fn commit(&mut self) -> CommittedScene {
        self.bound = self
            .bindings
            .values()
            .fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, &b.mesh.bounds()));
        self.dirty = false;

        let bindings: Vec<Arc<Binding>> = self.bindings.values().cloned().collect();
        let primitives = bindings
            .iter()
            .enumerate()
            .flat_map(|(b, binding)| {
                (0..binding.mesh.triangle_count()).map(move |t| PrimRef {
                    binding: b as u32,
                    triangle: t as u32,
                })
            })
            .collect();

        CommittedScene { bindings, primitives }
    }

    pub(crate) fn bound(&self) -> Aabb {
        self.bound
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// One triangle of one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PrimRef {
    pub binding: u32,
    pub triangle: u32,
}

/// Immutable state produced by `commit()`; what queries run against.
#[derive(Debug, Default)]
pub(crate) struct CommittedScene {
    pub bindings: Vec<Arc<Binding>>,
    pub primitives: Vec<PrimRef>,
}

impl CommittedScene {
    pub(crate) fn vertices(&self, prim: PrimRef) -> [Vec3; 3] {
        self.bindings[prim.binding as usize]
            .mesh
            .triangle_vertices(prim.triangle as usize)
    }

    /// Test primitive `index` against `ray`.
    #[inline]
    pub(crate) fn test(&self, index: usize, ray: &Ray, range: Interval) -> Option<(f32, Vec3)> {
        intersect_triangle(ray, self.vertices(self.primitives[index]), range)
    }

    /// Build the full record for a hit found by [`CommittedScene::test`].
    pub(crate) fn resolve(&self, index: usize, ray: &Ray, t: f32, bary: Vec3) -> Intersection<'_> {
        let prim = self.primitives[index];
        let binding = &self.bindings[prim.binding as usize];
        let triangle = prim.triangle as usize;
        Intersection {
            t,
            vertex: ray.at(t),
            normal: binding.mesh.shading_normal(triangle, bary),
            uv: binding.mesh.uv_at(triangle, bary),
            material: binding.material(),
            light: binding.light.as_ref(),
        }
    }

    pub(crate) fn relevant(&self, frustum: &Frustum) -> Vec<&Binding> {
        self.bindings
            .iter()
            .filter(|b| frustum.intersects_aabb(&b.mesh.bounds()))
            .map(|b| b.as_ref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_scenes;
    use lumen_core::{ObjectDesc, OrenNayar, Scene};
    use lumen_math::{T_MAX, T_MIN};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layouts() -> [Box<dyn PathSpace>; 2] {
        [PathSpaceLayout::Linear.create(), PathSpaceLayout::Bvh.create()]
    }

    #[test]
    fn test_empty_answers_nothing() {
        for mut ps in layouts() {
            ps.commit();
            let ray = Ray::new(Vec3::ZERO, Vec3::Z);
            assert!(ps.intersect(&ray).is_none());
            assert!(!ps.has_intersect(&ray, T_MIN, T_MAX));
            assert!(ps.bound().is_empty());
        }
    }

    #[test]
    fn test_load_commit_unload() {
        let mut scene = Scene::new();
        let id = scene.add_object(
            ObjectDesc::new("floor", lumen_core::Mesh::quad(Vec3::ZERO, Vec3::X, Vec3::Y))
                .with_material(OrenNayar::new(Vec3::splat(0.5), 0.0)),
        );
        let transform = Mat4::from_translation(Vec3::new(-0.5, -0.5, 0.0));
        let ray = Ray::new(Vec3::new(0.2, -0.1, 1.0), -Vec3::Z);

        for mut ps in layouts() {
            ps.load(scene.object(id).unwrap(), &transform);
            ps.commit();
            let hit = ps.intersect(&ray).expect("floor hit");
            assert!((hit.t - 1.0).abs() < 1e-5);
            assert!((hit.normal - Vec3::Z).length() < 1e-5);
            assert!(matches!(hit.material, Material::OrenNayar(_)));
            assert!(hit.light.is_none());
            assert_eq!(ps.primitive_count(), 2);

            assert!(ps.unload(id));
            assert!(!ps.unload(id));
            ps.commit();
            assert!(ps.intersect(&ray).is_none());
            assert_eq!(ps.primitive_count(), 0);
        }
    }

    #[test]
    fn test_missing_material_falls_back() {
        let mut scene = Scene::new();
        let id = scene.add_object(ObjectDesc::new(
            "bare",
            lumen_core::Mesh::quad(Vec3::new(-1.0, -1.0, 0.0), Vec3::X * 2.0, Vec3::Y * 2.0),
        ));
        for mut ps in layouts() {
            ps.load(scene.object(id).unwrap(), &Mat4::IDENTITY);
            ps.commit();
            let hit = ps.intersect(&Ray::new(Vec3::new(0.3, -0.2, 1.0), -Vec3::Z)).unwrap();
            assert!(std::ptr::eq(hit.material, &FAIL_SAFE));
        }
    }

    #[test]
    fn test_emitter_shares_baked_mesh() {
        let mut scene = Scene::new();
        let id = scene.add_object(
            ObjectDesc::new("lamp", lumen_core::Mesh::quad(Vec3::ZERO, Vec3::Y, Vec3::X))
                .with_emission(Vec3::ONE),
        );
        let mut ps = BvhPathSpace::new();
        ps.load(scene.object(id).unwrap(), &Mat4::from_translation(Vec3::Z * 3.0));
        ps.commit();

        let hit = ps.intersect(&Ray::new(Vec3::new(0.3, 0.6, 0.0), Vec3::Z)).unwrap();
        match hit.light {
            Some(Light::Area(area)) => assert!((area.mesh.bounds().z.min - 3.0).abs() < 1e-3),
            other => panic!("expected area light, got {other:?}"),
        }
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("bvh".parse::<PathSpaceLayout>().unwrap(), PathSpaceLayout::Bvh);
        assert_eq!("linear".parse::<PathSpaceLayout>().unwrap(), PathSpaceLayout::Linear);
        assert!(matches!(
            "embree".parse::<PathSpaceLayout>(),
            Err(EngineError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_relevant_geometries_culls() {
        let mut scene = Scene::new();
        let near = scene.add_object(ObjectDesc::new(
            "near",
            lumen_core::Mesh::quad(Vec3::new(-1.0, -1.0, 0.0), Vec3::X * 2.0, Vec3::Y * 2.0),
        ));
        let far = scene.add_object(ObjectDesc::new(
            "behind",
            lumen_core::Mesh::quad(Vec3::new(-1.0, -1.0, 50.0), Vec3::X * 2.0, Vec3::Y * 2.0),
        ));
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 100.0);
        let frustum = Frustum::from_view_projection(proj * view);

        for mut ps in layouts() {
            ps.load(scene.object(near).unwrap(), &Mat4::IDENTITY);
            ps.load(scene.object(far).unwrap(), &Mat4::IDENTITY);
            ps.commit();
            let names: Vec<&str> = ps
                .relevant_geometries(&frustum)
                .iter()
                .map(|b| b.name.as_str())
                .collect();
            assert_eq!(names, vec!["near"]);
        }
    }

    #[test]
    fn test_bvh_matches_linear_on_random_rays() {
        let scene = test_scenes::triangle_soup(300, 11);
        let mut linear = LinearPathSpace::new();
        let mut bvh = BvhPathSpace::new();
        test_scenes::load_all(&mut linear, &scene);
        test_scenes::load_all(&mut bvh, &scene);

        let mut rng = StdRng::seed_from_u64(99);
        let mut hits = 0;
        for _ in 0..2000 {
            let ray = test_scenes::random_ray(&mut rng, 12.0);
            let a = linear.intersect(&ray);
            let b = bvh.intersect(&ray);
            match (a, b) {
                (Some(a), Some(b)) => {
                    hits += 1;
                    assert!((a.t - b.t).abs() < 1e-4, "t mismatch {} vs {}", a.t, b.t);
                    assert!((a.vertex - b.vertex).length() < 1e-3);
                    assert!((a.normal - b.normal).length() < 1e-3);
                }
                (None, None) => {}
                (a, b) => panic!("hit disagreement: linear {:?} bvh {:?}", a.map(|h| h.t), b.map(|h| h.t)),
            }
            assert_eq!(
                linear.has_intersect(&ray, T_MIN, T_MAX),
                bvh.has_intersect(&ray, T_MIN, T_MAX)
            );
        }
        assert!(hits > 100, "too few hits to be meaningful: {hits}");
    }
}
