//! Scene description handed to the engine.
//!
//! A `Scene` owns the objects produced by external loaders. Each object is a
//! binding of geometry, an optional material and an optional light, keyed
//! by an [`ObjectId`] drawn from the scene's own monotonic counter.

use std::fmt;
use std::sync::Arc;

use lumen_math::{Color, Mat4, Quat, Vec3};

use crate::light::{AreaLight, Light};
use crate::material::Material;
use crate::mesh::Mesh;

/// Stable identifier of a scene object, unique within its scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Transform decomposed into translation, rotation and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Decompose a 4x4 matrix into translation, rotation, and scale.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// One loadable unit: geometry plus what is bound to it.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub mesh: Arc<Mesh>,
    pub material: Option<Arc<Material>>,
    pub light: Option<Arc<Light>>,
    pub transform: Transform,
}

/// A light not attached to any geometry (e.g. a sky).
#[derive(Clone, Debug)]
pub struct SceneLight {
    pub id: ObjectId,
    pub name: String,
    pub light: Arc<Light>,
}

/// Builder for objects before they receive an id from a [`Scene`].
#[derive(Clone, Debug)]
pub struct ObjectDesc {
    name: String,
    mesh: Arc<Mesh>,
    material: Option<Arc<Material>>,
    light: Option<Arc<Light>>,
    transform: Transform,
}

impl ObjectDesc {
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh: Arc::new(mesh),
            material: None,
            light: None,
            transform: Transform::default(),
        }
    }

    pub fn with_material(mut self, material: impl Into<Material>) -> Self {
        self.material = Some(Arc::new(material.into()));
        self
    }

    /// Turn the object's own surface into an area light.
    pub fn with_emission(mut self, radiance: Color) -> Self {
        let light = AreaLight::new(Arc::clone(&self.mesh), radiance);
        self.light = Some(Arc::new(light.into()));
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// Scene container with a per-scene id counter.
#[derive(Debug, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub lights: Vec<SceneLight>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add an object and return its freshly assigned id.
    pub fn add_object(&mut self, desc: ObjectDesc) -> ObjectId {
        let id = self.allocate_id();
        self.objects.push(SceneObject {
            id,
            name: desc.name,
            mesh: desc.mesh,
            material: desc.material,
            light: desc.light,
            transform: desc.transform,
        });
        id
    }

    /// Add a light that has no geometry of its own.
    pub fn add_light(&mut self, name: impl Into<String>, light: impl Into<Light>) -> ObjectId {
        let id = self.allocate_id();
        self.lights.push(SceneLight {
            id,
            name: name.into(),
            light: Arc::new(light.into()),
        });
        id
    }

    /// Remove an object or free-standing light. Ids are never reused.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let before = self.objects.len() + self.lights.len();
        self.objects.retain(|o| o.id != id);
        self.lights.retain(|l| l.id != id);
        before != self.objects.len() + self.lights.len()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.objects.iter().map(|o| o.mesh.triangle_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::SkyLight;
    use crate::material::OrenNayar;

    fn quad() -> Mesh {
        Mesh::quad(Vec3::ZERO, Vec3::X, Vec3::Y)
    }

    #[test]
    fn test_ids_are_monotonic_and_not_reused() {
        let mut scene = Scene::new();
        let a = scene.add_object(ObjectDesc::new("a", quad()));
        let sky = scene.add_light("sky", SkyLight::new(Vec3::ONE));
        assert!(scene.remove(a));
        let b = scene.add_object(ObjectDesc::new("b", quad()));

        assert!(a < sky && sky < b);
        assert!(!scene.remove(a));
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.lights.len(), 1);
    }

    #[test]
    fn test_separate_scenes_count_independently() {
        let mut first = Scene::new();
        let mut second = Scene::new();
        first.add_object(ObjectDesc::new("x", quad()));
        let a = first.add_object(ObjectDesc::new("y", quad()));
        let b = second.add_object(ObjectDesc::new("y", quad()));
        assert_eq!(a.raw(), 1);
        assert_eq!(b.raw(), 0);
    }

    #[test]
    fn test_emission_shares_object_mesh() {
        let mut scene = Scene::new();
        let id = scene.add_object(
            ObjectDesc::new("lamp", quad())
                .with_material(OrenNayar::new(Vec3::splat(0.5), 0.0))
                .with_emission(Vec3::splat(4.0)),
        );
        let object = scene.object(id).unwrap();
        match object.light.as_deref() {
            Some(Light::Area(area)) => assert!(Arc::ptr_eq(&area.mesh, &object.mesh)),
            other => panic!("expected area light, got {other:?}"),
        }
        assert_eq!(scene.triangle_count(), 2);
    }

    #[test]
    fn test_transform_matrix_round_trip() {
        let t = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.5),
            scale: Vec3::splat(2.0),
        };
        let back = Transform::from_matrix(t.to_matrix());
        assert!((back.translation - t.translation).length() < 1e-4);
        assert!((back.scale - t.scale).length() < 1e-4);
    }
}
