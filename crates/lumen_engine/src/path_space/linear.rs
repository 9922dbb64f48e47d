//! Brute-force layout: every query scans every triangle.
//!
//! Useful as a reference for the BVH and for tiny scenes.

use lumen_core::{ObjectId, SceneObject};
use lumen_math::{Aabb, Frustum, Interval, Mat4, Ray, T_MAX, T_MIN};

use super::{Binding, BindingStore, CommittedScene, PathSpace};
use crate::intersection::Intersection;

#[derive(Debug, Default)]
pub struct LinearPathSpace {
    store: BindingStore,
    scene: CommittedScene,
}

impl LinearPathSpace {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PathSpace for LinearPathSpace {
    fn load(&mut self, object: &SceneObject, transform: &Mat4) {
        self.store.load(object, transform);
    }

    fn unload(&mut self, id: ObjectId) -> bool {
        self.store.unload(id)
    }

    fn commit(&mut self) {
        self.scene = self.store.commit();
        log::info!("Committed linear path space: {} triangles", self.scene.primitives.len());
    }

    fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>> {
        debug_assert!(!self.store.is_dirty(), "path space queried before commit()");
        let mut range = Interval::new(T_MIN, T_MAX);
        let mut closest = None;
        for index in 0..self.scene.primitives.len() {
            if let Some((t, bary)) = self.scene.test(index, ray, range) {
                range.max = t;
                closest = Some((index, t, bary));
            }
        }
        closest.map(|(index, t, bary)| self.scene.resolve(index, ray, t, bary))
    }

    fn has_intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> bool {
        debug_assert!(!self.store.is_dirty(), "path space queried before commit()");
        let range = Interval::new(t_min, t_max);
        (0..self.scene.primitives.len()).any(|index| self.scene.test(index, ray, range).is_some())
    }

    fn bound(&self) -> Aabb {
        self.store.bound()
    }

    fn relevant_geometries(&self, frustum: &Frustum) -> Vec<&Binding> {
        self.scene.relevant(frustum)
    }

    fn primitive_count(&self) -> usize {
        self.scene.primitives.len()
    }
}
