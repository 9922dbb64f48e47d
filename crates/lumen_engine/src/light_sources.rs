//! Power-weighted light selection for next-event estimation.

use std::collections::BTreeMap;

use lumen_core::sampling::gen_f32;
use lumen_core::{Light, ObjectId, SceneObject};
use lumen_math::{Aabb, Frustum, Mat4};
use rand::RngCore;

/// The set of emitters in a scene, sampled proportionally to power.
///
/// Follows the path-space protocol: `load`/`unload` then `commit()` before
/// sampling.
#[derive(Debug, Default)]
pub struct LightSources {
    lights: BTreeMap<ObjectId, Light>,
    /// Load order; the cumulative table follows it.
    order: Vec<ObjectId>,
    cdf_ids: Vec<ObjectId>,
    cdf: Vec<f32>,
    total_power: f32,
    committed: bool,
}

impl LightSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a light keyed by `id`, baked by `transform`.
    pub fn load(&mut self, id: ObjectId, light: &Light, transform: &Mat4) {
        if self.lights.insert(id, light.transformed(transform)).is_none() {
            self.order.push(id);
        }
        self.committed = false;
    }

    /// Load the light bound to `object`, if any.
    pub fn load_object(&mut self, object: &SceneObject, transform: &Mat4) {
        if let Some(light) = object.light.as_deref() {
            self.load(object.id, light, transform);
        }
    }

    pub fn unload(&mut self, id: ObjectId) -> bool {
        let removed = self.lights.remove(&id).is_some();
        if removed {
            self.order.retain(|&o| o != id);
            self.committed = false;
        }
        removed
    }

    /// Bound lights at infinity by the scene extent.
    pub fn set_scene_boundary(&mut self, bound: &Aabb) {
        for light in self.lights.values_mut() {
            light.set_scene_boundary(bound);
        }
        self.committed = false;
    }

    /// Build the cumulative-power table in load order.
    pub fn commit(&mut self) {
        self.cdf_ids.clear();
        self.cdf.clear();
        let mut running = 0.0;
        for id in &self.order {
            if let Some(light) = self.lights.get(id) {
                running += light.total_power();
                self.cdf_ids.push(*id);
                self.cdf.push(running);
            }
        }
        self.total_power = running;
        self.committed = true;

        if !self.cdf.is_empty() && running <= 0.0 {
            log::warn!("{} lights committed with zero total power", self.cdf.len());
        }
        log::info!(
            "Committed {} lights, total power {:.3}",
            self.cdf.len(),
            self.total_power
        );
    }

    /// Pick a light with probability proportional to its power.
    ///
    /// Returns the light and its selection probability.
    ///
    /// # Panics
    ///
    /// Panics if called before `commit()` or on an empty light set.
    pub fn sample_light(&self, rng: &mut dyn RngCore) -> (&Light, f32) {
        assert!(self.committed, "light sources sampled before commit()");
        assert!(!self.cdf.is_empty(), "light sources sampled with no lights");

        let draw = gen_f32(rng) * self.total_power;
        let index = self.cdf.partition_point(|&c| c < draw).min(self.cdf.len() - 1);
        let light = &self.lights[&self.cdf_ids[index]];
        (light, self.selection_probability(light))
    }

    /// Probability that [`LightSources::sample_light`] returns `light`.
    pub fn selection_probability(&self, light: &Light) -> f32 {
        if self.total_power > 0.0 {
            light.total_power() / self.total_power
        } else {
            0.0
        }
    }

    /// Light bound to scene object `id`.
    pub fn object_light(&self, id: ObjectId) -> Option<&Light> {
        self.lights.get(&id)
    }

    /// Lights that may contribute inside `frustum`. Lights at infinity always do.
    pub fn relevant_lights(&self, frustum: &Frustum) -> Vec<&Light> {
        self.lights
            .values()
            .filter(|light| match light.bounds() {
                Some(bound) => frustum.intersects_aabb(&bound),
                None => true,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn total_power(&self) -> f32 {
        self.total_power
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Mesh, ObjectDesc, Scene, SkyLight};
    use lumen_math::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_lights(p1: f32, p2: f32) -> (Scene, LightSources) {
        let mut scene = Scene::new();
        let quad = || Mesh::quad(Vec3::ZERO, Vec3::X, Vec3::Y);
        scene.add_object(ObjectDesc::new("a", quad()).with_emission(Vec3::splat(p1)));
        scene.add_object(ObjectDesc::new("b", quad()).with_emission(Vec3::splat(p2)));

        let mut lights = LightSources::new();
        for object in &scene.objects {
            lights.load_object(object, &Mat4::IDENTITY);
        }
        lights.commit();
        (scene, lights)
    }

    #[test]
    fn test_selection_frequency_matches_power() {
        let (scene, lights) = two_lights(1.0, 3.0);
        let first = lights.object_light(scene.objects[0].id).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let n = 40_000;
        let mut hits = 0;
        for _ in 0..n {
            let (light, p) = lights.sample_light(&mut rng);
            if std::ptr::eq(light, first) {
                hits += 1;
                assert!((p - 0.25).abs() < 1e-5);
            } else {
                assert!((p - 0.75).abs() < 1e-5);
            }
        }
        let freq = hits as f32 / n as f32;
        assert!((freq - 0.25).abs() < 0.01, "frequency {freq}");
    }

    #[test]
    #[should_panic(expected = "before commit")]
    fn test_sampling_before_commit_panics() {
        let (scene, mut lights) = two_lights(1.0, 1.0);
        lights.unload(scene.objects[0].id);
        let mut rng = StdRng::seed_from_u64(1);
        lights.sample_light(&mut rng);
    }

    #[test]
    #[should_panic(expected = "no lights")]
    fn test_sampling_empty_set_panics() {
        let mut lights = LightSources::new();
        lights.commit();
        let mut rng = StdRng::seed_from_u64(1);
        lights.sample_light(&mut rng);
    }

    #[test]
    fn test_unload_rebuilds_table() {
        let (scene, mut lights) = two_lights(1.0, 3.0);
        assert!(lights.unload(scene.objects[1].id));
        lights.commit();

        let mut rng = StdRng::seed_from_u64(8);
        let (_, p) = lights.sample_light(&mut rng);
        assert!((p - 1.0).abs() < 1e-6);
        assert_eq!(lights.len(), 1);
    }

    #[test]
    fn test_sky_is_always_relevant() {
        let mut scene = Scene::new();
        let sky = scene.add_light("sky", SkyLight::new(Vec3::ONE));
        let mut lights = LightSources::new();
        lights.load(sky, &scene.lights[0].light, &Mat4::IDENTITY);
        lights.set_scene_boundary(&Aabb::from_points(Vec3::splat(-1.0), Vec3::ONE));
        lights.commit();

        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let frustum = Frustum::from_view_projection(proj * view);
        assert_eq!(lights.relevant_lights(&frustum).len(), 1);
        assert!(lights.total_power() > 0.0);
    }
}
