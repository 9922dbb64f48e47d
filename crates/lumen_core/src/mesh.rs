//! Triangle mesh geometry with a precomputed area distribution.
//!
//! Meshes are populated by external loaders (or the primitive constructors
//! below), baked into world space by the path space, and sampled by area
//! lights through the cumulative-area table.

use std::f32::consts::PI;

use lumen_math::{Aabb, Mat4, Mat4Ext, Vec2, Vec3};
use rand::RngCore;

use crate::sampling::{gen_f32, uniform_triangle};

/// A point drawn on a surface together with its area density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub point: Vec3,
    pub normal: Vec3,
    /// Density with respect to surface area.
    pub density: f32,
}

/// Indexed triangle mesh.
///
/// Positions, normals and uvs are per vertex; `triangles` holds index
/// triples. Bounds and the cumulative-area table are derived at
/// construction and whenever the mesh is transformed.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Texture coordinates; empty when the mesh has none.
    pub uvs: Vec<Vec2>,
    pub triangles: Vec<[u32; 3]>,
    bounds: Aabb,
    cumulative_area: Vec<f32>,
}

impl Mesh {
    /// Create a mesh from positions and triangles, optionally with normals.
    ///
    /// Triangles referencing missing vertices are dropped. Smooth normals are
    /// computed when none (or a mismatched count) are supplied.
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>, normals: Option<Vec<Vec3>>) -> Self {
        let vertex_count = positions.len();
        let total = triangles.len();
        let triangles: Vec<[u32; 3]> = triangles
            .into_iter()
            .filter(|tri| tri.iter().all(|&i| (i as usize) < vertex_count))
            .collect();
        if triangles.len() != total {
            log::warn!(
                "Dropped {} triangles with out-of-range vertex indices",
                total - triangles.len()
            );
        }

        let mut mesh = Self {
            positions,
            normals: Vec::new(),
            uvs: Vec::new(),
            triangles,
            bounds: Aabb::EMPTY,
            cumulative_area: Vec::new(),
        };

        match normals {
            Some(normals) if normals.len() == vertex_count => mesh.normals = normals,
            Some(normals) => {
                log::warn!(
                    "Normal count {} does not match vertex count {}, recomputing",
                    normals.len(),
                    vertex_count
                );
                mesh.compute_normals();
            }
            None => mesh.compute_normals(),
        }

        mesh.update_derived();
        mesh
    }

    /// Attach per-vertex texture coordinates.
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        if uvs.len() == self.positions.len() {
            self.uvs = uvs;
        } else {
            log::warn!(
                "UV count {} does not match vertex count {}, ignoring",
                uvs.len(),
                self.positions.len()
            );
        }
        self
    }

    /// Single triangle with a flat normal following counter-clockwise winding.
    pub fn triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let n = (b - a).cross(c - a).normalize_or_zero();
        Self::new(vec![a, b, c], vec![[0, 1, 2]], Some(vec![n; 3]))
            .with_uvs(vec![Vec2::ZERO, Vec2::X, Vec2::Y])
    }

    /// Parallelogram spanned by `edge_u` and `edge_v` from `corner`.
    /// The normal is `edge_u × edge_v`.
    pub fn quad(corner: Vec3, edge_u: Vec3, edge_v: Vec3) -> Self {
        let n = edge_u.cross(edge_v).normalize_or_zero();
        let positions = vec![corner, corner + edge_u, corner + edge_u + edge_v, corner + edge_v];
        Self::new(positions, vec![[0, 1, 2], [0, 2, 3]], Some(vec![n; 4]))
            .with_uvs(vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y])
    }

    /// Latitude/longitude sphere with `resolution` rings and segments.
    ///
    /// With `inward` set the normals face the centre, which turns the sphere
    /// into an enclosure that can be shaded from inside.
    pub fn uv_sphere(center: Vec3, radius: f32, resolution: u32, inward: bool) -> Self {
        let stacks = resolution.max(2);
        let slices = resolution.max(3);
        let sign = if inward { -1.0 } else { 1.0 };

        let mut positions = Vec::with_capacity(((stacks + 1) * (slices + 1)) as usize);
        let mut normals = Vec::with_capacity(positions.capacity());
        let mut uvs = Vec::with_capacity(positions.capacity());
        for i in 0..=stacks {
            let theta = PI * i as f32 / stacks as f32;
            for j in 0..=slices {
                let phi = 2.0 * PI * j as f32 / slices as f32;
                let dir = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                positions.push(center + dir * radius);
                normals.push(dir * sign);
                uvs.push(Vec2::new(j as f32 / slices as f32, i as f32 / stacks as f32));
            }
        }

        let row = slices + 1;
        let mut triangles = Vec::with_capacity((2 * stacks * slices) as usize);
        for i in 0..stacks {
            for j in 0..slices {
                let a = i * row + j;
                let b = a + row;
                let c = b + 1;
                let d = a + 1;
                // Skip the collapsed triangles touching either pole.
                if i + 1 != stacks {
                    triangles.push([a, b, c]);
                }
                if i != 0 {
                    triangles.push([a, c, d]);
                }
            }
        }

        Self::new(positions, triangles, Some(normals)).with_uvs(uvs)
    }

    /// Compute smooth vertex normals by averaging area-weighted face normals.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for &[i0, i1, i2] in &self.triangles {
            let p0 = self.positions[i0 as usize];
            let p1 = self.positions[i1 as usize];
            let p2 = self.positions[i2 as usize];
            let face_normal = (p1 - p0).cross(p2 - p0);

            normals[i0 as usize] += face_normal;
            normals[i1 as usize] += face_normal;
            normals[i2 as usize] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = normals;
    }

    /// Copy of this mesh with points moved by `transform` and normals by its
    /// inverse transpose.
    pub fn transformed(&self, transform: &Mat4) -> Self {
        let mut mesh = Self {
            positions: self.positions.iter().map(|&p| transform.transform_point3(p)).collect(),
            normals: self.normals.iter().map(|&n| transform.transform_normal(n)).collect(),
            uvs: self.uvs.clone(),
            triangles: self.triangles.clone(),
            bounds: Aabb::EMPTY,
            cumulative_area: Vec::new(),
        };
        mesh.update_derived();
        mesh
    }

    fn update_derived(&mut self) {
        self.bounds = self
            .positions
            .iter()
            .fold(Aabb::EMPTY, |acc, &p| acc.include_point(p));

        let mut running = 0.0;
        self.cumulative_area = (0..self.triangles.len())
            .map(|i| {
                running += self.triangle_area(i);
                running
            })
            .collect();
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    /// World-space corners of triangle `index`.
    pub fn triangle_vertices(&self, index: usize) -> [Vec3; 3] {
        self.triangles[index].map(|i| self.positions[i as usize])
    }

    pub fn triangle_area(&self, index: usize) -> f32 {
        let [p0, p1, p2] = self.triangle_vertices(index);
        0.5 * (p1 - p0).cross(p2 - p0).length()
    }

    /// Sum of all triangle areas.
    pub fn surface_area(&self) -> f32 {
        self.cumulative_area.last().copied().unwrap_or(0.0)
    }

    /// Interpolated, normalized shading normal at barycentric `bary`.
    pub fn shading_normal(&self, index: usize, bary: Vec3) -> Vec3 {
        let [n0, n1, n2] = self.triangles[index].map(|i| self.normals[i as usize]);
        (n0 * bary.x + n1 * bary.y + n2 * bary.z).normalize_or_zero()
    }

    /// Interpolated texture coordinate, zero when the mesh has no uvs.
    pub fn uv_at(&self, index: usize, bary: Vec3) -> Vec2 {
        if self.uvs.is_empty() {
            return Vec2::ZERO;
        }
        let [t0, t1, t2] = self.triangles[index].map(|i| self.uvs[i as usize]);
        t0 * bary.x + t1 * bary.y + t2 * bary.z
    }

    /// Draw a point uniformly by area.
    ///
    /// The triangle is picked by binary search over the cumulative-area
    /// table, then a uniform point inside it. Returns a zero-density sample
    /// for meshes without area.
    pub fn sample(&self, rng: &mut dyn RngCore) -> SurfaceSample {
        let total = self.surface_area();
        if total <= 0.0 {
            return SurfaceSample {
                point: self.bounds.centroid(),
                normal: Vec3::Y,
                density: 0.0,
            };
        }

        let draw = gen_f32(rng) * total;
        let index = self
            .cumulative_area
            .partition_point(|&c| c < draw)
            .min(self.triangles.len() - 1);

        let bary = uniform_triangle(gen_f32(rng), gen_f32(rng));
        let [p0, p1, p2] = self.triangle_vertices(index);
        SurfaceSample {
            point: p0 * bary.x + p1 * bary.y + p2 * bary.z,
            normal: self.shading_normal(index, bary),
            density: 1.0 / total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_quad_area_and_bounds() {
        let quad = Mesh::quad(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 3.0));

        assert_eq!(quad.triangle_count(), 2);
        assert!((quad.surface_area() - 6.0).abs() < 1e-5);
        assert!((quad.bounds().x.max - 2.0).abs() < 1e-5);
        // (2,0,0) x (0,0,3) points down -Y.
        assert!((quad.normals[0] - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_invalid_triangles_dropped() {
        let mesh = Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 2], [0, 1, 7]],
            None,
        );
        assert_eq!(mesh.triangle_count(), 1);
        assert!((mesh.normals[0] - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_uv_sphere_area_and_orientation() {
        let sphere = Mesh::uv_sphere(Vec3::new(1.0, 2.0, 3.0), 10.0, 30, true);
        let analytic = 4.0 * PI * 100.0;

        assert!((sphere.surface_area() - analytic).abs() / analytic < 0.02);
        for (p, n) in sphere.positions.iter().zip(&sphere.normals) {
            let outward = (*p - Vec3::new(1.0, 2.0, 3.0)).normalize();
            assert!(n.dot(outward) < -0.99);
        }
        for i in 0..sphere.triangle_count() {
            assert!(sphere.triangle_area(i) > 0.0);
        }
    }

    #[test]
    fn test_sample_lies_on_surface() {
        let quad = Mesh::quad(Vec3::ZERO, Vec3::X, Vec3::Y);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let s = quad.sample(&mut rng);
            assert!(s.point.z.abs() < 1e-6);
            assert!((0.0..=1.0).contains(&s.point.x));
            assert!((0.0..=1.0).contains(&s.point.y));
            assert!((s.density - 1.0).abs() < 1e-5);
            assert!((s.normal - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_sample_proportional_to_area() {
        // Big triangle has area 4, small one area 1 (disjoint along X).
        let mesh = Mesh::new(
            vec![
                Vec3::ZERO,
                Vec3::new(4.0, 0.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(10.0, 0.0, 0.0),
                Vec3::new(12.0, 0.0, 0.0),
                Vec3::new(10.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
            None,
        );
        let mut rng = StdRng::seed_from_u64(3);
        let n = 20_000;
        let big = (0..n).filter(|_| mesh.sample(&mut rng).point.x < 5.0).count();
        let freq = big as f32 / n as f32;
        assert!((freq - 0.8).abs() < 0.02);
    }

    #[test]
    fn test_transformed_rebuilds_derived() {
        let quad = Mesh::quad(Vec3::ZERO, Vec3::X, Vec3::Y);
        let mat = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)) * Mat4::from_scale(Vec3::splat(2.0));
        let moved = quad.transformed(&mat);

        assert!((moved.surface_area() - 4.0).abs() < 1e-4);
        assert!((moved.bounds().z.min - 5.0).abs() < 1e-3);
        assert!((moved.normals[0] - Vec3::Z).length() < 1e-5);
        assert_eq!(moved.uvs, quad.uvs);
    }
}
