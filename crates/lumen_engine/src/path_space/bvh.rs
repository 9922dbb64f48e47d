//! Bounding volume hierarchy layout.
//!
//! `commit()` builds a binary tree over every triangle with a bucketed
//! surface-area heuristic, then flattens it depth-first so traversal is an
//! index walk with an explicit stack. The build tree lives in a temporary
//! arena that is dropped in one piece once flattening is done.

use lumen_core::{ObjectId, SceneObject};
use lumen_math::{Aabb, Frustum, Interval, Mat4, Ray, Vec3, T_MAX, T_MIN};

use super::{Binding, BindingStore, CommittedScene, PathSpace, PrimRef};
use crate::intersection::Intersection;

/// Number of equal-width buckets along the split axis.
const BUCKET_COUNT: usize = 20;
/// Relative cost of a ray-box test.
const COST_BOX: f32 = 1.0;
/// Relative cost of a ray-triangle test.
const COST_TRIANGLE: f32 = 8.0;
/// Ranges larger than this are always split.
const MAX_LEAF_PRIMITIVES: usize = 4;

/// A node of the flattened tree.
///
/// The left child of an interior node is the next node in the array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatNode {
    pub bound: Aabb,
    pub kind: FlatNodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatNodeKind {
    Leaf { start: u32, count: u32 },
    Interior { axis: u8, right: u32 },
}

/// Shape statistics gathered at build time. Depths are over leaves.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BvhStats {
    pub num_nodes: usize,
    pub num_leaves: usize,
    pub max_depth: usize,
    pub avg_depth: f32,
    pub dev_depth: f32,
}

#[derive(Debug, Default)]
pub struct BvhPathSpace {
    store: BindingStore,
    scene: CommittedScene,
    nodes: Vec<FlatNode>,
    stats: BvhStats,
}

impl BvhPathSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BvhStats {
        self.stats
    }

    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    /// Walk the tree calling `visit` on every primitive index in leaves the
    /// ray reaches. `visit` returns false to stop the walk.
    #[inline]
    fn traverse(&self, ray: &Ray, range: &mut Interval, mut visit: impl FnMut(usize, &mut Interval) -> bool) {
        if self.nodes.is_empty() || !self.nodes[0].bound.hit(ray, *range) {
            return;
        }

        let mut stack: Vec<u32> = Vec::with_capacity(64);
        stack.push(0);
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            match node.kind {
                FlatNodeKind::Leaf { start, count } => {
                    for prim in start..start + count {
                        if !visit(prim as usize, range) {
                            return;
                        }
                    }
                }
                FlatNodeKind::Interior { axis, right } => {
                    let left = index + 1;
                    // Pop the child on the near side of the split first.
                    let (near, far) = if ray.direction[axis as usize] >= 0.0 {
                        (left, right)
                    } else {
                        (right, left)
                    };
                    for child in [far, near] {
                        if self.nodes[child as usize].bound.hit(ray, *range) {
                            stack.push(child);
                        }
                    }
                }
            }
        }
    }
}

impl PathSpace for BvhPathSpace {
    fn load(&mut self, object: &SceneObject, transform: &Mat4) {
        self.store.load(object, transform);
    }

    fn unload(&mut self, id: ObjectId) -> bool {
        self.store.unload(id)
    }

    fn commit(&mut self) {
        let mut scene = self.store.commit();
        let (nodes, stats) = build(&mut scene);
        log::info!(
            "Committed BVH path space: {} triangles, {} nodes",
            scene.primitives.len(),
            stats.num_nodes
        );
        log::debug!(
            "BVH depth max {} avg {:.2} dev {:.2}, {} leaves",
            stats.max_depth,
            stats.avg_depth,
            stats.dev_depth,
            stats.num_leaves
        );
        self.scene = scene;
        self.nodes = nodes;
        self.stats = stats;
    }

    fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>> {
        debug_assert!(!self.store.is_dirty(), "path space queried before commit()");
        let mut range = Interval::new(T_MIN, T_MAX);
        let mut closest = None;
        self.traverse(ray, &mut range, |index, range| {
            if let Some((t, bary)) = self.scene.test(index, ray, *range) {
                range.max = t;
                closest = Some((index, t, bary));
            }
            true
        });
        closest.map(|(index, t, bary)| self.scene.resolve(index, ray, t, bary))
    }

    fn has_intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> bool {
        debug_assert!(!self.store.is_dirty(), "path space queried before commit()");
        let mut range = Interval::new(t_min, t_max);
        let mut found = false;
        self.traverse(ray, &mut range, |index, range| {
            found = self.scene.test(index, ray, *range).is_some();
            !found
        });
        found
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

// ============================================================================
// Construction
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct BuildPrim {
    prim: PrimRef,
    bound: Aabb,
    centroid: Vec3,
}

/// Arena node; children are arena indices.
#[derive(Debug, Clone, Copy)]
enum BuildNode {
    Leaf { bound: Aabb, start: usize, count: usize },
    Interior { bound: Aabb, axis: usize, left: usize, right: usize },
}

/// Best bucket boundary on the longest axis of a range.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SplitPlan {
    axis: usize,
    /// Primitives in buckets `[0, boundary)` go left.
    boundary: usize,
    split_cost: f32,
    leaf_cost: f32,
}

impl SplitPlan {
    fn should_split(&self, count: usize) -> bool {
        self.split_cost < self.leaf_cost || count > MAX_LEAF_PRIMITIVES
    }
}

#[inline]
fn bucket_index(c: f32, slab: Interval) -> usize {
    let offset = (c - slab.min) / slab.size();
    ((offset * BUCKET_COUNT as f32) as usize).min(BUCKET_COUNT - 1)
}

fn plan_split(prims: &[BuildPrim], bound: &Aabb) -> SplitPlan {
    let axis = bound.longest_axis();
    let slab = bound.axis_interval(axis);

    let mut buckets = [(Aabb::EMPTY, 0usize); BUCKET_COUNT];
    for p in prims {
        let b = bucket_index(p.centroid[axis], slab);
        buckets[b].0 = Aabb::surrounding(&buckets[b].0, &p.bound);
        buckets[b].1 += 1;
    }

    let area = bound.surface_area();
    let gather = |range: &[(Aabb, usize)]| {
        range
            .iter()
            .fold((Aabb::EMPTY, 0), |(b, c), (bb, bc)| (Aabb::surrounding(&b, bb), c + bc))
    };

    let mut best = (f32::INFINITY, 1);
    for boundary in 1..BUCKET_COUNT {
        let (left, n_left) = gather(&buckets[..boundary]);
        let (right, n_right) = gather(&buckets[boundary..]);
        let cost = COST_BOX
            + COST_TRIANGLE
                * (left.surface_area() / area * n_left as f32
                    + right.surface_area() / area * n_right as f32);
        if cost < best.0 {
            best = (cost, boundary);
        }
    }

    SplitPlan {
        axis,
        boundary: best.1,
        split_cost: best.0,
        leaf_cost: prims.len() as f32 * COST_TRIANGLE,
    }
}

/// In-place partition; returns the number of elements satisfying `pred`.
fn partition<T>(items: &mut [T], pred: impl Fn(&T) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

struct Builder {
    prims: Vec<BuildPrim>,
    arena: Vec<BuildNode>,
    depth_limit: f32,
    leaf_depths: Vec<usize>,
}

impl Builder {
    fn leaf(&mut self, bound: Aabb, start: usize, count: usize, depth: usize) -> usize {
        self.leaf_depths.push(depth);
        self.arena.push(BuildNode::Leaf { bound, start, count });
        self.arena.len() - 1
    }

    fn build(&mut self, start: usize, end: usize, depth: usize) -> usize {
        let count = end - start;
        let bound = self.prims[start..end]
            .iter()
            .fold(Aabb::EMPTY, |acc, p| Aabb::surrounding(&acc, &p.bound));

        if count == 1 {
            return self.leaf(bound, start, count, depth);
        }

        let plan = plan_split(&self.prims[start..end], &bound);
        if !plan.should_split(count) {
            return self.leaf(bound, start, count, depth);
        }

        let axis = plan.axis;
        let mid = if depth as f32 > self.depth_limit {
            // Median by centroid; SAH keeps failing to separate this range.
            let half = count / 2;
            self.prims[start..end].select_nth_unstable_by(half, |a, b| {
                a.centroid[axis].total_cmp(&b.centroid[axis])
            });
            start + half
        } else {
            let slab = bound.axis_interval(axis);
            start
                + partition(&mut self.prims[start..end], |p| {
                    bucket_index(p.centroid[axis], slab) < plan.boundary
                })
        };
        let mid = mid.clamp(start + 1, end - 1);

        let index = self.arena.len();
        self.arena.push(BuildNode::Leaf { bound, start, count });
        let left = self.build(start, mid, depth + 1);
        let right = self.build(mid, end, depth + 1);
        self.arena[index] = BuildNode::Interior {
            bound,
            axis,
            left,
            right,
        };
        index
    }

    fn stats(&self) -> BvhStats {
        let num_leaves = self.leaf_depths.len();
        if num_leaves == 0 {
            return BvhStats::default();
        }
        let n = num_leaves as f32;
        let avg = self.leaf_depths.iter().sum::<usize>() as f32 / n;
        let var = self
            .leaf_depths
            .iter()
            .map(|&d| (d as f32 - avg).powi(2))
            .sum::<f32>()
            / n;
        BvhStats {
            num_nodes: self.arena.len(),
            num_leaves,
            max_depth: self.leaf_depths.iter().copied().max().unwrap_or(0),
            avg_depth: avg,
            dev_depth: var.sqrt(),
        }
    }
}

fn flatten(arena: &[BuildNode], index: usize, out: &mut Vec<FlatNode>) -> u32 {
    let slot = out.len();
    match arena[index] {
        BuildNode::Leaf { bound, start, count } => out.push(FlatNode {
            bound,
            kind: FlatNodeKind::Leaf {
                start: start as u32,
                count: count as u32,
            },
        }),
        BuildNode::Interior {
            bound,
            axis,
            left,
            right,
        } => {
            out.push(FlatNode {
                bound,
                kind: FlatNodeKind::Interior {
                    axis: axis as u8,
                    right: 0,
                },
            });
            flatten(arena, left, out);
            let right = flatten(arena, right, out);
            out[slot].kind = FlatNodeKind::Interior {
                axis: axis as u8,
                right,
            };
        }
    }
    slot as u32
}

/// Build the flattened tree and reorder `scene.primitives` to match its leaves.
fn build(scene: &mut CommittedScene) -> (Vec<FlatNode>, BvhStats) {
    let total = scene.primitives.len();
    if total == 0 {
        return (Vec::new(), BvhStats::default());
    }

    let prims = scene
        .primitives
        .iter()
        .map(|&prim| {
            let [a, b, c] = scene.vertices(prim);
            let bound = Aabb::from_triangle(a, b, c);
            BuildPrim {
                prim,
                bound,
                centroid: bound.centroid(),
            }
        })
        .collect();

    let mut builder = Builder {
        prims,
        arena: Vec::with_capacity(2 * total),
        depth_limit: (total as f32).log2(),
        leaf_depths: Vec::new(),
    };
    let root = builder.build(0, total, 0);

    let mut nodes = Vec::with_capacity(builder.arena.len());
    flatten(&builder.arena, root, &mut nodes);

    scene.primitives = builder.prims.iter().map(|p| p.prim).collect();
    (nodes, builder.stats())
}
