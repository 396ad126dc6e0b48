//! Bounding volume hierarchy over scene surfaces.
//!
//! Three construction strategies share one build-node form, which is then
//! compacted into a [`LinearTree`] holding every surface in leaf order.
//! Queries run best-first: boxes are visited in order of their entry
//! distance and traversal stops once no box can beat the closest hit.

use crate::settings::{BvhSettings, BvhStrategy};
use crate::spatial::{BuildNode, LinearTree, Octree, Positioned};
use crate::Surface;
use lumen_math::{axis_value, BoundingBox, DVec3, Interval, Ray};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

/// Subtrees with more surfaces than this are built on the rayon pool.
const PARALLEL_THRESHOLD: usize = 4096;

/// Centroid extents below this count as degenerate.
const MIN_EXTENT: f64 = 1e-12;

/// Quaternary grids evaluate every split pair, so keep them small.
const MAX_GRID_BINS: usize = 8;

/// A surface with its bounds cached for the build.
#[derive(Debug, Clone)]
struct BuildItem {
    surface: Surface,
    bounds: BoundingBox,
    centroid: DVec3,
}

impl BuildItem {
    fn new(surface: Surface) -> Self {
        let bounds = surface.bounding_box();
        Self {
            surface,
            bounds,
            centroid: bounds.centroid(),
        }
    }
}

impl Positioned for BuildItem {
    fn position(&self) -> DVec3 {
        self.centroid
    }
}

/// Build-time BVH node; leaves own their items, interiors own children.
#[derive(Debug)]
struct BvhBuildNode {
    bounds: BoundingBox,
    items: Vec<BuildItem>,
    children: Vec<BvhBuildNode>,
}

impl BvhBuildNode {
    fn leaf(items: Vec<BuildItem>) -> Self {
        Self {
            bounds: item_bounds(&items),
            items,
            children: Vec::new(),
        }
    }

    fn interior(children: Vec<BvhBuildNode>) -> Self {
        let mut bounds = BoundingBox::EMPTY;
        for child in &children {
            bounds.merge(&child.bounds);
        }
        Self {
            bounds,
            items: Vec::new(),
            children,
        }
    }
}

impl BuildNode<Surface> for BvhBuildNode {
    fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty() && self.children.iter().all(|c| c.is_empty())
    }

    fn node_count(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    fn item_count(&self) -> usize {
        self.items.len() + self.children.iter().map(|c| c.item_count()).sum::<usize>()
    }

    fn take_items(&mut self) -> Vec<Surface> {
        self.items.drain(..).map(|item| item.surface).collect()
    }

    fn take_children(&mut self) -> Vec<Self> {
        std::mem::take(&mut self.children)
    }
}

fn item_bounds(items: &[BuildItem]) -> BoundingBox {
    let mut bounds = BoundingBox::EMPTY;
    for item in items {
        bounds.merge(&item.bounds);
    }
    bounds
}

fn centroid_bounds(items: &[BuildItem]) -> BoundingBox {
    let mut bounds = BoundingBox::EMPTY;
    for item in items {
        bounds.merge_point(item.centroid);
    }
    bounds
}

/// Bin index of `centroid` along `axis`, clamped to the last bin.
fn bin_index(cb: &BoundingBox, centroid: DVec3, axis: usize, bins: usize) -> usize {
    let offset = axis_value(cb.offset(centroid), axis);
    ((offset * bins as f64) as usize).min(bins - 1)
}

/// Even split by centroid order, for when no split pays off.
fn split_even(mut items: Vec<BuildItem>, axis: usize) -> (Vec<BuildItem>, Vec<BuildItem>) {
    items.sort_unstable_by(|a, b| {
        axis_value(a.centroid, axis)
            .partial_cmp(&axis_value(b.centroid, axis))
            .unwrap_or(Ordering::Equal)
    });
    let right = items.split_off(items.len() / 2);
    (items, right)
}

fn join_build<F>(left: Vec<BuildItem>, right: Vec<BuildItem>, n: usize, build: F) -> BvhBuildNode
where
    F: Fn(Vec<BuildItem>) -> BvhBuildNode + Sync,
{
    let (l, r) = if n > PARALLEL_THRESHOLD {
        rayon::join(|| build(left), || build(right))
    } else {
        (build(left), build(right))
    };
    BvhBuildNode::interior(vec![l, r])
}

#[derive(Debug, Clone, Copy)]
struct Bin {
    count: usize,
    bounds: BoundingBox,
}

impl Default for Bin {
    fn default() -> Self {
        Self {
            count: 0,
            bounds: BoundingBox::EMPTY,
        }
    }
}

/// Best binned SAH split along `axis` as `(cost, last bin of the left side)`.
///
/// Cost is `1 + (nA * areaA + nB * areaB) / areaParent`; splits that leave
/// one side empty are not considered.
fn best_binary_split(
    items: &[BuildItem],
    parent_area: f64,
    cb: &BoundingBox,
    axis: usize,
    bins: usize,
) -> Option<(f64, usize)> {
    let mut grid = vec![Bin::default(); bins];
    for item in items {
        let b = bin_index(cb, item.centroid, axis, bins);
        grid[b].count += 1;
        grid[b].bounds.merge(&item.bounds);
    }

    // Right-side sweep: area and count of bins (i+1)..bins
    let mut right_area = vec![0.0; bins];
    let mut right_count = vec![0usize; bins];
    let mut acc = Bin::default();
    for i in (1..bins).rev() {
        acc.count += grid[i].count;
        acc.bounds.merge(&grid[i].bounds);
        right_area[i - 1] = acc.bounds.area();
        right_count[i - 1] = acc.count;
    }

    let parent_area = parent_area.max(f64::MIN_POSITIVE);
    let mut best: Option<(f64, usize)> = None;
    let mut left = Bin::default();
    for i in 0..bins - 1 {
        left.count += grid[i].count;
        left.bounds.merge(&grid[i].bounds);
        if left.count == 0 || right_count[i] == 0 {
            continue;
        }
        let cost = 1.0
            + (left.count as f64 * left.bounds.area() + right_count[i] as f64 * right_area[i])
                / parent_area;
        if best.map_or(true, |(c, _)| cost < c) {
            best = Some((cost, i));
        }
    }
    best
}

fn build_binary(items: Vec<BuildItem>, settings: &BvhSettings) -> BvhBuildNode {
    if items.len() <= 1 {
        return BvhBuildNode::leaf(items);
    }
    let cb = centroid_bounds(&items);
    let axis = cb.longest_axis();
    binary_step(items, &cb, axis, settings, |part| build_binary(part, settings))
}

/// One binned SAH split along `axis`, recursing with `recurse`.
///
/// When no split beats a single leaf the node stays a leaf, unless it is
/// over the hard cap; then it is split evenly by centroid order.
fn binary_step<F>(
    items: Vec<BuildItem>,
    cb: &BoundingBox,
    axis: usize,
    settings: &BvhSettings,
    recurse: F,
) -> BvhBuildNode
where
    F: Fn(Vec<BuildItem>) -> BvhBuildNode + Sync,
{
    let n = items.len();
    let bins = settings.sah_bins.max(2);
    let split = if axis_value(cb.dimensions(), axis) > MIN_EXTENT {
        best_binary_split(&items, item_bounds(&items).area(), cb, axis, bins)
    } else {
        None
    };

    match split {
        Some((cost, boundary)) if cost < n as f64 => {
            let (left, right): (Vec<_>, Vec<_>) = items
                .into_iter()
                .partition(|item| bin_index(cb, item.centroid, axis, bins) <= boundary);
            join_build(left, right, n, recurse)
        }
        _ if n > settings.max_leaf_surfaces => {
            let (left, right) = split_even(items, axis);
            join_build(left, right, n, recurse)
        }
        _ => BvhBuildNode::leaf(items),
    }
}

/// Quadrant of grid cell `(i, j)` for a split after column `si` and row `sj`.
fn quadrant(i: usize, j: usize, si: usize, sj: usize) -> usize {
    (i > si) as usize | ((j > sj) as usize) << 1
}

/// Best split of a 2D bin grid into quadrants as `(cost, si, sj)`.
fn best_quaternary_split(
    items: &[BuildItem],
    parent_area: f64,
    cb: &BoundingBox,
    axes: (usize, usize),
    bins: usize,
) -> Option<(f64, usize, usize)> {
    let mut grid = vec![Bin::default(); bins * bins];
    for item in items {
        let i = bin_index(cb, item.centroid, axes.0, bins);
        let j = bin_index(cb, item.centroid, axes.1, bins);
        let cell = &mut grid[j * bins + i];
        cell.count += 1;
        cell.bounds.merge(&item.bounds);
    }

    let parent_area = parent_area.max(f64::MIN_POSITIVE);
    let mut best: Option<(f64, usize, usize)> = None;
    for si in 0..bins - 1 {
        for sj in 0..bins - 1 {
            let mut quads = [Bin::default(); 4];
            for j in 0..bins {
                for i in 0..bins {
                    let cell = &grid[j * bins + i];
                    if cell.count > 0 {
                        let q = &mut quads[quadrant(i, j, si, sj)];
                        q.count += cell.count;
                        q.bounds.merge(&cell.bounds);
                    }
                }
            }
            if quads.iter().filter(|q| q.count > 0).count() < 2 {
                continue;
            }
            let weighted: f64 = quads
                .iter()
                .map(|q| q.count as f64 * q.bounds.area())
                .sum();
            let cost = 1.0 + weighted / parent_area;
            if best.map_or(true, |(c, _, _)| cost < c) {
                best = Some((cost, si, sj));
            }
        }
    }
    best
}

fn build_quaternary(items: Vec<BuildItem>, settings: &BvhSettings) -> BvhBuildNode {
    let n = items.len();
    if n <= 1 {
        return BvhBuildNode::leaf(items);
    }
    let bounds = item_bounds(&items);
    let cb = centroid_bounds(&items);
    let [a0, a1, _] = cb.axes_by_extent();
    let dims = cb.dimensions();

    let recurse = |part: Vec<BuildItem>| build_quaternary(part, settings);

    // A flat centroid spread has no second axis to split along
    if axis_value(dims, a1) <= MIN_EXTENT {
        return binary_step(items, &cb, a0, settings, recurse);
    }

    let bins = settings.sah_bins.clamp(2, MAX_GRID_BINS);
    match best_quaternary_split(&items, bounds.area(), &cb, (a0, a1), bins) {
        Some((cost, si, sj)) if cost < n as f64 => {
            let mut groups: [Vec<BuildItem>; 4] = Default::default();
            for item in items {
                let i = bin_index(&cb, item.centroid, a0, bins);
                let j = bin_index(&cb, item.centroid, a1, bins);
                groups[quadrant(i, j, si, sj)].push(item);
            }
            let groups: Vec<Vec<BuildItem>> =
                groups.into_iter().filter(|g| !g.is_empty()).collect();
            let children = if n > PARALLEL_THRESHOLD {
                groups.into_par_iter().map(recurse).collect()
            } else {
                groups.into_iter().map(recurse).collect()
            };
            BvhBuildNode::interior(children)
        }
        _ if n > settings.max_leaf_surfaces => {
            let (left, right) = split_even(items, a0);
            join_build(left, right, n, recurse)
        }
        _ => BvhBuildNode::leaf(items),
    }
}

/// Octree over centroids, each octree node becoming one BVH node.
fn build_octree(items: Vec<BuildItem>, scene_bounds: &BoundingBox, settings: &BvhSettings) -> BvhBuildNode {
    let mut octree = Octree::from_bounds(scene_bounds, settings.max_leaf_surfaces);
    for item in items {
        octree.insert(item);
    }
    from_octree(octree)
}

fn from_octree(mut node: Octree<BuildItem>) -> BvhBuildNode {
    if node.is_leaf() {
        return BvhBuildNode::leaf(node.take_items());
    }
    let children = node
        .take_children()
        .into_iter()
        .filter(|child| !child.is_empty())
        .map(from_octree)
        .collect();
    BvhBuildNode::interior(children)
}

/// Traversal queue entry; the heap pops the nearest box first.
#[derive(Debug, Clone, Copy)]
struct Visit {
    t: f64,
    node: u32,
}

impl PartialEq for Visit {
    fn eq(&self, other: &Self) -> bool {
        self.t == other.t
    }
}

impl Eq for Visit {}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Visit {
    fn cmp(&self, other: &Self) -> Ordering {
        other.t.partial_cmp(&self.t).unwrap_or(Ordering::Equal)
    }
}

/// Read-only BVH; safe to share between render threads.
#[derive(Debug, Default)]
pub struct Bvh {
    tree: LinearTree<Surface>,
}

impl Bvh {
    /// Build over `surfaces`, which end up reordered in leaf order.
    pub fn new(surfaces: Vec<Surface>, settings: &BvhSettings) -> Self {
        let start = Instant::now();
        let count = surfaces.len();
        let items: Vec<BuildItem> = surfaces.into_iter().map(BuildItem::new).collect();
        let scene_bounds = item_bounds(&items);

        let root = if items.is_empty() {
            BvhBuildNode::leaf(items)
        } else {
            match settings.strategy {
                BvhStrategy::Octree => build_octree(items, &scene_bounds, settings),
                BvhStrategy::BinarySah => build_binary(items, settings),
                BvhStrategy::QuaternarySah => build_quaternary(items, settings),
            }
        };
        let tree = LinearTree::build(root);

        log::info!(
            "BVH ({:?}): {} surfaces, {} nodes in {:.2?}",
            settings.strategy,
            count,
            tree.nodes().len(),
            start.elapsed()
        );
        Self { tree }
    }

    /// Surfaces in leaf order; `Interaction::surface_index` refers to these.
    pub fn surfaces(&self) -> &[Surface] {
        self.tree.items()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn bounds(&self) -> BoundingBox {
        self.tree.bounds()
    }

    pub fn node_count(&self) -> usize {
        self.tree.nodes().len()
    }

    /// Nearest hit inside `ray_t` as `(surface index, t)`.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<(usize, f64)> {
        let nodes = self.tree.nodes();
        let surfaces = self.tree.items();
        let root = nodes.first()?;

        let mut queue = BinaryHeap::with_capacity(64);
        queue.push(Visit {
            t: root.bounds.intersect_interval(ray, ray_t)?,
            node: 0,
        });

        let mut closest = ray_t.max;
        let mut hit = None;
        while let Some(visit) = queue.pop() {
            if visit.t >= closest {
                break;
            }
            let index = visit.node as usize;
            let node = &nodes[index];
            let window = Interval::new(ray_t.min, closest);
            if node.leaf {
                for i in node.items() {
                    if let Some(t) = surfaces[i].intersect(ray, Interval::new(ray_t.min, closest)) {
                        closest = t;
                        hit = Some((i, t));
                    }
                }
            } else {
                for child in self.tree.children(index) {
                    if let Some(t) = nodes[child].bounds.intersect_interval(ray, window) {
                        queue.push(Visit {
                            t,
                            node: child as u32,
                        });
                    }
                }
            }
        }
        hit
    }
}
