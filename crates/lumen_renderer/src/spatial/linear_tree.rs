use super::{Octree, Positioned};
use lumen_math::{BoundingBox, DVec3};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Owned build-time tree that can be compacted into a [`LinearTree`].
///
/// Compaction consumes the build form: items and children are taken out
/// of each node as it is written.
pub trait BuildNode<T>: Sized {
    fn bounds(&self) -> BoundingBox;
    fn is_leaf(&self) -> bool;
    /// No items and no children anywhere below.
    fn is_empty(&self) -> bool;
    /// Number of non-empty nodes in the subtree.
    fn node_count(&self) -> usize;
    fn item_count(&self) -> usize;
    fn take_items(&mut self) -> Vec<T>;
    fn take_children(&mut self) -> Vec<Self>;
}

/// Entry of the flattened tree.
///
/// Children of a node follow it directly in depth-first order; the first
/// child sits at `index + 1` and the rest are reached through
/// `next_sibling`, which always points past the whole subtree.
#[derive(Debug, Clone, Copy)]
pub struct LinearNode {
    pub bounds: BoundingBox,
    pub leaf: bool,
    /// First item of the subtree in the shared item array
    pub start: u32,
    /// Items in the subtree
    pub count: u32,
    pub next_sibling: Option<u32>,
}

impl LinearNode {
    pub fn items(&self) -> std::ops::Range<usize> {
        self.start as usize..(self.start + self.count) as usize
    }
}

/// Read-only depth-first array form of a spatial tree.
#[derive(Debug, Clone)]
pub struct LinearTree<T> {
    nodes: Vec<LinearNode>,
    items: Vec<T>,
}

/// Query-time form of an [`Octree`].
pub type LinearOctree<T> = LinearTree<T>;

impl<T> Default for LinearTree<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl<T> LinearTree<T> {
    /// Compact a build tree in one depth-first pass, skipping empty subtrees.
    pub fn build<B: BuildNode<T>>(mut root: B) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(root.node_count()),
            items: Vec::with_capacity(root.item_count()),
        };
        if !root.is_empty() {
            tree.flatten(&mut root);
        }
        tree
    }

    fn flatten<B: BuildNode<T>>(&mut self, node: &mut B) {
        let index = self.nodes.len();
        let start = self.items.len();
        self.nodes.push(LinearNode {
            bounds: node.bounds(),
            leaf: node.is_leaf(),
            start: start as u32,
            count: 0,
            next_sibling: None,
        });

        if node.is_leaf() {
            self.items.extend(node.take_items());
        } else {
            let mut previous: Option<usize> = None;
            for mut child in node.take_children() {
                if child.is_empty() {
                    continue;
                }
                let child_index = self.nodes.len();
                if let Some(p) = previous {
                    self.nodes[p].next_sibling = Some(child_index as u32);
                }
                self.flatten(&mut child);
                previous = Some(child_index);
            }
        }
        self.nodes[index].count = (self.items.len() - start) as u32;
    }

    pub fn nodes(&self) -> &[LinearNode] {
        &self.nodes
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn bounds(&self) -> BoundingBox {
        self.nodes.first().map_or(BoundingBox::EMPTY, |n| n.bounds)
    }

    /// Indices of the children of interior node `index`.
    pub fn children(&self, index: usize) -> Children<'_> {
        let node = &self.nodes[index];
        let first = if node.leaf || node.count == 0 {
            None
        } else {
            Some(index as u32 + 1)
        };
        Children {
            nodes: &self.nodes,
            next: first,
        }
    }
}

/// Iterator over a node's children along the `next_sibling` chain.
pub struct Children<'a> {
    nodes: &'a [LinearNode],
    next: Option<u32>,
}

impl Iterator for Children<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next? as usize;
        self.next = self.nodes[current].next_sibling;
        Some(current)
    }
}

impl<T: Positioned> From<Octree<T>> for LinearTree<T> {
    fn from(octree: Octree<T>) -> Self {
        LinearTree::build(octree)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Node(u32),
    Item(u32),
}

/// Priority-queue entry; the heap pops the smallest distance first.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    distance2: f64,
    candidate: Candidate,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance2 == other.distance2
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smaller distance = higher priority
        other
            .distance2
            .partial_cmp(&self.distance2)
            .unwrap_or(Ordering::Equal)
    }
}

impl<T: Positioned> LinearTree<T> {
    /// Up to `k` items no farther than `max_distance`, nearest first.
    ///
    /// Best-first traversal: node boxes enter the queue keyed by their
    /// distance lower bound and leaves contribute their items keyed by the
    /// true distance, so items leave the queue in ascending order.
    pub fn knn_search(&self, point: DVec3, k: usize, max_distance: f64) -> Vec<(&T, f64)> {
        let mut found = Vec::with_capacity(k);
        if k == 0 || self.nodes.is_empty() {
            return found;
        }
        let max_distance2 = max_distance * max_distance;

        let mut queue = BinaryHeap::new();
        let root_distance2 = self.nodes[0].bounds.distance2(point);
        if root_distance2 <= max_distance2 {
            queue.push(QueueEntry {
                distance2: root_distance2,
                candidate: Candidate::Node(0),
            });
        }

        while let Some(entry) = queue.pop() {
            match entry.candidate {
                Candidate::Item(i) => {
                    found.push((&self.items[i as usize], entry.distance2));
                    if found.len() == k {
                        break;
                    }
                }
                Candidate::Node(n) => {
                    let node = &self.nodes[n as usize];
                    if node.leaf {
                        for i in node.items() {
                            let distance2 = self.items[i].position().distance_squared(point);
                            if distance2 <= max_distance2 {
                                queue.push(QueueEntry {
                                    distance2,
                                    candidate: Candidate::Item(i as u32),
                                });
                            }
                        }
                    } else {
                        for child in self.children(n as usize) {
                            let distance2 = self.nodes[child].bounds.distance2(point);
                            if distance2 <= max_distance2 {
                                queue.push(QueueEntry {
                                    distance2,
                                    candidate: Candidate::Node(child as u32),
                                });
                            }
                        }
                    }
                }
            }
        }
        found
    }

    /// Every item within `radius` of `point`, unordered.
    pub fn radius_search(&self, point: DVec3, radius: f64) -> Vec<(&T, f64)> {
        let mut found = Vec::new();
        if !self.nodes.is_empty() {
            self.radius_search_from(0, point, radius * radius, &mut found);
        }
        found
    }

    fn radius_search_from<'a>(
        &'a self,
        index: usize,
        point: DVec3,
        radius2: f64,
        found: &mut Vec<(&'a T, f64)>,
    ) {
        let node = &self.nodes[index];
        if node.bounds.distance2(point) > radius2 {
            return;
        }
        if node.leaf {
            for item in &self.items[node.items()] {
                let distance2 = item.position().distance_squared(point);
                if distance2 <= radius2 {
                    found.push((item, distance2));
                }
            }
        } else {
            for child in self.children(index) {
                self.radius_search_from(child, point, radius2, found);
            }
        }
    }

    /// True when no item lies within `radius` of `point`.
    ///
    /// Stops at the first qualifying item.
    pub fn radius_empty(&self, point: DVec3, radius: f64) -> bool {
        self.nodes.is_empty() || !self.any_within(0, point, radius * radius)
    }

    fn any_within(&self, index: usize, point: DVec3, radius2: f64) -> bool {
        let node = &self.nodes[index];
        if node.bounds.distance2(point) > radius2 {
            return false;
        }
        if node.leaf {
            self.items[node.items()]
                .iter()
                .any(|item| item.position().distance_squared(point) <= radius2)
        } else {
            self.children(index)
                .any(|child| self.any_within(child, point, radius2))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        id: usize,
        pos: DVec3,
    }

    impl Positioned for Point {
        fn position(&self) -> DVec3 {
            self.pos
        }
    }

    fn random_points(n: usize, seed: u64) -> Vec<Point> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|id| Point {
                id,
                pos: DVec3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                ),
            })
            .collect()
    }

    fn octree(points: &[Point], capacity: usize) -> Octree<Point> {
        let mut tree = Octree::new(DVec3::ZERO, 1.0, capacity);
        for p in points {
            tree.insert(p.clone());
        }
        tree
    }

    fn assert_well_formed<T>(tree: &LinearTree<T>) {
        let nodes = tree.nodes();
        for (i, node) in nodes.iter().enumerate() {
            if let Some(next) = node.next_sibling {
                assert!(next as usize > i);
            }
            if !node.leaf {
                let mut total = 0;
                for child in tree.children(i) {
                    assert!(child > i);
                    let c = &nodes[child];
                    assert!(c.start >= node.start);
                    assert!(c.start + c.count <= node.start + node.count);
                    total += c.count;
                }
                assert_eq!(total, node.count);
            }
        }
    }

    #[test]
    fn test_linear_radius_search_matches_octree() {
        let points = random_points(3_000, 21);
        let tree = octree(&points, 6);
        let query = DVec3::new(0.25, 0.1, -0.4);
        let radius = 0.35;

        let mut expected: Vec<usize> = tree.radius_search(query, radius).iter().map(|p| p.id).collect();
        expected.sort_unstable();

        let linear = LinearOctree::from(tree);
        assert_eq!(linear.len(), points.len());
        assert_well_formed(&linear);

        let mut got: Vec<usize> = linear
            .radius_search(query, radius)
            .iter()
            .map(|(p, _)| p.id)
            .collect();
        got.sort_unstable();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_empty_leaves_are_skipped() {
        let tree = octree(&random_points(500, 2), 4);
        let expected_nodes = tree.node_count();
        let linear = LinearOctree::from(tree);
        assert_eq!(linear.nodes().len(), expected_nodes);
        assert!(linear.nodes().iter().all(|n| n.count > 0));
    }

    #[test]
    fn test_knn_ordering_and_limits() {
        let points = random_points(2_000, 9);
        let linear = LinearOctree::from(octree(&points, 8));
        let query = DVec3::new(-0.1, 0.3, 0.2);
        let (k, max_distance) = (25, 0.3);

        let result = linear.knn_search(query, k, max_distance);
        assert!(result.len() <= k);
        assert!(result.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(result.iter().all(|(_, d2)| *d2 <= max_distance * max_distance));

        // Same as the k closest by brute force
        let mut brute: Vec<f64> = points
            .iter()
            .map(|p| p.pos.distance_squared(query))
            .filter(|d2| *d2 <= max_distance * max_distance)
            .collect();
        brute.sort_by(|a, b| a.partial_cmp(b).unwrap());
        brute.truncate(k);
        let got: Vec<f64> = result.iter().map(|(_, d2)| *d2).collect();
        assert_eq!(got, brute);
    }

    #[test]
    fn test_knn_starved_by_radius() {
        let points = random_points(200, 4);
        let linear = LinearOctree::from(octree(&points, 4));
        let query = DVec3::splat(5.0);
        assert!(linear.knn_search(query, 10, 1.0).is_empty());
        assert_eq!(linear.knn_search(query, 10, 100.0).len(), 10);
    }

    #[test]
    fn test_radius_empty() {
        let points = vec![
            Point { id: 0, pos: DVec3::ZERO },
            Point { id: 1, pos: DVec3::new(0.9, 0.9, 0.9) },
        ];
        let linear = LinearOctree::from(octree(&points, 1));
        assert!(!linear.radius_empty(DVec3::new(0.05, 0.0, 0.0), 0.1));
        assert!(linear.radius_empty(DVec3::new(0.5, 0.5, 0.5), 0.1));
        assert!(LinearOctree::<Point>::default().radius_empty(DVec3::ZERO, 1.0));
    }

    #[test]
    fn test_empty_octree_compacts_to_nothing() {
        let tree: Octree<Point> = Octree::new(DVec3::ZERO, 1.0, 4);
        let linear = LinearOctree::from(tree);
        assert!(linear.nodes().is_empty());
        assert!(linear.knn_search(DVec3::ZERO, 5, 10.0).is_empty());
        assert!(linear.radius_search(DVec3::ZERO, 10.0).is_empty());
    }
}
