use super::{BuildNode, Positioned};
use lumen_math::{BoundingBox, DVec3};

/// Nodes deeper than this keep growing their item list instead of
/// splitting again, so coincident positions cannot recurse forever.
const MAX_DEPTH: u32 = 32;

/// Mutable octree used while a point set is being collected.
///
/// Items are inserted one at a time. A leaf holds up to `max_node_data`
/// items; the next insertion turns it into an interior node whose octants
/// are only allocated once an item actually lands in them. Not safe for
/// concurrent writers: collect per thread, then insert from one thread.
#[derive(Debug)]
pub struct Octree<T> {
    origin: DVec3,
    half_extent: f64,
    max_node_data: usize,
    depth: u32,
    data: Vec<T>,
    children: [Option<Box<Octree<T>>>; 8],
    subdivided: bool,
    /// Tight bounds of every item stored at or below this node
    extent: BoundingBox,
    len: usize,
}

impl<T: Positioned> Octree<T> {
    /// Create an empty tree covering the cube `origin ± half_extent`.
    pub fn new(origin: DVec3, half_extent: f64, max_node_data: usize) -> Self {
        Self::with_depth(origin, half_extent, max_node_data.max(1), 0)
    }

    /// Create an empty tree over the smallest cube covering `bbox`.
    pub fn from_bounds(bbox: &BoundingBox, max_node_data: usize) -> Self {
        let cube = bbox.cubical();
        Self::new(cube.centroid(), 0.5 * cube.dimensions().x, max_node_data)
    }

    fn with_depth(origin: DVec3, half_extent: f64, max_node_data: usize, depth: u32) -> Self {
        Self {
            origin,
            half_extent,
            max_node_data,
            depth,
            data: Vec::new(),
            children: Default::default(),
            subdivided: false,
            extent: BoundingBox::EMPTY,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The cube this node subdivides.
    pub fn cell(&self) -> BoundingBox {
        BoundingBox::from_center(self.origin, self.half_extent)
    }

    /// Tight bounds of the stored items.
    pub fn extent(&self) -> BoundingBox {
        self.extent
    }

    /// Octant index of `p`: bit `c` is set when `p[c] >= origin[c]`.
    fn octant(&self, p: DVec3) -> usize {
        (p.x >= self.origin.x) as usize
            | ((p.y >= self.origin.y) as usize) << 1
            | ((p.z >= self.origin.z) as usize) << 2
    }

    pub fn insert(&mut self, item: T) {
        self.extent.merge_point(item.position());
        self.len += 1;

        if !self.subdivided {
            if self.data.len() < self.max_node_data || self.depth >= MAX_DEPTH {
                self.data.push(item);
                return;
            }
            self.subdivided = true;
            for existing in std::mem::take(&mut self.data) {
                self.insert_child(existing);
            }
        }
        self.insert_child(item);
    }

    fn insert_child(&mut self, item: T) {
        let index = self.octant(item.position());
        let quarter = 0.5 * self.half_extent;
        let offset = DVec3::new(
            if index & 1 != 0 { quarter } else { -quarter },
            if index & 2 != 0 { quarter } else { -quarter },
            if index & 4 != 0 { quarter } else { -quarter },
        );
        let (origin, max_node_data, depth) = (self.origin, self.max_node_data, self.depth);
        self.children[index]
            .get_or_insert_with(|| {
                Box::new(Octree::with_depth(origin + offset, quarter, max_node_data, depth + 1))
            })
            .insert(item);
    }

    /// All items within `radius` of `point`.
    pub fn radius_search(&self, point: DVec3, radius: f64) -> Vec<&T> {
        let mut found = Vec::new();
        self.radius_search_into(point, radius * radius, &mut found);
        found
    }

    fn radius_search_into<'a>(&'a self, point: DVec3, radius2: f64, found: &mut Vec<&'a T>) {
        if self.extent.distance2(point) > radius2 {
            return;
        }
        found.extend(
            self.data
                .iter()
                .filter(|item| item.position().distance_squared(point) <= radius2),
        );
        for child in self.children.iter().flatten() {
            child.radius_search_into(point, radius2, found);
        }
    }

    /// All items inside the box `[min, max]`.
    pub fn box_search(&self, min: DVec3, max: DVec3) -> Vec<&T> {
        let query = BoundingBox::new(min, max);
        let mut found = Vec::new();
        self.box_search_into(&query, &mut found);
        found
    }

    fn box_search_into<'a>(&'a self, query: &BoundingBox, found: &mut Vec<&'a T>) {
        if self.extent.is_empty() || !self.extent.overlaps(query) {
            return;
        }
        found.extend(self.data.iter().filter(|item| query.contains(item.position())));
        for child in self.children.iter().flatten() {
            child.box_search_into(query, found);
        }
    }
}

impl<T: Positioned> BuildNode<T> for Octree<T> {
    fn bounds(&self) -> BoundingBox {
        self.extent
    }

    fn is_leaf(&self) -> bool {
        !self.subdivided
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node_count(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        1 + self
            .children
            .iter()
            .flatten()
            .map(|child| child.node_count())
            .sum::<usize>()
    }

    fn item_count(&self) -> usize {
        self.len
    }

    fn take_items(&mut self) -> Vec<T> {
        std::mem::take(&mut self.data)
    }

    fn take_children(&mut self) -> Vec<Self> {
        self.children
            .iter_mut()
            .filter_map(Option::take)
            .map(|child| *child)
            .collect()
    }
}
