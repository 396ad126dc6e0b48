use crate::{axis_value, DVec3, Interval, Ray};

/// Axis-aligned bounding box used by every spatial structure.
///
/// A valid box has `min <= max` on every axis. The empty box is
/// `min = +inf, max = -inf`; merging it into another box is a no-op and
/// merging anything into it replaces it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    /// Box containing nothing.
    pub const EMPTY: BoundingBox = BoundingBox {
        min: DVec3::INFINITY,
        max: DVec3::NEG_INFINITY,
    };

    /// Create a box from explicit corners.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Cube centred on `origin` reaching `half_extent` along each axis.
    pub fn from_center(origin: DVec3, half_extent: f64) -> Self {
        let h = DVec3::splat(half_extent);
        Self {
            min: origin - h,
            max: origin + h,
        }
    }

    /// Smallest box covering both arguments.
    pub fn union(a: &BoundingBox, b: &BoundingBox) -> Self {
        let mut merged = *a;
        merged.merge(b);
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand in place to cover `other`.
    pub fn merge(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Expand in place to cover `p`.
    pub fn merge_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Slab test against the part of the ray in front of its origin.
    ///
    /// Returns the entry distance, which is 0 when the origin is inside.
    pub fn intersect(&self, ray: &Ray) -> Option<f64> {
        self.intersect_interval(ray, Interval::FORWARD)
    }

    /// Slab test restricted to `ray_t`; returns the clipped entry distance.
    ///
    /// A zero direction component yields infinite slab distances. An origin
    /// lying exactly on such a slab plane gives NaN, which `f64::max`/`min`
    /// discard in favour of the running interval.
    pub fn intersect_interval(&self, ray: &Ray, mut ray_t: Interval) -> Option<f64> {
        let origin = ray.origin();
        let inv = ray.inv_direction();

        for axis in 0..3 {
            let adinv = axis_value(inv, axis);
            let o = axis_value(origin, axis);
            let mut t0 = (axis_value(self.min, axis) - o) * adinv;
            let mut t1 = (axis_value(self.max, axis) - o) * adinv;
            if adinv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max < ray_t.min {
                return None;
            }
        }

        Some(ray_t.min)
    }

    /// Inclusive point containment.
    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// True when the two boxes share at least one point.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Squared distance from `p` to the closest point of the box, 0 inside.
    pub fn distance2(&self, p: DVec3) -> f64 {
        let d = (self.min - p).max(DVec3::ZERO).max(p - self.max);
        d.length_squared()
    }

    /// Extent along each axis.
    pub fn dimensions(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn centroid(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Surface area; 0 for the empty box.
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.dimensions();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let d = self.dimensions();
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    /// Axes ordered from longest to shortest extent.
    pub fn axes_by_extent(&self) -> [usize; 3] {
        let d = self.dimensions();
        let mut axes = [0, 1, 2];
        axes.sort_by(|&a, &b| {
            axis_value(d, b)
                .partial_cmp(&axis_value(d, a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        axes
    }

    /// Relative position of `p` inside the box, 0 at `min` and 1 at `max`.
    ///
    /// Axes with zero extent map to 0.
    pub fn offset(&self, p: DVec3) -> DVec3 {
        let d = self.dimensions();
        let o = p - self.min;
        DVec3::new(
            if d.x > 0.0 { o.x / d.x } else { 0.0 },
            if d.y > 0.0 { o.y / d.y } else { 0.0 },
            if d.z > 0.0 { o.z / d.z } else { 0.0 },
        )
    }

    /// Smallest cube sharing this box's centre that covers it.
    pub fn cubical(&self) -> BoundingBox {
        let d = self.dimensions();
        let half = 0.5 * d.x.max(d.y).max(d.z);
        BoundingBox::from_center(self.centroid(), half)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(DVec3::splat(-0.5), DVec3::splat(0.5))
    }

    #[test]
    fn test_intersect_entry_distance() {
        let bbox = unit_box();
        let ray = Ray::new(DVec3::new(0.0, 0.0, -5.0), DVec3::Z);
        let t = bbox.intersect(&ray).expect("ray aimed at centre must hit");
        assert!((t - 4.5).abs() < 1e-12);

        // Diagonal approach: origin (-3,-3,-3) towards the centre enters at (-0.5,-0.5,-0.5)
        let origin = DVec3::splat(-3.0);
        let ray = Ray::new(origin, -origin);
        let t = bbox.intersect(&ray).unwrap();
        let expected = (DVec3::splat(-0.5) - origin).length();
        assert!((t - expected).abs() < 1e-9);
    }

    #[test]
    fn test_intersect_miss() {
        let bbox = unit_box();

        // Ray pointing away
        let ray = Ray::new(DVec3::new(0.0, 0.0, -5.0), -DVec3::Z);
        assert!(bbox.intersect(&ray).is_none());

        // Ray passing beside the box
        let ray = Ray::new(DVec3::new(10.0, 0.0, 0.0), DVec3::Z);
        assert!(bbox.intersect(&ray).is_none());
    }

    #[test]
    fn test_intersect_from_inside_is_zero() {
        let ray = Ray::new(DVec3::ZERO, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(unit_box().intersect(&ray), Some(0.0));
    }

    #[test]
    fn test_intersect_axis_parallel_on_slab_plane() {
        // Origin on the x = -0.5 plane with zero x direction: 0 * inf = NaN
        let ray = Ray::new(DVec3::new(-0.5, 0.0, -2.0), DVec3::Z);
        let t = unit_box().intersect(&ray).unwrap();
        assert!((t - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_merge_commutative_and_idempotent() {
        let a = BoundingBox::new(DVec3::ZERO, DVec3::new(5.0, 5.0, 5.0));
        let b = BoundingBox::new(DVec3::splat(3.0), DVec3::new(10.0, 7.0, 4.0));

        assert_eq!(BoundingBox::union(&a, &b), BoundingBox::union(&b, &a));
        assert_eq!(BoundingBox::union(&a, &a), a);
        assert_eq!(
            BoundingBox::union(&a, &b),
            BoundingBox::new(DVec3::ZERO, DVec3::new(10.0, 7.0, 5.0))
        );
    }

    #[test]
    fn test_merge_with_empty_is_noop() {
        let mut a = unit_box();
        a.merge(&BoundingBox::EMPTY);
        assert_eq!(a, unit_box());

        let mut e = BoundingBox::EMPTY;
        e.merge(&unit_box());
        assert_eq!(e, unit_box());
    }

    #[test]
    fn test_merge_point() {
        let mut bbox = BoundingBox::EMPTY;
        bbox.merge_point(DVec3::new(1.0, -2.0, 3.0));
        bbox.merge_point(DVec3::new(-1.0, 2.0, 0.0));
        assert_eq!(bbox.min, DVec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bbox.max, DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_contains_inclusive() {
        let bbox = unit_box();
        assert!(bbox.contains(DVec3::ZERO));
        assert!(bbox.contains(DVec3::splat(0.5)));
        assert!(!bbox.contains(DVec3::new(0.5, 0.5, 0.51)));
        assert!(!BoundingBox::EMPTY.contains(DVec3::ZERO));
    }

    #[test]
    fn test_distance2() {
        let bbox = unit_box();
        assert_eq!(bbox.distance2(DVec3::new(0.1, 0.2, 0.3)), 0.0);
        assert!((bbox.distance2(DVec3::new(2.5, 0.0, 0.0)) - 4.0).abs() < 1e-12);
        assert!((bbox.distance2(DVec3::new(1.5, 1.5, 0.0)) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_area_dimensions_centroid() {
        let bbox = BoundingBox::new(DVec3::ZERO, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.dimensions(), DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.centroid(), DVec3::new(0.5, 1.0, 1.5));
        assert_eq!(bbox.area(), 22.0);
        assert_eq!(BoundingBox::EMPTY.area(), 0.0);
    }

    #[test]
    fn test_longest_axis_and_order() {
        let bbox = BoundingBox::new(DVec3::ZERO, DVec3::new(1.0, 10.0, 5.0));
        assert_eq!(bbox.longest_axis(), 1);
        assert_eq!(bbox.axes_by_extent(), [1, 2, 0]);
    }

    #[test]
    fn test_cubical() {
        let bbox = BoundingBox::new(DVec3::ZERO, DVec3::new(4.0, 2.0, 1.0));
        let cube = bbox.cubical();
        assert_eq!(cube.dimensions(), DVec3::splat(4.0));
        assert_eq!(cube.centroid(), bbox.centroid());
    }
}
