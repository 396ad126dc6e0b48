//! Triangle primitive.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.
//! The geometric normal follows the counter-clockwise winding of the
//! vertices, which also decides the side an emissive triangle lights.

use crate::Material;
use lumen_math::{BoundingBox, DVec3, Interval, Ray};
use std::sync::Arc;

/// A triangle primitive.
#[derive(Debug, Clone)]
pub struct Triangle {
    v0: DVec3,
    edge1: DVec3,
    edge2: DVec3,
    /// Pre-computed face normal (unit length)
    normal: DVec3,
    material: Arc<Material>,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(v0: DVec3, v1: DVec3, v2: DVec3, material: Arc<Material>) -> Self {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        Self {
            v0,
            edge1,
            edge2,
            normal: edge1.cross(edge2).normalize_or_zero(),
            material,
        }
    }

    pub fn vertices(&self) -> [DVec3; 3] {
        [self.v0, self.v0 + self.edge1, self.v0 + self.edge2]
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    /// Möller-Trumbore ray-triangle intersection.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<f64> {
        let h = ray.direction().cross(self.edge2);
        let a = self.edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-12 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * self.edge2.dot(q);
        ray_t.surrounds(t).then_some(t)
    }

    /// The face normal; triangles are flat.
    pub fn normal(&self, _pos: DVec3) -> DVec3 {
        self.normal
    }

    /// Uniformly distributed point on the triangle for `u, v` in [0, 1).
    pub fn point(&self, u: f64, v: f64) -> DVec3 {
        let su = u.sqrt();
        self.v0 + self.edge1 * (su * (1.0 - v)) + self.edge2 * (su * v)
    }

    pub fn area(&self) -> f64 {
        0.5 * self.edge1.cross(self.edge2).length()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let [a, b, c] = self.vertices();
        BoundingBox::new(a.min(b).min(c), a.max(b).max(c))
    }
}
