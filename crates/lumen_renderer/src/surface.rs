//! Closed set of renderable surfaces.

use crate::{Material, Sphere, Triangle};
use lumen_math::{BoundingBox, DVec3, Interval, Ray};
use std::f64::consts::PI;
use std::sync::Arc;

/// Any surface the scene can hold, dispatched by `match`.
#[derive(Debug, Clone)]
pub enum Surface {
    Sphere(Sphere),
    Triangle(Triangle),
}

impl Surface {
    /// Distance to the nearest hit strictly inside `ray_t`.
    #[inline]
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<f64> {
        match self {
            Surface::Sphere(s) => s.intersect(ray, ray_t),
            Surface::Triangle(t) => t.intersect(ray, ray_t),
        }
    }

    /// Outward geometric normal at a point on the surface.
    #[inline]
    pub fn normal(&self, pos: DVec3) -> DVec3 {
        match self {
            Surface::Sphere(s) => s.normal(pos),
            Surface::Triangle(t) => t.normal(pos),
        }
    }

    /// Area-uniform point for `u, v` in [0, 1).
    pub fn point(&self, u: f64, v: f64) -> DVec3 {
        match self {
            Surface::Sphere(s) => s.point(u, v),
            Surface::Triangle(t) => t.point(u, v),
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            Surface::Sphere(s) => s.area(),
            Surface::Triangle(t) => t.area(),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Surface::Sphere(s) => s.bounding_box(),
            Surface::Triangle(t) => t.bounding_box(),
        }
    }

    pub fn centroid(&self) -> DVec3 {
        self.bounding_box().centroid()
    }

    pub fn material(&self) -> &Arc<Material> {
        match self {
            Surface::Sphere(s) => s.material(),
            Surface::Triangle(t) => t.material(),
        }
    }

    /// Power emitted from the front side, `emittance * area * pi`.
    pub fn flux(&self) -> crate::Color {
        self.material().emittance * self.area() * PI
    }
}

impl From<Sphere> for Surface {
    fn from(sphere: Sphere) -> Self {
        Surface::Sphere(sphere)
    }
}

impl From<Triangle> for Surface {
    fn from(triangle: Triangle) -> Self {
        Surface::Triangle(triangle)
    }
}
