//! Sphere primitive.

use crate::Material;
use lumen_math::{BoundingBox, DVec3, Interval, Ray};
use std::f64::consts::PI;
use std::sync::Arc;

/// A sphere primitive.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: DVec3,
    radius: f64,
    /// Normal points towards the center; the sphere is seen from inside
    inward: bool,
    material: Arc<Material>,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: DVec3, radius: f64, material: Arc<Material>) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
            inward: false,
            material,
        }
    }

    /// A hollow sphere whose front side faces its center.
    pub fn inward(center: DVec3, radius: f64, material: Arc<Material>) -> Self {
        Self {
            inward: true,
            ..Self::new(center, radius, material)
        }
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    /// Nearest root of the ray/sphere quadratic strictly inside `ray_t`.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<f64> {
        let oc = self.center - ray.origin();
        // Direction is unit length, so a = 1
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let root = h - sqrtd;
        if ray_t.surrounds(root) {
            return Some(root);
        }
        let root = h + sqrtd;
        ray_t.surrounds(root).then_some(root)
    }

    /// Unit normal at `pos` on the front side.
    pub fn normal(&self, pos: DVec3) -> DVec3 {
        let n = (pos - self.center) / self.radius;
        if self.inward {
            -n
        } else {
            n
        }
    }

    /// Uniformly distributed point on the sphere for `u, v` in [0, 1).
    pub fn point(&self, u: f64, v: f64) -> DVec3 {
        let z = 1.0 - 2.0 * u;
        let r = (1.0 - z * z).max(0.0).sqrt();
        let phi = 2.0 * PI * v;
        self.center + self.radius * DVec3::new(r * phi.cos(), r * phi.sin(), z)
    }

    pub fn area(&self) -> f64 {
        4.0 * PI * self.radius * self.radius
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let rvec = DVec3::splat(self.radius);
        BoundingBox::new(self.center - rvec, self.center + rvec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    fn sphere() -> Sphere {
        Sphere::new(
            DVec3::new(0.0, 0.0, -1.0),
            0.5,
            Arc::new(Material::diffuse(Color::splat(0.5))),
        )
    }

    #[test]
    fn test_sphere_hit() {
        let ray = Ray::new(DVec3::ZERO, DVec3::new(0.0, 0.0, -1.0));
        let t = sphere().intersect(&ray, Interval::FORWARD).unwrap();
        assert!((t - 0.5).abs() < 1e-12); // Should hit at t=0.5
    }

    #[test]
    fn test_sphere_hit_from_inside() {
        let s = sphere();
        let ray = Ray::new(s.center(), DVec3::X);
        let t = s.intersect(&ray, Interval::FORWARD).unwrap();
        assert!((t - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sphere_miss() {
        // Ray pointing away from sphere
        let ray = Ray::new(DVec3::ZERO, DVec3::new(0.0, 1.0, 0.0));
        assert!(sphere().intersect(&ray, Interval::FORWARD).is_none());
    }

    #[test]
    fn test_sphere_point_lies_on_surface() {
        let s = sphere();
        for (u, v) in [(0.0, 0.0), (0.3, 0.7), (0.999, 0.5)] {
            let p = s.point(u, v);
            assert!(((p - s.center()).length() - s.radius()).abs() < 1e-12);
            assert!((s.normal(p).length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_inward_sphere_faces_center() {
        let s = Sphere::inward(DVec3::ZERO, 2.0, Arc::new(Material::default()));
        let p = DVec3::new(0.0, 2.0, 0.0);
        assert!((s.normal(p) + DVec3::Y).length() < 1e-12);
        let ray = Ray::new(DVec3::ZERO, DVec3::Y);
        let t = s.intersect(&ray, Interval::FORWARD).unwrap();
        assert!((t - 2.0).abs() < 1e-12);
    }
}
